//! Recursion-depth tracking.
//!
//! Sandboxing untrusted programs (allocation/instruction/wall-clock limits)
//! is out of scope here — only recursion depth is tracked. A tree-walking
//! evaluator still needs that much: an unbounded `protocol` call chain
//! would otherwise blow the host stack instead of raising a Keikaku-level
//! error.

use std::fmt;

/// Tracks nested call depth for the evaluator; implementations decide how
/// deep is too deep.
pub trait ResourceTracker {
    /// Called on entry to a protocol/method call or generator advance.
    /// Returns an error once the tracker's limit is exceeded.
    fn enter_call(&mut self) -> Result<(), ResourceError>;

    /// Called on exit from a protocol/method call or generator advance.
    fn exit_call(&mut self);

    fn depth(&self) -> usize;
}

#[derive(Debug, Clone, Copy)]
pub struct ResourceError {
    pub limit: usize,
    pub depth: usize,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "recursion limit exceeded: depth {} > limit {}", self.depth, self.limit)
    }
}

impl std::error::Error for ResourceError {}

/// No recursion limit at all; used by the REPL and tests where the host
/// stack is trusted to be generous enough.
#[derive(Debug, Default)]
pub struct NoLimitTracker {
    depth: usize,
}

impl ResourceTracker for NoLimitTracker {
    fn enter_call(&mut self) -> Result<(), ResourceError> {
        self.depth += 1;
        Ok(())
    }

    fn exit_call(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn depth(&self) -> usize {
        self.depth
    }
}

/// Bounds recursion depth at a fixed limit; this is what `Runner` installs
/// by default so a runaway `protocol` can't crash the host process.
#[derive(Debug)]
pub struct RecursionLimitTracker {
    limit: usize,
    depth: usize,
}

impl RecursionLimitTracker {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { limit, depth: 0 }
    }
}

impl Default for RecursionLimitTracker {
    fn default() -> Self {
        Self::new(2000)
    }
}

impl ResourceTracker for RecursionLimitTracker {
    fn enter_call(&mut self) -> Result<(), ResourceError> {
        if self.depth >= self.limit {
            return Err(ResourceError { limit: self.limit, depth: self.depth });
        }
        self.depth += 1;
        Ok(())
    }

    fn exit_call(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn depth(&self) -> usize {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recursion_limit_trips_at_boundary() {
        let mut tracker = RecursionLimitTracker::new(2);
        assert!(tracker.enter_call().is_ok());
        assert!(tracker.enter_call().is_ok());
        assert!(tracker.enter_call().is_err());
    }
}
