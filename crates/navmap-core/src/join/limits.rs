//! Compiler limits.

use crate::error::Error;

/// Depth limits for join compilation to prevent runaway navigation chains.
#[derive(Debug, Clone)]
pub struct CompilerLimits {
    /// Maximum number of hops in one join path.
    pub max_path_depth: usize,
    /// Maximum wrapper-descent depth while resolving key columns.
    pub max_key_depth: usize,
}

impl Default for CompilerLimits {
    fn default() -> Self {
        Self {
            max_path_depth: 32,
            max_key_depth: 8,
        }
    }
}

impl CompilerLimits {
    /// Create limits with custom depths.
    pub fn new(max_path_depth: usize, max_key_depth: usize) -> Self {
        Self {
            max_path_depth,
            max_key_depth,
        }
    }

    /// Create unlimited depths (use with caution).
    pub fn unlimited() -> Self {
        Self {
            max_path_depth: usize::MAX,
            max_key_depth: usize::MAX,
        }
    }

    pub(crate) fn check_path_depth(&self, actual: usize) -> Result<(), Error> {
        if actual > self.max_path_depth {
            return Err(Error::DepthExceeded {
                kind: "join path",
                actual,
                limit: self.max_path_depth,
            });
        }
        Ok(())
    }

    pub(crate) fn check_key_depth(&self, actual: usize) -> Result<(), Error> {
        if actual > self.max_key_depth {
            return Err(Error::DepthExceeded {
                kind: "key resolution",
                actual,
                limit: self.max_key_depth,
            });
        }
        Ok(())
    }
}
