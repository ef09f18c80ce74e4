//! Per-call parallel execution settings
//!
//! Field synthesis runs its work units on rayon. Each call carries its own
//! [`ParallelConfig`]: nothing is stored process-wide, so two builders with
//! different settings can run side by side.

use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use voxcrate_core::{Error, Result};

/// Thread configuration for one parallel operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Number of threads to use (None = the ambient rayon pool)
    pub num_threads: Option<usize>,
    /// Enable parallel processing (can be disabled for debugging)
    pub enabled: bool,
}

impl ParallelConfig {
    /// Run everything on the calling thread
    pub fn sequential() -> Self {
        Self {
            num_threads: None,
            enabled: false,
        }
    }

    /// Set number of threads
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Enable or disable parallel processing
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Threads that `install` will actually use
    pub fn effective_threads(&self) -> usize {
        if !self.enabled {
            1
        } else {
            self.num_threads
                .unwrap_or_else(rayon::current_num_threads)
                .max(1)
        }
    }

    /// Run `op` under this configuration.
    ///
    /// With an explicit thread count a dedicated pool is built for the call
    /// and dropped afterwards; otherwise `op` runs on the current rayon pool.
    /// `op` receives `true` when it may fan out with rayon iterators.
    pub fn install<F, R>(&self, op: F) -> Result<R>
    where
        F: FnOnce(bool) -> R + Send,
        R: Send,
    {
        if !self.enabled {
            return Ok(op(false));
        }

        match self.num_threads {
            Some(num_threads) => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(num_threads.max(1))
                    .thread_name(|index| format!("voxcrate-field-{}", index))
                    .build()
                    .map_err(|e| Error::Algorithm(format!("Failed to create thread pool: {}", e)))?;
                Ok(pool.install(|| op(true)))
            }
            None => Ok(op(true)),
        }
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            enabled: true,
        }
    }
}
