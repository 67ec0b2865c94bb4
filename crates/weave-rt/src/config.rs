// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Scheduler configuration.

/// Default coroutine stack size.
pub const DEFAULT_STACK_SIZE: usize = 256 * 1024;

/// Smallest stack a coroutine gets. Requests below this are raised to it.
pub const MIN_STACK_SIZE: usize = 16 * 1024;

/// Environment variable overriding the stack size.
pub const STACK_SIZE_ENV: &str = "WEAVE_STACK_SIZE";

/// Settings fixed at scheduler construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Capacity of the suspension table: how many tasks may wait on I/O
    /// at once.
    pub max_concurrency: usize,
    /// Bytes of stack mapped for every coroutine.
    pub stack_size: usize,
}

impl SchedulerConfig {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }

    /// Like `new`, but honors `WEAVE_STACK_SIZE` when it holds a byte count.
    pub fn from_env(max_concurrency: usize) -> Self {
        let config = Self::new(max_concurrency);
        match std::env::var(STACK_SIZE_ENV) {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(size) => config.with_stack_size(size),
                Err(_) => {
                    log::warn!("ignoring {}={:?}: not a byte count", STACK_SIZE_ENV, raw);
                    config
                }
            },
            Err(_) => config,
        }
    }

    /// Set the stack size, clamped to `MIN_STACK_SIZE`.
    pub fn with_stack_size(mut self, size: usize) -> Self {
        if size < MIN_STACK_SIZE {
            log::warn!(
                "stack size {} below minimum, using {}",
                size,
                MIN_STACK_SIZE
            );
        }
        self.stack_size = size.max(MIN_STACK_SIZE);
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = SchedulerConfig::new(4);
        assert_eq!(c.max_concurrency, 4);
        assert_eq!(c.stack_size, DEFAULT_STACK_SIZE);
    }

    #[test]
    fn small_stack_is_clamped() {
        let c = SchedulerConfig::new(1).with_stack_size(1024);
        assert_eq!(c.stack_size, MIN_STACK_SIZE);
        let c = SchedulerConfig::new(1).with_stack_size(1 << 20);
        assert_eq!(c.stack_size, 1 << 20);
    }
}
