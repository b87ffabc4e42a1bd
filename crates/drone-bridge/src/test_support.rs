//! Shared test support utilities for the crate.
#![allow(unused_imports)]

use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::OnceLock;

pub use crate::usecases::ports::test_support::EventLog;
pub use crate::usecases::ports::test_support::MockSerialBackend;
pub use crate::usecases::ports::test_support::MockServerHandle;
pub use crate::usecases::ports::test_support::MockUiLauncher;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Serializes tests that read or mutate process environment variables.
pub(crate) fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Restores an environment variable to its previous value on drop.
pub(crate) struct EnvGuard {
    key: &'static str,
    prev: Option<String>,
}

impl EnvGuard {
    pub(crate) fn set(key: &'static str, value: &str) -> Self {
        let prev = std::env::var(key).ok();
        // SAFETY: callers hold `env_lock`.
        unsafe {
            std::env::set_var(key, value);
        }
        Self { key, prev }
    }

    pub(crate) fn remove(key: &'static str) -> Self {
        let prev = std::env::var(key).ok();
        // SAFETY: callers hold `env_lock`.
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, prev }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: the guard is dropped before the `env_lock` guard it was
        // created under.
        unsafe {
            match self.prev.take() {
                Some(prev) => std::env::set_var(self.key, prev),
                None => std::env::remove_var(self.key),
            }
        }
    }
}
