use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

static POISON_RECOVERY_COUNT: AtomicU64 = AtomicU64::new(0);

pub fn poison_recovery_count() -> u64 {
    POISON_RECOVERY_COUNT.load(Ordering::Relaxed)
}

/// Locks `lock`, taking the inner value back if a previous holder panicked.
///
/// A handler that panics mid-exchange must not wedge the serial link for
/// every later request.
pub fn mutex_lock_or_recover<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        POISON_RECOVERY_COUNT.fetch_add(1, Ordering::Relaxed);
        error!("Mutex poisoned by a panicking holder; recovering inner state");
        poisoned.into_inner()
    })
}
