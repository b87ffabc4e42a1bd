pub mod sync;
pub mod telemetry;

pub use sync::mutex_lock_or_recover;
