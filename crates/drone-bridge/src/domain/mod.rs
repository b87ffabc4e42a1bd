//! Domain layer: value types and business rules.

mod types;

pub use types::*;
