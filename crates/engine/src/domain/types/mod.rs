// Re-export all types so callers can use `domain::types::*`.

pub use ids::*;
pub use interval::*;
pub use trust::*;
pub use config::*;

// Module declarations
mod ids;
mod interval;
mod trust;
mod config;
