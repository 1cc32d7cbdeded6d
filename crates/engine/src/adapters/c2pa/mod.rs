// C2PA-backed manifest extraction - re-exports all public interfaces

mod constants;
mod content_detection;
mod settings;
mod engine;

pub use constants::*;
pub use content_detection::*;
pub use settings::*;
pub use engine::*;
