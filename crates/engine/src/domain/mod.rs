pub mod error;
pub mod manifest;
pub mod manifest_engine;
pub mod types;
pub mod verify;
