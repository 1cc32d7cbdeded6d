// crates/engine/src/adapters/mod.rs

#[cfg(feature = "c2pa")]
pub mod c2pa;
