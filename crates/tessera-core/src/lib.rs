//! # tessera-core
//!
//! Configuration types shared by the Tessera crates.
//!
//! Configuration is read from a single YAML file (`tessera.yaml`) and covers
//! where symmetric key material comes from and the defaults used when tokens
//! are issued.

pub mod config;

pub use config::{ConfigError, KeyRingConfig, TesseraConfig, TokenConfig, parse_duration};
