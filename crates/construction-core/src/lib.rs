//! Rosetta-style transaction construction for Ravencoin.
//!
//! [`engine::ConstructionEngine`] runs the Derive, Preprocess, Metadata,
//! Payloads, Parse, Combine, Hash and Submit phases over the primitives in
//! `chain-rvn`, reaching the chain only through the [`collaborators`] traits.

pub mod collaborators;
pub mod config;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod types;

pub use config::ConstructionConfig;
pub use engine::ConstructionEngine;
pub use error::ConstructionError;
