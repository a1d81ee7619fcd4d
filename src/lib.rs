//! depvault - dependency vault and hash-keyed build cache
//!
//! Fetches each resolved dependency version once into an immutable vault and
//! instantiates per-configuration build directories from it, optionally
//! shared by every project of a user.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod generate;
pub mod project;
pub mod source;
pub mod ui;

pub use cache::BuildDirectoryResolver;
pub use error::{DepvaultError, DepvaultResult};
