//! Common types, protocol definitions, and errors shared across `sls-api` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
