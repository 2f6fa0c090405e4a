//! Structured logging and optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No credentials** (database or Swift passwords, JWTs, password hashes)
//!   may appear in any span attribute or log field.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`) and
//!   overridden by `RUST_LOG`.

pub mod init;

pub use init::{init_telemetry, shutdown};
