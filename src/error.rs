//! Error types for the link bridge.
//!
//! # Recovery Strategies
//!
//! - **`Serial` / `Io`**: transport-level faults. Often transient (I/O
//!   congestion, device reset); cable loss is unrecoverable without
//!   hardware intervention.
//! - **`LinkClosed`**: the peer ended the byte stream. The spin loop exits
//!   cleanly; the application decides whether to reconnect.
//! - **`Config`**: configuration file is invalid. Fix and restart.
//! - **`RegistryFull` / `PayloadTooLarge` / `ParamTimeout`**: API-level
//!   failures reported to the caller; the link itself remains usable.
//!
//! Corrupted inbound bytes are never surfaced as errors. The receive path
//! self-heals and accounts for damage in the node's error counters, so a
//! noisy link degrades throughput instead of killing the session.

use thiserror::Error;

/// Errors that can occur in the link bridge.
///
/// See module-level documentation for recovery strategies.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Link closed by peer")]
    LinkClosed,

    #[error("Payload of {len} bytes exceeds the {max} byte frame limit")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("All {kind} slots are in use")]
    RegistryFull { kind: &'static str },

    #[error("Parameter request timed out")]
    ParamTimeout,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
