//! Run-level error taxonomy.
//!
//! Per-attempt navigation faults stay inside the retry controller as
//! `SessionError`; everything that can end or degrade a whole run surfaces
//! here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    /// Malformed or missing URL source. Fatal, never retried.
    #[error("url source error: {0}")]
    Source(String),

    /// Bad configuration file or values. Fatal, never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// The login pre-flight failed; the run visits no targets.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A session fault that escaped the retry controller.
    #[error("browser session error: {0}")]
    Session(#[from] browser_adapter::SessionError),

    #[error("fingerprint bundle error: {0}")]
    Fingerprint(#[from] stealth::ConfigError),

    #[error("artifact i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv serialization error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ProbeResult<T> = Result<T, ProbeError>;
