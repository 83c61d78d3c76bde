//! Error types for the nvidia-smi sampler.
//!
//! Every variant is terminal for the sampler loop. The caller decides what to
//! do with it; the exporter binary logs it and exits.

use std::num::ParseFloatError;
use std::process::ExitStatus;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("interval must be at least 1 second (got {requested:?})")]
    InvalidInterval { requested: Duration },

    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("nvidia-smi stdout was not captured")]
    MissingStdout,

    #[error("error reading nvidia-smi output: {0}")]
    Read(#[from] std::io::Error),

    #[error("error reading nvidia-smi output: stream closed")]
    StreamClosed,

    #[error("invalid nvidia-smi output (expected {expected} fields, found {found}): {line}")]
    FieldCount {
        expected: usize,
        found: usize,
        line: String,
    },

    #[error("error converting {field} value ({value}) to float: {source}")]
    InvalidValue {
        field: &'static str,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("nvidia-smi exited with {status}: {stderr}")]
    ToolFailed { status: ExitStatus, stderr: String },
}
