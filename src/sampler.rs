//! Streaming nvidia-smi sampler.
//!
//! The sampler runs `nvidia-smi -l <secs>` once for the life of the process
//! and turns every output line into gauge updates. It has no recovery path:
//! the first read, parse or spawn failure ends the loop and is handed back to
//! the caller as a [`SamplerError`].

use chrono::Utc;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::error::SamplerError;
use crate::metrics::GpuMetrics;
use crate::parser::{parse_line, Sample};
use crate::schema::{query_argument, MetricDefinition};

/// Default tool name, resolved through `PATH`.
pub const DEFAULT_TOOL: &str = "nvidia-smi";

/// Output format flag: plain values, no header row, no units.
pub const FORMAT_ARGUMENT: &str = "--format=csv,noheader,nounits";

/// Converts the poll interval to the whole seconds passed to `-l`.
///
/// Rounds half to even, so 0.4s and 0.5s both become 0 and are rejected.
pub fn interval_seconds(interval: Duration) -> Result<u64, SamplerError> {
    let secs = interval.as_secs_f64().round_ties_even();
    if secs < 1.0 {
        return Err(SamplerError::InvalidInterval {
            requested: interval,
        });
    }
    Ok(secs as u64)
}

/// Arguments for a streaming invocation.
pub fn command_args(interval_secs: u64, defs: &[MetricDefinition]) -> Vec<String> {
    vec![
        "-l".to_string(),
        interval_secs.to_string(),
        FORMAT_ARGUMENT.to_string(),
        query_argument(defs),
    ]
}

/// Owns the nvidia-smi child and feeds its output into [`GpuMetrics`].
pub struct Sampler {
    tool: PathBuf,
    interval_secs: u64,
    defs: Vec<MetricDefinition>,
    metrics: Arc<GpuMetrics>,
}

impl Sampler {
    /// Validates the interval; nothing is spawned yet.
    pub fn new(
        tool: impl Into<PathBuf>,
        interval: Duration,
        metrics: Arc<GpuMetrics>,
    ) -> Result<Self, SamplerError> {
        let interval_secs = interval_seconds(interval)?;
        Ok(Self {
            tool: tool.into(),
            interval_secs,
            defs: metrics.definitions(),
            metrics,
        })
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// Full command line as it will be executed.
    pub fn command_line(&self) -> String {
        format!(
            "{} {}",
            self.tool.display(),
            command_args(self.interval_secs, &self.defs).join(" ")
        )
    }

    /// Spawns nvidia-smi and consumes its output until the first failure.
    ///
    /// Never returns on the happy path. The child is killed and reaped before
    /// the error is returned.
    pub fn run(self) -> SamplerError {
        let command_line = self.command_line();
        info!("Running {}", command_line);

        let spawned = Command::new(&self.tool)
            .args(command_args(self.interval_secs, &self.defs))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                return SamplerError::Spawn {
                    command: command_line,
                    source,
                }
            }
        };
        debug!("nvidia-smi started with pid {}", child.id());

        let err = match child.stdout.take() {
            Some(stdout) => self.consume(BufReader::new(stdout)),
            None => SamplerError::MissingStdout,
        };

        if let Err(e) = child.kill() {
            debug!("Failed to kill nvidia-smi: {}", e);
        }
        match child.wait() {
            Ok(status) => debug!("nvidia-smi exited with {}", status),
            Err(e) => warn!("Failed to reap nvidia-smi: {}", e),
        }

        err
    }

    /// Reads `\n`-terminated lines from `reader` until one cannot be read or
    /// parsed, recording every successfully parsed line.
    ///
    /// End of stream, including a final line without a terminator, is
    /// reported as [`SamplerError::StreamClosed`].
    pub fn consume<R: BufRead>(&self, mut reader: R) -> SamplerError {
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => return SamplerError::StreamClosed,
                Ok(_) if !line.ends_with('\n') => return SamplerError::StreamClosed,
                Ok(_) => {}
                Err(e) => return SamplerError::Read(e),
            }

            let sample = match parse_line(&line, &self.defs) {
                Ok(sample) => sample,
                Err(e) => return e,
            };

            self.metrics.record(&sample, Utc::now().timestamp() as f64);
            trace!(device = %sample.device_id, values = ?sample.values, "Recorded sample");
        }
    }
}

/// Runs nvidia-smi once (no `-l`) and parses every line it prints.
pub fn query_once(tool: &Path, defs: &[MetricDefinition]) -> Result<Vec<Sample>, SamplerError> {
    let args = [FORMAT_ARGUMENT.to_string(), query_argument(defs)];
    let output = Command::new(tool)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| SamplerError::Spawn {
            command: format!("{} {}", tool.display(), args.join(" ")),
            source,
        })?;

    if !output.status.success() {
        return Err(SamplerError::ToolFailed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| parse_line(line, defs))
        .collect()
}
