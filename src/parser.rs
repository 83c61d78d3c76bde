//! Line parser for `nvidia-smi --format=csv,noheader,nounits` output.
//!
//! The split is a plain `", "` split, not a CSV parser. None of the queried
//! fields contain a comma, and quoting is never emitted for them.

use serde::Serialize;

use crate::error::SamplerError;
use crate::schema::MetricDefinition;

/// Separator nvidia-smi places between CSV columns.
pub const FIELD_SEPARATOR: &str = ", ";

/// One parsed output line: a device and its values in query order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub device_id: String,
    pub values: Vec<f64>,
}

/// Parses one output line against `defs`.
///
/// The line may still carry its `\n` (or `\r\n`) terminator. Any deviation
/// from `defs.len() + 1` fields or any non-numeric value is an error; nothing
/// is padded, truncated or coerced.
pub fn parse_line(line: &str, defs: &[MetricDefinition]) -> Result<Sample, SamplerError> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if fields.len() != defs.len() + 1 {
        return Err(SamplerError::FieldCount {
            expected: defs.len() + 1,
            found: fields.len(),
            line: line.to_string(),
        });
    }

    let values = defs
        .iter()
        .zip(&fields[1..])
        .map(|(def, raw)| {
            raw.parse::<f64>().map_err(|source| SamplerError::InvalidValue {
                field: def.query_key,
                value: raw.to_string(),
                source,
            })
        })
        .collect::<Result<Vec<f64>, _>>()?;

    Ok(Sample {
        device_id: fields[0].to_string(),
        values,
    })
}
