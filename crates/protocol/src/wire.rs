//! JSON wire codec for command logs.
//!
//! A log travels as a JSON array of envelopes; a single envelope can
//! also be serialized on its own for inspection or streaming output.
//! Round trips are exact for every supported value category, including
//! binary payloads and object references (see [`crate::value`]).

use std::io;

use thiserror::Error;

use crate::envelope::Envelope;
use crate::log::CommandLog;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] io::Error),
}

/// Serialize a log as pretty-printed JSON.
pub fn to_json(log: &CommandLog) -> Result<String, WireError> {
    Ok(serde_json::to_string_pretty(log)?)
}

/// Serialize a log as compact JSON.
pub fn to_json_compact(log: &CommandLog) -> Result<String, WireError> {
    Ok(serde_json::to_string(log)?)
}

/// Parse a log from JSON text.
pub fn from_json(text: &str) -> Result<CommandLog, WireError> {
    Ok(serde_json::from_str(text)?)
}

/// Write a log as JSON to a writer.
pub fn write_json<W: io::Write>(log: &CommandLog, writer: W) -> Result<(), WireError> {
    Ok(serde_json::to_writer_pretty(writer, log)?)
}

/// Read a log as JSON from a reader.
pub fn read_json<R: io::Read>(reader: R) -> Result<CommandLog, WireError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Serialize one envelope as compact JSON (the emit form).
pub fn envelope_to_json(envelope: &Envelope) -> Result<String, WireError> {
    Ok(serde_json::to_string(envelope)?)
}
