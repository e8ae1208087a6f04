use serde_json::Value;
use std::io::{self, Read};

/// Read piped statements JSON from stdin, so exports can be fed straight
/// into `dcfv` without a temp file. Returns None when stdin is a TTY
/// (interactive) or the pipe carries nothing but whitespace.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // parsed here as a generic value; each command deserializes into its
    // own statements shape
    let value: Value = serde_json::from_str(trimmed)?;
    Ok(Some(value))
}
