//! Parse and apply `KEY=VALUE` overlay entries onto a command.

use tokio::process::Command;

use crate::error::ExecError;

/// Split one `KEY=VALUE` entry. The value may be empty or contain further `=`.
pub fn parse_entry(entry: &str) -> Result<(&str, &str), ExecError> {
    match entry.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => Err(ExecError::InvalidEnv {
            entry: entry.to_string(),
        }),
    }
}

/// Check every entry without touching a command.
pub fn validate_overlay<S: AsRef<str>>(entries: &[S]) -> Result<(), ExecError> {
    for entry in entries {
        parse_entry(entry.as_ref())?;
    }
    Ok(())
}

/// Apply the overlay in order; later entries for the same key win.
pub fn apply_overlay<S: AsRef<str>>(cmd: &mut Command, entries: &[S]) -> Result<(), ExecError> {
    for entry in entries {
        let (key, value) = parse_entry(entry.as_ref())?;
        cmd.env(key, value);
    }
    Ok(())
}
