//! Driver input parser.
//!
//! Each input line is one command:
//! - `get <namespace> <key>`
//! - `invalidate <namespace> [key]`
//! - `stats <namespace>`
//!
//! Blank lines and lines starting with `#` are ignored.

use std::time::Duration;

/// A parsed driver command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get { namespace: String, key: String },
    Invalidate { namespace: String, key: Option<String> },
    Stats { namespace: String },
}

/// Why a line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one input line. Returns `Ok(None)` for blank lines and comments.
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = parts.collect();

    let command = match (verb.to_lowercase().as_str(), args.as_slice()) {
        ("get", [namespace, key]) => Command::Get {
            namespace: namespace.to_string(),
            key: key.to_string(),
        },
        ("get", _) => return Err(ParseError::Usage("get <namespace> <key>")),
        ("invalidate", [namespace]) => Command::Invalidate {
            namespace: namespace.to_string(),
            key: None,
        },
        ("invalidate", [namespace, key]) => Command::Invalidate {
            namespace: namespace.to_string(),
            key: Some(key.to_string()),
        },
        ("invalidate", _) => return Err(ParseError::Usage("invalidate <namespace> [key]")),
        ("stats", [namespace]) => Command::Stats {
            namespace: namespace.to_string(),
        },
        ("stats", _) => return Err(ParseError::Usage("stats <namespace>")),
        (other, _) => return Err(ParseError::UnknownCommand(other.to_string())),
    };

    Ok(Some(command))
}

/// Parse a duration string like `250ms`, `2s`, `5m` or `1h`.
///
/// A bare `0` is accepted as zero.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if input == "0" {
        return Some(Duration::ZERO);
    }

    if let Some(millis) = input.strip_suffix("ms") {
        return millis.parse().ok().map(Duration::from_millis);
    }

    let unit_start = input.len() - input.chars().last()?.len_utf8();
    let (digits, unit) = input.split_at(unit_start);
    let amount: u64 = digits.parse().ok()?;

    let seconds = match unit {
        "s" => amount,
        "m" => amount.checked_mul(60)?,
        "h" => amount.checked_mul(3600)?,
        _ => return None,
    };

    Some(Duration::from_secs(seconds))
}
