//! Utility functions.
//!
//! Helpers used by the driver binary.

pub mod parser;

pub use parser::{Command, ParseError, parse_command, parse_duration};
