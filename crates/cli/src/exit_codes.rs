//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Description                                          |
//! |------|------------------------------------------------------|
//! | 0    | Success (anomalies do not change the exit code)      |
//! | 1    | General error (unspecified)                          |
//! | 2    | CLI usage error (bad args)                           |
//! | 3    | Invalid config (parse or validation failure)         |
//! | 4    | Input/IO failure (missing file, unreadable catalog)  |
//! | 5    | Malformed input table (bad header, ragged row)       |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `exit_code_for`

use podium_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own.
pub const EXIT_USAGE: u8 = 2;

/// Config file could not be parsed or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// An input, the catalog or the output could not be read or written.
pub const EXIT_INPUT: u8 = 4;

/// An input table does not fit the configured layout.
pub const EXIT_MALFORMED_INPUT: u8 = 5;

/// Map an engine error to its exit code.
pub fn exit_code_for(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::Io(_) | ReconError::Catalog(_) => EXIT_INPUT,
        ReconError::MalformedHeader { .. } | ReconError::MalformedRow { .. } => {
            EXIT_MALFORMED_INPUT
        }
    }
}
