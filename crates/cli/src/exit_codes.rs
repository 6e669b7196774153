//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                         |
//! |------|-------------------------------------------------|
//! | 0    | Success                                         |
//! | 1    | Expression evaluated to `Invalid Expression`    |
//! | 2    | Usage error (bad args, bad key script)          |
//! | 3    | IO error (missing catalog, unreadable input)    |
//! | 4    | Parse error (catalog, settings, token JSON)     |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// The expression could not be evaluated. The sentinel is still printed.
pub const EXIT_INVALID: u8 = 1;

/// Usage error - bad arguments, malformed key script.
pub const EXIT_USAGE: u8 = 2;

/// File could not be read.
pub const EXIT_IO: u8 = 3;

/// Input was read but could not be parsed or failed validation.
pub const EXIT_PARSE: u8 = 4;
