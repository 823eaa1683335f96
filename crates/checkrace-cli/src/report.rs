//! Hands the chosen result back to whoever invoked checkrace.

use std::io::{self, Write};

use checkrace_core::ProcessResult;

/// Line written to stderr ahead of the checker's own stderr.
pub const STDERR_MARKER: &str = "STDERR:\n";

/// Printed when no checker arguments were given.
pub const USAGE: &str = "usage: checkrace <checker args...>\n";

/// Write the result's stdout verbatim, and its stderr after a marker line
/// when there is any.
pub fn report<O: Write, E: Write>(
    result: &ProcessResult,
    out: &mut O,
    err: &mut E,
) -> io::Result<()> {
    out.write_all(result.stdout.as_bytes())?;
    out.flush()?;

    if !result.stderr.is_empty() {
        err.write_all(STDERR_MARKER.as_bytes())?;
        err.write_all(result.stderr.as_bytes())?;
        err.flush()?;
    }
    Ok(())
}

/// Write the usage message.
pub fn usage<E: Write>(err: &mut E) -> io::Result<()> {
    err.write_all(USAGE.as_bytes())?;
    err.flush()
}

/// The checker's exit code as this process's own. Only the low 8 bits
/// survive, as they would through `exit(2)`, except that a failing code
/// never turns into 0.
pub fn exit_status(code: i32) -> u8 {
    match (code & 0xff) as u8 {
        0 if code != 0 => 1,
        status => status,
    }
}
