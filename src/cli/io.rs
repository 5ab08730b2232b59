//! JSON output for the CLI
//!
//! - One JSON object per invocation on stdout
//! - `{"status":"ok","data":...}` or `{"status":"error","code","message","diagnostics"}`
//! - UTF-8 only

use std::io::{self, Write};

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_to(&mut io::stdout(), &success_body(data))
}

/// Write an error response to stdout
pub fn write_error(err: &CliError) -> CliResult<()> {
    write_to(&mut io::stdout(), &error_body(err))
}

pub(crate) fn success_body(data: Value) -> Value {
    json!({
        "status": "ok",
        "data": data
    })
}

pub(crate) fn error_body(err: &CliError) -> Value {
    json!({
        "status": "error",
        "code": err.code_str(),
        "message": err.message(),
        "diagnostics": err.diagnostics()
    })
}

fn write_to<W: Write>(writer: &mut W, body: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, body)?;
    writeln!(writer)?;
    writer.flush()?;

    Ok(())
}
