//! Startup logging initialization.
//!
//! The core never calls `println!` for operational events — admission,
//! dispatch, and CGI lifecycle all go through `log::*` macros, sunk by
//! `flexi_logger` to stderr.

use flexi_logger::{Duplicate, LogSpecification, Logger};

use crate::error::{Result, ServerError};

pub fn init(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    Logger::with(LogSpecification::parse(level).map_err(|e| ServerError::Logging(e.to_string()))?)
        .duplicate_to_stderr(Duplicate::All)
        .start()
        .map_err(|e| ServerError::Logging(e.to_string()))?;

    Ok(())
}
