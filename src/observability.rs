// In: src/observability.rs

//! Opt-in logging for hosts that do not install their own `log` backend.
//!
//! The codec only emits through the `log` facade: `debug!` when a structure
//! is built or widened, `trace!` per flushed block. Nothing is printed unless
//! the host installs a logger, either its own or the one set up here.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Once;

use log::LevelFilter;

use crate::error::Result;

static INIT_LOGGER: Once = Once::new();

/// Installs an `env_logger` backend at `level`, writing `[LEVEL] message`
/// lines to stderr or, when `log_file` is given, appending to that file.
///
/// Only the first call has an effect. If another logger is already
/// installed, this is a no-op.
pub fn init_logging(level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    let file = match log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };

    INIT_LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(level);

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}
