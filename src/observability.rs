//! This module provides the logging backend and the structured metric hook.
//!
//! The library itself only talks to the `log` facade. Applications (and tests that
//! want to see output) call [`init_logging`] once to install an `env_logger`
//! backend; every later call is a no-op.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Once;

use log::LevelFilter;

use crate::error::PipelineError;

static INIT_LOGGER: Once = Once::new();

/// Logs a structured key-value metric line at debug level.
///
/// # Example
/// ```
/// use voxpipe::log_metric;
/// let ratio = 4.2;
/// log_metric!("event"="encode", "pipeline"="bitswap1->lz4", "ratio"=&ratio);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        if $crate::__log::log_enabled!($crate::__log::Level::Debug) {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            $crate::__log::debug!("VOXPIPE_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}

/// Installs the `env_logger` backend at `level`, optionally appending to `log_file`.
///
/// Only the first successful call has an effect. Fails if the log file cannot be
/// opened.
pub fn init_logging(level: LevelFilter, log_file: Option<&Path>) -> Result<(), PipelineError> {
    let target = match log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };

    INIT_LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();
        builder.is_test(cfg!(test));
        builder.filter_level(level);

        // Custom formatter: just print the level and message
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = target {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}
