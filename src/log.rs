//! Logging setup for the program.
//!
//! Console output is colourised; when an output directory is supplied a plain
//! copy of the log is also written there. The level comes from program
//! settings and can be overridden with the `CLINKPLAN_LOG_LEVEL` environment
//! variable.
use anyhow::Result;
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use std::env;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// The default program log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding the configured log level
const LOG_LEVEL_ENV_VAR: &str = "CLINKPLAN_LOG_LEVEL";

/// File name for the log copy written to the output directory
const LOG_FILE_NAME: &str = "clinkplan.log";

static LOGGER_INITIALISED: AtomicBool = AtomicBool::new(false);

/// Serialises logger installation; concurrent callers (e.g. test threads)
/// must not race `apply`
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Whether [`init`] has completed successfully.
///
/// Error reporting falls back to stderr when the logger is not up yet.
pub fn is_logger_initialised() -> bool {
    LOGGER_INITIALISED.load(Ordering::SeqCst)
}

/// Initialise the program logger.
///
/// # Arguments
///
/// * `log_level` - Level filter from settings (overridable via env var)
/// * `output_path` - Directory for the plain log file, if wanted
pub fn init(log_level: &str, output_path: Option<&Path>) -> Result<()> {
    // A process-wide logger can only be installed once; later calls (e.g.
    // successive commands in one test process) keep the first configuration
    let _guard = INIT_LOCK.lock().expect("Logger init lock poisoned");
    if is_logger_initialised() {
        return Ok(());
    }

    let log_level = env::var(LOG_LEVEL_ENV_VAR).unwrap_or_else(|_| log_level.to_string());
    let level_filter: log::LevelFilter = log_level.parse()?;

    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let stderr_dispatch = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{}] {message}",
                colors.color(record.level())
            ));
        })
        .chain(std::io::stderr());

    let mut dispatch = fern::Dispatch::new()
        .level(level_filter)
        .chain(stderr_dispatch);

    if let Some(output_path) = output_path {
        let file_dispatch = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{} [{}] {message}",
                    Local::now().format("%Y-%m-%d %H:%M:%S"),
                    record.level()
                ));
            })
            .chain(fern::log_file(output_path.join(LOG_FILE_NAME))?);
        dispatch = dispatch.chain(file_dispatch);
    }

    dispatch.apply()?;
    LOGGER_INITIALISED.store(true, Ordering::SeqCst);

    Ok(())
}
