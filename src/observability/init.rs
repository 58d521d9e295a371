//! Tracing subscriber setup.

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::file_writer::FileWriter;
use crate::Config;

pub const LOG_FILE_NAME: &str = "mihf.log";

/// Builds the filter: `RUST_LOG` when set, otherwise `config.log_level`.
fn env_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}

/// Installs the global subscriber writing to `mihf.log` in the data directory.
///
/// - Creates the data directory if needed, and quietly skips logging when
///   that fails, since the client works without a log.
/// - Only the first call in a process takes effect.
///
/// # Examples
///
/// ```no_run
/// use mihf::observability::init_tracing;
/// use mihf::Config;
///
/// init_tracing(&Config::default());
/// tracing::debug!("client started");
/// ```
pub fn init_tracing(config: &Config) {
    init_in(config, &config.data_dir);
}

fn init_in(config: &Config, dir: &Path) {
    if std::fs::create_dir_all(dir).is_err() {
        return;
    }

    let writer = Arc::new(FileWriter::new(dir.join(LOG_FILE_NAME)));
    let layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(writer);

    let _ = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(layer)
        .try_init();
}
