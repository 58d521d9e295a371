//! Logging to a rotating file.
//!
//! ```text
//! tracing macros → EnvFilter → fmt layer → FileWriter → <data_dir>/mihf.log
//! ```
//!
//! # Configuration
//!
//! The level is resolved as:
//! 1. `RUST_LOG` environment variable (highest priority)
//! 2. `log_level` in [`Config`](crate::Config)
//! 3. Default: `"info"`
//!
//! The file rotates at 10 MB and keeps three backups. Bearer tokens never
//! appear in log fields; only their presence is recorded.
//!
//! # Modules
//!
//! - `init`: subscriber setup
//! - `file_writer`: size-rotating writer

mod file_writer;
mod init;

pub use file_writer::FileWriter;
pub use init::{init_tracing, LOG_FILE_NAME};
