//! Data directory resolution.
//!
//! The session token, the profile cache and the log file all live in one
//! directory. It is picked from the environment in this order:
//!
//! 1. `$MIHF_DATA_DIR`
//! 2. `$XDG_DATA_HOME/mihf`
//! 3. `$HOME/.local/share/mihf`
//! 4. `./.mihf`

use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "MIHF_DATA_DIR";
const APP_DIR: &str = "mihf";

/// Returns the data directory for the current environment.
#[must_use]
pub fn data_dir() -> PathBuf {
    resolve_data_dir(|key| std::env::var(key).ok())
}

/// Same as [`data_dir`] with an injectable environment.
pub fn resolve_data_dir(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    let set = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    if let Some(dir) = set(DATA_DIR_ENV) {
        return PathBuf::from(expand_tilde(&dir, set("HOME").as_deref()));
    }
    if let Some(xdg) = set("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join(APP_DIR);
    }
    if let Some(home) = set("HOME") {
        return PathBuf::from(home).join(".local").join("share").join(APP_DIR);
    }
    PathBuf::from(".").join(format!(".{APP_DIR}"))
}

/// Expands a leading `~` to `home`. Paths are returned unchanged when there
/// is no home directory.
///
/// # Examples
///
/// ```
/// use mihf::infrastructure::expand_tilde;
///
/// assert_eq!(expand_tilde("~/mihf", Some("/home/ref")), "/home/ref/mihf");
/// assert_eq!(expand_tilde("~", Some("/home/ref")), "/home/ref");
/// assert_eq!(expand_tilde("/var/lib/mihf", Some("/home/ref")), "/var/lib/mihf");
/// ```
#[must_use]
pub fn expand_tilde(path: &str, home: Option<&str>) -> String {
    match home {
        Some(home) if path == "~" => home.to_string(),
        Some(home) if path.starts_with("~/") => path.replacen('~', home, 1),
        _ => path.to_string(),
    }
}
