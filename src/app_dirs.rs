use std::env;
use std::path::PathBuf;

use directories::ProjectDirs;

const APP_NAME: &str = "cantoquiz";
pub const STORAGE_FILE: &str = "storage.db";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$XDG_STATE_HOME/cantoquiz`, then `~/.local/state/cantoquiz`, then the
    /// platform's local data directory.
    pub fn state_dir() -> Option<PathBuf> {
        let non_empty = |var: &str| {
            env::var_os(var)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };

        if let Some(state_home) = non_empty("XDG_STATE_HOME") {
            return Some(state_home.join(APP_NAME));
        }
        if let Some(home) = non_empty("HOME") {
            return Some(home.join(".local").join("state").join(APP_NAME));
        }
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_local_dir().to_path_buf())
    }

    pub fn storage_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join(STORAGE_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_lives_in_app_state_dir() {
        if let Some(path) = AppDirs::storage_path() {
            assert!(path.ends_with(format!("{APP_NAME}/{STORAGE_FILE}")));
        }
    }
}
