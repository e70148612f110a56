use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Log file location under $HOME/.local/state/quote-race, falling back to
    /// the platform's local data dir.
    pub fn log_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("quote-race");
            Some(state_dir.join("quote-race.log"))
        } else {
            ProjectDirs::from("", "", "quote-race")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("quote-race.log"))
        }
    }
}
