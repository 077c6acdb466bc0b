use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
pub struct Logging {
    /// Global tracing directives, e.g. `guzo_server=debug,sqlx=warn`.
    /// `RUST_LOG` wins when both are set.
    ///
    /// **Environment variables**:
    /// - `GUZO_LOGGING_TARGETS`
    #[serde(default)]
    pub targets: Option<String>,
    /// When set, logs are also appended to a daily-rotated file in
    /// this directory.
    ///
    /// **Environment variables**:
    /// - `GUZO_LOGGING_FILE_DIR`
    #[serde(default)]
    pub file_dir: Option<PathBuf>,
}
