//! Document loading errors

/// A manifest or schema document could not be read or decoded
///
/// The `Display` form is a single line so drivers can print it verbatim.
#[derive(Debug, thiserror::Error)]
pub enum DocumentLoadError {
    #[error("Failed to read {0}: {1}")]
    Io(String, String),

    #[error("Failed to parse JSON document {0}: {1}")]
    Json(String, String),

    #[error("Failed to parse YAML document {0}: {1}")]
    Yaml(String, String),
}

impl DocumentLoadError {
    /// Path of the document that failed to load
    pub fn path(&self) -> &str {
        match self {
            Self::Io(path, _) | Self::Json(path, _) | Self::Yaml(path, _) => path,
        }
    }
}
