use anyhow::Error;

pub fn add_secondary_error_context(
    primary: Error,
    secondary: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> Error {
    primary.context(format!(
        "While handling the error, an additional error was caught: \n\n{:?}\n\nThe earlier error:",
        secondary.into()
    ))
}

/// Directory-validation failures for a mount target, checked from the job
/// user's point of view.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("mount target '{0}' exists and is not a directory")]
    NotADirectory(std::path::PathBuf),

    #[error("mount target '{path}' is owned by uid {owner}, expected uid {expected}")]
    WrongOwner {
        path: std::path::PathBuf,
        owner: u32,
        expected: u32,
    },

    #[error("mount target '{0}' is not empty")]
    NotEmpty(std::path::PathBuf),

    #[error("mount target '{0}' is not writable by the job user")]
    NotWritable(std::path::PathBuf),

    #[error("failed to stat or create mount target '{path}'")]
    Stat {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
