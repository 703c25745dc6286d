use thiserror::Error;
use serde::Serialize;

#[derive(Error, Debug, Clone, Serialize)]
pub enum AppError {
    #[error("Capture Error: {0}")]
    Capture(String),

    #[error("Recognition Error: {0}")]
    Recognition(String),

    /// OCR ran successfully but found no text in the image.
    /// The pipeline maps this to a skip, not a failure.
    #[error("No text recognized")]
    EmptyRecognition,

    #[error("Translation Error: {0}")]
    Translation(String),

    #[error("Configuration Error: {0}")]
    Configuration(String),

    #[error("Network Error: {0}")]
    Network(String),

    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("System Error: {0}")]
    System(String),
}

// Implement conversion from standard errors
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::System(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Network(format!("Request timed out: {}", err))
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("Serialization error: {}", err))
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::System(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::System(err.to_string())
    }
}

impl AppError {
    /// Short message suitable for end-user display.
    ///
    /// Aggregate fallback errors carry one line per attempted backend;
    /// the presentation layer only ever shows the first line.
    pub fn user_message(&self) -> String {
        self.to_string()
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

pub type AppResult<T> = Result<T, AppError>;
