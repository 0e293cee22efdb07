//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Test spec parse error: {0}")]
    SpecParse(String),

    #[error("Login rejected by {url} with status {status}")]
    LoginRejected { url: String, status: u16 },

    #[error("Login response from {0} did not contain user.token")]
    TokenMissing(String),

    #[error("Unknown task: {0}")]
    TaskNotFound(String),

    #[error("Task '{name}' failed: {reason}")]
    TaskFailed { name: String, reason: String },

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid spec pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

pub type E2eResult<T> = Result<T, E2eError>;
