use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Server responded with status {status}")]
    Server { status: u16 },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Artwork error: {0}")]
    Artwork(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("AppError", 2)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl AppError {
    pub fn kind(&self) -> &str {
        match self {
            AppError::Http(_) => "http",
            AppError::Json(_) => "json",
            AppError::Url(_) => "url",
            AppError::Server { .. } => "server",
            AppError::Decode(_) => "decode",
            AppError::Render(_) => "render",
            AppError::Artwork(_) => "artwork",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
        }
    }

    /// Transport, server and decode failures are retried by the poll loop.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Http(_) | AppError::Json(_) | AppError::Server { .. } | AppError::Decode(_)
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;
