use thiserror::Error;

#[derive(Error, Debug)]
pub enum WaypointError {
    #[error("Search error: {0}")]
    SearchError(#[from] crate::search::SearchError),
    #[error("Index error: {0}")]
    IndexError(#[from] crate::index::IndexError),
    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
    #[error("Data error: {0}")]
    DataError(#[from] waypoint_data::DataError),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WaypointError {
    /// Whether the failure was caused by the caller's input.
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::SearchError(e) if e.is_client_error())
    }
}

pub type Result<T> = std::result::Result<T, WaypointError>;
