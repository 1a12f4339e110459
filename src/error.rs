use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("ticket '{0}' not found")]
    TicketNotFound(String),

    #[error("ambiguous ID '{0}' matches multiple tickets")]
    AmbiguousId(String),

    #[error("record not found in '{table}' matching {filter}")]
    RecordNotFound { table: String, filter: String },

    #[error("{field} is required")]
    Validation { field: String },

    #[error("invalid status '{0}'")]
    InvalidStatus(String),

    #[error("invalid priority '{0}'")]
    InvalidPriority(String),

    #[error("invalid role '{0}'")]
    InvalidRole(String),

    #[error("not signed in. Run: ticketdesk login")]
    NotSignedIn,

    #[error("only admins can {0}")]
    Forbidden(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

impl DeskError {
    pub fn required(field: impl Into<String>) -> Self {
        DeskError::Validation {
            field: field.into(),
        }
    }

    /// Whether this error means the row simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DeskError::RecordNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, DeskError>;
