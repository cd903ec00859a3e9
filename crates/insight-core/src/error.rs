#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("invalid parameters: {0}")]
    Param(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("request to {url} was cancelled")]
    Cancelled { url: String },
}

/// Terminal failure of one logical request.
///
/// `code` and `body` are only present when the server actually answered;
/// transport failures (connect errors, timeouts) carry just the message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (url={url}{})", status_suffix(.code))]
pub struct ApiError {
    pub message: String,
    pub code: Option<u16>,
    pub body: Option<String>,
    pub url: String,
}

fn status_suffix(code: &Option<u16>) -> String {
    code.map(|c| format!(", status={c}")).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("missing field `{field}` in {record}")]
    MissingField { record: &'static str, field: String },

    #[error("invalid field `{field}` in {record}: expected {expected}")]
    InvalidField {
        record: &'static str,
        field: String,
        expected: &'static str,
    },

    #[error("malformed {record} response: {message}")]
    Malformed {
        record: &'static str,
        message: String,
    },
}

/// Failure below the HTTP status layer, reported by a [`Transport`].
///
/// [`Transport`]: crate::api::Transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}
