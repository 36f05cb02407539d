use std::fmt;

/// Failures talking to the transcoding service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The request could not be sent or the response could not be received.
    #[error("connection error: {0}")]
    Connection(String),
    #[error("server error {status}: {detail}")]
    Server { status: u16, detail: String },
    /// One line of a record feed did not parse; the feed itself carries on.
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Text shown to the operator.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Server { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_builder() {
        return ClientError::InvalidUrl(err.to_string());
    }
    ClientError::Connection(err.to_string())
}

/// Identity of one stream session, unique per cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// A line that was dropped from a record feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub session: SessionId,
    pub source_url: String,
    pub error: ClientError,
}
