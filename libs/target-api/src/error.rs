use std::fmt;

/// Category of a document store error. Lets the engine tell a
/// misconfigured client apart from a server that refused a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid client configuration — permanent, fail at startup.
    Config,
    /// Network / transport failure.
    Io,
    /// The server answered with a non-success status.
    Rejected,
    /// Payload could not be encoded or a response could not be decoded.
    Format,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Io => f.write_str("io"),
            ErrorKind::Rejected => f.write_str("rejected"),
            ErrorKind::Format => f.write_str("format"),
        }
    }
}

/// Error returned by every `DocumentStore` operation.
///
/// Carries an `ErrorKind`, an optional HTTP status and a human-readable
/// message (for `Rejected` this is the server's response body).
#[derive(Clone)]
pub struct DatabaseError {
    kind: ErrorKind,
    status: Option<u16>,
    message: String,
}

impl DatabaseError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, status: None, message: msg.into() }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Io, status: None, message: msg.into() }
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Format, status: None, message: msg.into() }
    }

    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Rejected, status: Some(status), message: body.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Add context to the error, preserving kind and status.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            status: self.status,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Debug for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "[{} {status}] {}", self.kind, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "status {status}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DatabaseError {}

impl From<std::io::Error> for DatabaseError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(e: serde_json::Error) -> Self {
        Self::format(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_display_includes_status() {
        let e = DatabaseError::rejected(400, "schema check failure");
        assert_eq!(e.kind(), ErrorKind::Rejected);
        assert_eq!(e.status(), Some(400));
        assert_eq!(e.to_string(), "status 400: schema check failure");
    }

    #[test]
    fn context_keeps_kind() {
        let e = DatabaseError::io("connection refused").with_context("insert");
        assert_eq!(e.kind(), ErrorKind::Io);
        assert_eq!(e.message(), "insert: connection refused");
        assert_eq!(format!("{e:?}"), "[io] insert: connection refused");
    }
}
