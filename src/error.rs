use thiserror::Error;

/// HTTP status line code carried by a [`Error::ParseHandshake`], when the
/// failure happened after a status line was actually read.
pub type HttpStatus = u16;

/// Every way a connection attempt or an open connection can fail.
///
/// This mirrors the design taxonomy one-for-one: a kind plus a human
/// description, with an optional HTTP status riding along on handshake
/// failures. Only the most recent error is ever retained on a handle.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// `connect()` was called before scheme, host, port, path, or at least
    /// one callback was configured.
    #[error("missing required parameter: {0}")]
    MissedParameter(String),

    /// DNS resolution or the TCP `connect` call failed.
    #[error("failed to connect: {0}")]
    Connect(String),

    /// Reserved: the handle was configured for `wss://` but this build only
    /// speaks plaintext `ws://`.
    #[error("TLS is not supported by this build")]
    TlsNotSupported,

    /// A `read`/`write` syscall on the socket failed once the connection
    /// was open or closing.
    #[error("socket I/O error: {0}")]
    ReadWriteSocket(String),

    /// The HTTP/1.1 Upgrade response was malformed, carried the wrong
    /// status, was missing a required header, or failed the
    /// `Sec-WebSocket-Accept` challenge.
    #[error("handshake failed: {message}{}", status_suffix(*status))]
    ParseHandshake {
        message: String,
        status: Option<HttpStatus>,
    },

    /// A frame violated RFC 6455 framing rules (bad opcode, RSV bits set
    /// without a negotiated extension, a fragmented control frame, an
    /// oversized control frame, a stray continuation, ...).
    #[error("protocol error: {0}")]
    ProtocolError(String),
}

fn status_suffix(status: Option<HttpStatus>) -> String {
    match status {
        Some(code) => format!(" (http status {code})"),
        None => String::new(),
    }
}

impl Error {
    pub fn parse_handshake(message: impl Into<String>) -> Self {
        Error::ParseHandshake {
            message: message.into(),
            status: None,
        }
    }

    pub fn parse_handshake_with_status(message: impl Into<String>, status: HttpStatus) -> Self {
        Error::ParseHandshake {
            message: message.into(),
            status: Some(status),
        }
    }

    /// The HTTP status line that accompanied a handshake failure, if any.
    pub fn http_status(&self) -> Option<HttpStatus> {
        match self {
            Error::ParseHandshake { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::ReadWriteSocket(source.to_string())
    }
}
