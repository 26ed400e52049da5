use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

/// Broad classification of client failures.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// The transport could not be opened
    Connect,
    /// No data arrived within the configured read timeout
    Timeout,
    /// Read or write failure on an established connection
    Transport,
    /// A send was attempted with no active transport
    NotConnected,
    /// Invalid configuration rejected at construction
    Config,
    /// Internal error from dependencies
    Internal,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    #[must_use]
    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let e = self.source.as_deref()?;
        e.downcast_ref::<E>()
    }

    pub fn config<S: Into<String>>(reason: S) -> Self {
        Config {
            reason: reason.into(),
        }
        .into()
    }

    /// Whether this error is a read timeout (candidate for a graceful
    /// end-of-session close when a timeout is configured).
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.kind == Kind::Timeout
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {}", self.kind, src),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// A send was attempted while no transport is active.
#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct NotConnected;

impl fmt::Display for NotConnected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no active connection")
    }
}

impl StdError for NotConnected {}

impl From<NotConnected> for Error {
    fn from(err: NotConnected) -> Self {
        Error::with_source(Kind::NotConnected, err)
    }
}

/// The server ended the stream, either with a close frame or by dropping
/// the underlying connection.
#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct ClosedByPeer;

impl fmt::Display for ClosedByPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection closed by peer")
    }
}

impl StdError for ClosedByPeer {}

impl From<ClosedByPeer> for Error {
    fn from(err: ClosedByPeer) -> Self {
        Error::with_source(Kind::Transport, err)
    }
}

/// No inbound data within the configured read timeout.
#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct ReadTimedOut;

impl fmt::Display for ReadTimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no data received within the configured timeout")
    }
}

impl StdError for ReadTimedOut {}

impl From<ReadTimedOut> for Error {
    fn from(err: ReadTimedOut) -> Self {
        Error::with_source(Kind::Timeout, err)
    }
}

/// The transport could not be opened within the configured timeout.
#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct OpenTimedOut;

impl fmt::Display for OpenTimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport open timed out")
    }
}

impl StdError for OpenTimedOut {}

impl From<OpenTimedOut> for Error {
    fn from(err: OpenTimedOut) -> Self {
        Error::with_source(Kind::Connect, err)
    }
}

#[non_exhaustive]
#[derive(Debug)]
pub struct Config {
    pub reason: String,
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration: {}", self.reason)
    }
}

impl StdError for Config {}

impl From<Config> for Error {
    fn from(err: Config) -> Self {
        Error::with_source(Kind::Config, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::with_source(Kind::Config, e)
    }
}
