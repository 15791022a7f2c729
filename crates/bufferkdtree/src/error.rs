//! The error type shared by every fallible operation in the crate.

/// Everything that can go wrong while fitting or querying a buffer k-d tree.
///
/// No operation ever returns partial results alongside an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A parameter or input is out of range or malformed.
    Configuration(String),
    /// The working set does not fit the memory budget of the compute backend.
    ResourceExhausted(String),
    /// A batch operation of the compute backend failed, or the thread pool could not be built.
    Backend(String),
}

impl Error {
    /// Shorthand for a [`Error::Configuration`] error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Shorthand for a [`Error::ResourceExhausted`] error.
    pub fn resources<S: Into<String>>(msg: S) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    /// Shorthand for a [`Error::Backend`] error.
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        Self::Backend(msg.into())
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "Invalid configuration: {msg}"),
            Self::ResourceExhausted(msg) => write!(f, "Insufficient working memory: {msg}"),
            Self::Backend(msg) => write!(f, "Compute backend failure: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

/// A `Result` with [`Error`] as the error type.
pub type Result<T> = core::result::Result<T, Error>;
