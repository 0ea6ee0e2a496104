use thiserror::Error;

/// A failed query against a [`Connection`](crate::traits::Connection).
///
/// The variants follow the FTP reply classes: permanent negative replies
/// (5xx) are [`Permission`](RemoteError::Permission), transient ones (4xx)
/// are [`Transient`](RemoteError::Transient). Non-FTP connections map their
/// failures onto the same classes.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("permission error {code}: {message}")]
    Permission { code: u16, message: String },

    #[error("transient error {code}: {message}")]
    Transient { code: u16, message: String },

    #[error("unexpected reply: {0}")]
    Protocol(String),

    #[error("IO error")]
    Io(#[from] std::io::Error),
}

/// Problems met while estimating, plus configuration errors.
///
/// Everything except [`InvalidConfig`](EstimateError::InvalidConfig) is
/// recovered inside the traversal and collected into
/// [`Report::problems`](crate::Report::problems).
#[derive(Error, Debug)]
pub enum EstimateError {
    // Traversal
    #[error("could not descend into {path}")]
    DescentFailed {
        path: String,
        #[source]
        source: RemoteError,
    },

    #[error("could not list {path}")]
    ListingFailed {
        path: String,
        #[source]
        source: RemoteError,
    },

    #[error("could not classify {path}")]
    Unclassifiable {
        path: String,
        #[source]
        source: RemoteError,
    },

    #[error("could not return to {path}")]
    RestoreFailed {
        path: String,
        #[source]
        source: RemoteError,
    },

    #[error("{path} is not a direct entry of the listed directory")]
    NotDirectEntry { path: String },

    // Config
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EstimateError {
    /// The remote path this problem occurred at, if applicable.
    /// Callers use this to print "Skipped: <path>" without matching on variants.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::DescentFailed { path, .. }
            | Self::ListingFailed { path, .. }
            | Self::Unclassifiable { path, .. }
            | Self::RestoreFailed { path, .. }
            | Self::NotDirectEntry { path } => Some(path),
            Self::InvalidConfig(_) => None,
        }
    }

    /// Whether the estimate carried on after this problem.
    ///
    /// A failed restore is not recoverable: the cursor is somewhere unknown,
    /// so later siblings may be sized against the wrong directory.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DescentFailed { .. }
                | Self::ListingFailed { .. }
                | Self::Unclassifiable { .. }
                | Self::NotDirectEntry { .. }
        )
    }
}
