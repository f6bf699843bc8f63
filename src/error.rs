use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the typed failures of the generator
pub type Result<T> = std::result::Result<T, Error>;

/// Error types surfaced by the analysis core
#[derive(Debug, Error)]
pub enum Error {
    /// A source file could not be parsed
    #[error("parse error {}:{line}:{column}: {message}", file.display())]
    Parse {
        file: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// The handler of a class-based route could not be located in the source tree
    #[error("handler `{handler}` could not be located in the scanned sources")]
    HandlerNotFound { handler: String },

    /// A route record is malformed
    #[error("invalid route: {0}")]
    InvalidRoute(String),

    /// Analysis of a single route failed, `source` is the original failure
    #[error("error when analyzing route '{method} {uri}' ({action}): {source}")]
    RouteAnalysis {
        method: String,
        uri: String,
        action: String,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    /// Builds a parse error from a `syn` error, keeping the span location
    pub fn from_syn(file: impl Into<PathBuf>, err: &syn::Error) -> Self {
        let start = err.span().start();
        Error::Parse {
            file: file.into(),
            line: start.line,
            column: start.column + 1,
            message: err.to_string(),
        }
    }

    /// Source location of the failure, if the error (or its cause) carries one
    pub fn location(&self) -> Option<String> {
        match self {
            Error::Parse {
                file, line, column, ..
            } => Some(format!("{}:{}:{}", file.display(), line, column)),
            Error::RouteAnalysis { source, .. } => source
                .chain()
                .find_map(|cause| cause.downcast_ref::<Error>())
                .and_then(Error::location),
            _ => None,
        }
    }
}
