use thiserror::Error;

/// Fatal infrastructure errors: startup failures that abort before the
/// server ever serves traffic, and `accept` failures that abort the
/// acceptor loop mid-run, both non-recoverable by design.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid command line: {0}")]
    Usage(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set document root {path}: {source}")]
    Chdir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn {kind} thread: {source}")]
    ThreadSpawn {
        kind: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("accept() failed: {source}")]
    Accept {
        #[source]
        source: std::io::Error,
    },

    #[error("logger initialization failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;
