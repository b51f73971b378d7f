//! Error types for the logging engine

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File could not be opened, even after creating parent directories
    #[error("cannot open log file '{path}': {source}")]
    FileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A path component that should be a directory is not one
    #[error("not a directory: '{path}'")]
    NotADirectory { path: String },

    /// Sink rejected a write
    #[error("sink '{sink}' write failed: {message}")]
    SinkWrite { sink: String, message: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    pub fn file_open(path: impl Into<String>, source: std::io::Error) -> Self {
        LoggerError::FileOpen {
            path: path.into(),
            source,
        }
    }

    pub fn not_a_directory(path: impl Into<String>) -> Self {
        LoggerError::NotADirectory { path: path.into() }
    }

    pub fn sink_write(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkWrite {
            sink: sink.into(),
            message: message.into(),
        }
    }

    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}
