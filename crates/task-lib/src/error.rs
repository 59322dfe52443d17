//! Error types for task operations.

use std::path::PathBuf;

/// Errors that can occur during task operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A required input was not supplied by the agent.
    #[error("Input required: {0}")]
    InputRequired(String),

    /// A non-optional service endpoint value is missing.
    #[error("Endpoint not present: {id}")]
    EndpointNotPresent {
        /// The endpoint identifier.
        id: String,
        /// The environment key that was looked up.
        key: String,
    },

    /// The endpoint authorization payload is not valid JSON.
    #[error("Invalid endpoint auth for {id}: {source}")]
    InvalidEndpointAuth {
        /// The endpoint identifier.
        id: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A path that was expected to exist does not.
    #[error("Not found {name}: {}", path.display())]
    PathNotFound {
        /// Name used to identify the path in messages.
        name: String,
        /// The missing path.
        path: PathBuf,
    },

    /// The path exists but is not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// `popd` was called with nothing pushed.
    #[error("directory stack empty")]
    DirectoryStackEmpty,

    /// A filesystem operation failed.
    #[error("{operation} failed: {message}")]
    OperationFailed {
        /// The operation name (`cp`, `mv`, `find`, ...).
        operation: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// An executable could not be located.
    #[error("Unable to locate executable file: {0}")]
    ToolNotFound(String),

    /// Executable lookup failed due to a system error.
    #[error("tool lookup error: {0}")]
    ToolLookup(String),

    /// The tool process could not be started.
    #[error("failed to start {tool}: {source}")]
    ToolStart {
        /// The tool path.
        tool: String,
        /// The spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The tool exited with a non-zero code.
    #[error("{tool} failed with return code: {code}")]
    ToolFailed {
        /// The tool path.
        tool: String,
        /// The exit code, `-1` when terminated by a signal.
        code: i32,
    },

    /// The tool wrote to stderr while `fail_on_std_err` was set.
    #[error("{tool} failed because it wrote to stderr")]
    ToolWroteToStderr {
        /// The tool path.
        tool: String,
    },

    /// A glob or legacy find pattern could not be compiled.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A logging command line could not be parsed.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// A resource file has no `messages` object.
    #[error("invalid resource file: {}", .0.display())]
    InvalidResourceFile(PathBuf),

    /// A URL value could not be parsed.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for task operations.
pub type Result<T> = std::result::Result<T, Error>;
