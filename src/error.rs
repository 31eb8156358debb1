use thiserror::Error;

/// Configuration load/validation failures. Fatal to the load that produced them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown pipeline step: \"{0}\"")]
    UnknownStep(String),

    #[error("invalid step order: {0}")]
    StepOrder(String),

    #[error("invalid identifier \"{0}\": must match ^[A-Za-z_][A-Za-z0-9_]*$")]
    UnsafeIdentifier(String),

    #[error("invalid regex pattern \"{pattern}\": {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A single stage's failure while processing one message. Recoverable at the
/// message level — the caller attaches it to that message's result.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("stage \"{stage}\" failed: {message}")]
    Failed { stage: &'static str, message: String },
}

/// The embedding provider is absent or returned an error. The semantic stage
/// downgrades to a null result and logs; the rest of the pipeline proceeds.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("embedding response had {got} vectors, expected {expected}")]
    ShapeMismatch { expected: usize, got: usize },
}

/// Top-level error returned by the pipeline orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("dependency unavailable: {0}")]
    Dependency(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
