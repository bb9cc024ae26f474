use thiserror::Error;

/// Error type for invalid operations.
///
/// Variants fall into three bands with different handling contracts:
/// configuration errors are fatal at setup and never recovered; numerical
/// failures abort the current step and name the first offending
/// node/system/pool; forcing failures are recoverable and surfaced as
/// warnings by the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LittoralError {
    #[error("{0}")]
    Configuration(String),
    #[error("reactor is missing required system '{system}'")]
    MissingSystem { system: String },
    #[error("system '{system}' has no pool named '{pool}'")]
    UnknownPool { system: String, pool: String },
    #[error("shape mismatch for '{field}': expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        field: String,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error(
        "'{pool}' in system '{system}' left its valid range at node {node}, layer {layer}: {value}"
    )]
    RangeViolation {
        system: String,
        pool: String,
        node: usize,
        layer: usize,
        value: f64,
    },
    #[error("singular linear system for '{tracer}' at node {node}")]
    SingularSystem { tracer: String, node: usize },
    #[error("malformed forcing record: {0}")]
    Forcing(String),
}

/// Convenience type for `Result<T, LittoralError>`.
pub type LittoralResult<T> = Result<T, LittoralError>;
