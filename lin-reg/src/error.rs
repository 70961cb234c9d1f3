use thiserror::Error;

/// Failures of the ridge solve
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinRegError {
    #[error("XᵀX + λI is singular for lambda {lambda}")]
    SingularSystem { lambda: f64 },

    #[error("Invalid ridge penalty {0}, penalties must be finite and non-negative")]
    InvalidLambda(f64),

    #[error("At least one ridge penalty is required")]
    NoLambdas,

    #[error("Design matrix has no columns")]
    EmptyDesign,

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
}
