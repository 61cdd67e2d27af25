//! Error kinds reported by the evaluation pipeline.

/// Every failure of the pipeline is one of these local, recoverable conditions.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum Error {
    /// Two operands of an addition-like operation carry different scales.
    #[display(fmt = "scale mismatch: {} vs {}", left, right)]
    ScaleMismatch { left: f64, right: f64 },
    /// An operand was created under a different parameter set or has the wrong shape.
    #[display(fmt = "modulus mismatch: {}", reason)]
    ModulusMismatch { reason: String },
    /// A ciphertext has the wrong number of polynomial components for the operation.
    #[display(fmt = "invalid component count: expected {}, found {}", expected, found)]
    InvalidComponentCount { expected: String, found: usize },
    /// An operand has no noise budget left; further evaluation would produce garbage.
    #[display(fmt = "noise budget exhausted before {}", operation)]
    NoiseBudgetExhausted { operation: &'static str },
    /// A serialized payload belongs to another format version or parameter set.
    #[display(fmt = "incompatible context: {}", reason)]
    IncompatibleContext { reason: String },
    /// A serialized payload is truncated or corrupt.
    #[display(fmt = "malformed payload: {}", reason)]
    MalformedPayload { reason: String },
    /// Parameters or encoder inputs are not usable.
    #[display(fmt = "invalid parameters: {}", reason)]
    InvalidParameters { reason: String },
    /// The transport collaborator failed to deliver a payload.
    #[display(fmt = "transport failure: {}", reason)]
    Transport { reason: String },
}

impl Error {

    pub(crate) fn invalid_parameters(reason: impl Into<String>) -> Self {
        Error::InvalidParameters { reason: reason.into() }
    }

    pub(crate) fn modulus_mismatch(reason: impl Into<String>) -> Self {
        Error::ModulusMismatch { reason: reason.into() }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedPayload { reason: reason.into() }
    }

    pub(crate) fn incompatible(reason: impl Into<String>) -> Self {
        Error::IncompatibleContext { reason: reason.into() }
    }

}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::malformed("payload is truncated"),
            _ => Error::malformed(error.to_string()),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
