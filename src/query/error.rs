use cellfilter_predicate::ConditionError;
use thiserror::Error;

/// Coarse classification of [`QueryError`] values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An empty condition was submitted, negated, or bound.
    InvalidCondition,
    /// A leaf references a field absent from the catalog.
    FieldNotFound,
    /// An operand does not fit the field it is compared with.
    TypeMismatch,
    /// A referenced field has no buffer for the tile being evaluated.
    MissingBuffer,
    /// A condition was combined with an unsupported read feature.
    IncompatibleFeature,
    /// A supplied buffer does not match its field's declared layout.
    MalformedBuffer,
    /// The array schema itself is inconsistent.
    Schema,
    /// The read query was modified after submission.
    InvalidState,
}

/// Errors raised while building, binding, evaluating, or applying conditions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Empty condition where a constructed one is required.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),
    /// Unknown dimension, attribute, or dimension label.
    #[error("unknown dimension or attribute: {0}")]
    FieldNotFound(String),
    /// Operand incompatible with the field's datatype or width.
    #[error("type mismatch for field '{field}': {detail}")]
    TypeMismatch {
        /// Offending field.
        field: String,
        /// Description of the mismatch.
        detail: String,
    },
    /// No buffer was supplied for a field the condition reads.
    #[error("no buffer supplied for field '{0}'")]
    MissingBuffer(String),
    /// Unsupported combination of read features.
    #[error("incompatible feature: {0}")]
    IncompatibleFeature(String),
    /// Buffer shape does not match the field layout.
    #[error("malformed buffer for field '{field}': {detail}")]
    MalformedBuffer {
        /// Offending field.
        field: String,
        /// Description of the inconsistency.
        detail: String,
    },
    /// Inconsistent array schema declaration.
    #[error("invalid schema: {0}")]
    Schema(String),
    /// Operation not allowed in the query's current state.
    #[error("invalid query state: {0}")]
    InvalidState(&'static str),
}

impl QueryError {
    /// Returns the error's kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::InvalidCondition(_) => ErrorKind::InvalidCondition,
            QueryError::FieldNotFound(_) => ErrorKind::FieldNotFound,
            QueryError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            QueryError::MissingBuffer(_) => ErrorKind::MissingBuffer,
            QueryError::IncompatibleFeature(_) => ErrorKind::IncompatibleFeature,
            QueryError::MalformedBuffer { .. } => ErrorKind::MalformedBuffer,
            QueryError::Schema(_) => ErrorKind::Schema,
            QueryError::InvalidState(_) => ErrorKind::InvalidState,
        }
    }

    pub(crate) fn type_mismatch(field: &str, detail: impl Into<String>) -> Self {
        QueryError::TypeMismatch {
            field: field.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn malformed(field: &str, detail: impl Into<String>) -> Self {
        QueryError::MalformedBuffer {
            field: field.to_string(),
            detail: detail.into(),
        }
    }
}

impl From<ConditionError> for QueryError {
    fn from(err: ConditionError) -> Self {
        match err {
            ConditionError::InvalidCondition(reason) => {
                QueryError::InvalidCondition(reason.to_string())
            }
        }
    }
}
