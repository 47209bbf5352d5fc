//! Condition construction, validation and the error taxonomy.
//!
//! Re-exports the `cellfilter_predicate` tree model and adds what needs a
//! field catalog: checked leaf construction and binding.

mod bind;
mod error;

pub(crate) use bind::BoundNode;
pub use bind::{make_comparison, BoundCondition};
pub use cellfilter_predicate::{
    CombinationOp, Combine, Comparison, ComparisonOp, Condition, ConditionBuilder, ConditionError,
    ConditionVisitor, Operand,
};
pub use error::{ErrorKind, QueryError};

/// Returns whether `condition` may be used on a read that also requests
/// dimension-label results.
///
/// Only an unset condition is compatible; see [`crate::read::ReadQuery::check`].
#[must_use]
pub fn is_compatible_with_dimension_labels(condition: &Condition) -> bool {
    condition.is_empty()
}
