#![deny(missing_docs)]
//! Condition-tree model for cell filtering in multi-dimensional arrays.
//!
//! A [`Condition`] is an immutable tree of field comparisons joined by
//! `AND`/`OR`. Operands are raw typed bytes; the tree itself knows nothing
//! about datatypes or buffers. Binding a condition to a field catalog and
//! evaluating it against tile buffers lives in the `cellfilter` crate.

mod core;

pub use crate::core::{
    CombinationOp, Combine, Comparison, ComparisonOp, Condition, ConditionBuilder,
    ConditionError, ConditionVisitor, Operand,
};
