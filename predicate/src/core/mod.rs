#![deny(missing_docs)]
//! Core condition structures shared by the evaluator and the read path.

mod builder;
mod node;
mod operand;
mod visitor;

use std::{collections::BTreeSet, convert::Infallible, fmt, sync::Arc};

pub use builder::ConditionBuilder;
pub use node::{CombinationOp, Combine, Comparison, ComparisonOp};
pub use operand::Operand;
use thiserror::Error;
pub use visitor::ConditionVisitor;

/// Errors raised while transforming condition trees.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConditionError {
    /// The tree (or one of its subtrees) was never constructed.
    #[error("invalid condition: {0}")]
    InvalidCondition(&'static str),
}

/// Immutable boolean filter over dimension and attribute values.
///
/// Conditions are values: cloning is cheap, and [`Condition::combine`] and
/// [`Condition::negate`] return new trees that share unchanged subtrees with
/// their inputs. A tree can therefore be reused in several independent
/// conditions and shared read-only across threads.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Condition {
    /// Unconstructed condition; never treated as "match all".
    #[default]
    Empty,
    /// Leaf comparison.
    Comparison(Arc<Comparison>),
    /// `AND` / `OR` of two sub-conditions.
    Combine(Arc<Combine>),
}

impl Condition {
    /// Builds a leaf comparison `field <op> operand`.
    ///
    /// Field existence and operand width are checked when the condition is
    /// bound against a catalog.
    #[must_use]
    pub fn comparison<F, O>(field: F, op: ComparisonOp, operand: O) -> Self
    where
        F: Into<Arc<str>>,
        O: Into<Operand>,
    {
        Self::from_comparison(Comparison::new(field, op, operand))
    }

    /// Wraps an existing comparison leaf.
    #[must_use]
    pub fn from_comparison(comparison: Comparison) -> Self {
        Condition::Comparison(Arc::new(comparison))
    }

    /// Joins `self` and `other` under `op`, leaving both usable afterwards.
    #[must_use]
    pub fn combine(&self, other: &Condition, op: CombinationOp) -> Self {
        Condition::Combine(Arc::new(Combine {
            op,
            left: self.clone(),
            right: other.clone(),
        }))
    }

    /// Shorthand for [`Condition::combine`] with [`CombinationOp::And`].
    #[must_use]
    pub fn and(&self, other: &Condition) -> Self {
        self.combine(other, CombinationOp::And)
    }

    /// Shorthand for [`Condition::combine`] with [`CombinationOp::Or`].
    #[must_use]
    pub fn or(&self, other: &Condition) -> Self {
        self.combine(other, CombinationOp::Or)
    }

    /// Returns the logical negation of this condition.
    ///
    /// Leaves flip their operator and combinators follow De Morgan, so the
    /// result never contains an explicit `NOT` node.
    ///
    /// # Errors
    ///
    /// Returns [`ConditionError::InvalidCondition`] when the tree is or
    /// contains [`Condition::Empty`].
    pub fn negate(&self) -> Result<Self, ConditionError> {
        match self {
            Condition::Empty => Err(ConditionError::InvalidCondition(
                "cannot negate an empty condition",
            )),
            Condition::Comparison(comparison) => Ok(Self::from_comparison(comparison.negated())),
            Condition::Combine(node) => {
                let left = node.left.negate()?;
                let right = node.right.negate()?;
                Ok(left.combine(&right, node.op.dual()))
            }
        }
    }

    /// Returns true for an unconstructed condition.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Condition::Empty)
    }

    /// Returns true when the tree or any subtree is [`Condition::Empty`].
    #[must_use]
    pub fn contains_empty(&self) -> bool {
        match self {
            Condition::Empty => true,
            Condition::Comparison(_) => false,
            Condition::Combine(node) => node.left.contains_empty() || node.right.contains_empty(),
        }
    }

    /// Names of all fields referenced by the tree.
    #[must_use]
    pub fn field_names(&self) -> BTreeSet<Arc<str>> {
        match self.accept(&mut FieldNames) {
            Ok(names) => names,
            Err(never) => match never {},
        }
    }

    /// Number of comparison leaves in the tree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Condition::Empty => 0,
            Condition::Comparison(_) => 1,
            Condition::Combine(node) => node.left.leaf_count() + node.right.leaf_count(),
        }
    }

    /// Accepts a visitor that walks the tree bottom-up.
    pub fn accept<V>(&self, visitor: &mut V) -> Result<V::Value, V::Error>
    where
        V: ConditionVisitor + ?Sized,
    {
        visitor.visit_condition(self)
    }
}

impl From<Comparison> for Condition {
    fn from(value: Comparison) -> Self {
        Self::from_comparison(value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Empty => f.write_str("<empty>"),
            Condition::Comparison(comparison) => comparison.fmt(f),
            Condition::Combine(node) => write!(f, "({} {} {})", node.left, node.op, node.right),
        }
    }
}

struct FieldNames;

impl ConditionVisitor for FieldNames {
    type Error = Infallible;
    type Value = BTreeSet<Arc<str>>;

    fn visit_empty(&mut self) -> Result<Self::Value, Infallible> {
        Ok(BTreeSet::new())
    }

    fn visit_comparison(&mut self, comparison: &Comparison) -> Result<Self::Value, Infallible> {
        Ok(BTreeSet::from([Arc::clone(&comparison.field)]))
    }

    fn combine(
        &mut self,
        _op: CombinationOp,
        mut left: Self::Value,
        right: Self::Value,
    ) -> Result<Self::Value, Infallible> {
        left.extend(right);
        Ok(left)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{CombinationOp, ComparisonOp, Condition, ConditionError};

    fn cmp(field: &str, op: ComparisonOp) -> Condition {
        Condition::comparison(field, op, 1i64)
    }

    #[test]
    fn empty_is_default_and_detectable() {
        let empty = Condition::default();
        assert!(empty.is_empty());
        assert!(empty.contains_empty());
        assert_eq!(empty.leaf_count(), 0);
        assert!(!cmp("a", ComparisonOp::Equal).is_empty());
    }

    #[test]
    fn negate_empty_is_rejected() {
        assert_eq!(
            Condition::Empty.negate(),
            Err(ConditionError::InvalidCondition(
                "cannot negate an empty condition"
            ))
        );
        let partial = cmp("a", ComparisonOp::Equal).and(&Condition::Empty);
        assert!(partial.negate().is_err());
    }

    #[test]
    fn negate_applies_demorgan() {
        let tree = cmp("a", ComparisonOp::Equal).and(&cmp("b", ComparisonOp::LessThan));
        let negated = tree.negate().expect("negate");
        let Condition::Combine(node) = &negated else {
            panic!("expected Combine, got {negated:?}");
        };
        assert_eq!(node.op, CombinationOp::Or);
        let ops: Vec<ComparisonOp> = [&node.left, &node.right]
            .into_iter()
            .filter_map(|child| match child {
                Condition::Comparison(leaf) => Some(leaf.op),
                _ => None,
            })
            .collect();
        assert_eq!(
            ops,
            vec![ComparisonOp::NotEqual, ComparisonOp::GreaterThanOrEqual]
        );
    }

    #[test]
    fn double_negation_restores_tree() {
        let tree = cmp("a", ComparisonOp::LessThanOrEqual)
            .or(&cmp("b", ComparisonOp::GreaterThan))
            .and(&cmp("c", ComparisonOp::NotEqual));
        let twice = tree.negate().and_then(|t| t.negate()).expect("negate");
        assert_eq!(twice, tree);
    }

    #[test]
    fn combine_shares_operands_without_consuming_them() {
        let a = cmp("a", ComparisonOp::Equal);
        let b = cmp("b", ComparisonOp::Equal);
        let first = a.and(&b);
        let second = a.or(&b);

        let (Condition::Combine(first), Condition::Combine(second)) = (&first, &second) else {
            panic!("expected Combine nodes");
        };
        let (Condition::Comparison(left_a), Condition::Comparison(right_a)) =
            (&first.left, &second.left)
        else {
            panic!("expected leaves");
        };
        assert!(Arc::ptr_eq(left_a, right_a));
        assert!(!a.is_empty());
    }

    #[test]
    fn field_names_collects_every_leaf() {
        let tree = cmp("rows", ComparisonOp::GreaterThanOrEqual)
            .and(&cmp("rows", ComparisonOp::LessThanOrEqual))
            .and(&cmp("a", ComparisonOp::NotEqual));
        let names: Vec<String> = tree.field_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["a".to_string(), "rows".to_string()]);
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn display_renders_infix() {
        let tree = Condition::comparison("a", ComparisonOp::LessThan, "x")
            .or(&Condition::comparison("b", ComparisonOp::Equal, super::Operand::Null));
        assert_eq!(tree.to_string(), "(a < 'x' OR b = NULL)");
    }
}
