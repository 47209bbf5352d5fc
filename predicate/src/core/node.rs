use std::{cmp::Ordering, fmt, sync::Arc};

use super::{Condition, Operand};

/// Comparison operator used by leaf conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// Equals (`=`).
    Equal,
    /// Not equals (`!=`).
    NotEqual,
    /// Less than (`<`).
    LessThan,
    /// Less than or equal to (`<=`).
    LessThanOrEqual,
    /// Greater than (`>`).
    GreaterThan,
    /// Greater than or equal to (`>=`).
    GreaterThanOrEqual,
}

impl ComparisonOp {
    /// Returns a textual representation of the operator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "!=",
            ComparisonOp::LessThan => "<",
            ComparisonOp::LessThanOrEqual => "<=",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::GreaterThanOrEqual => ">=",
        }
    }

    /// Returns the logical negation of this operator.
    ///
    /// Negation pairs are `<` / `>=`, `<=` / `>` and `=` / `!=`, so applying
    /// it twice yields the same operator.
    #[must_use]
    pub fn negated(self) -> Self {
        match self {
            ComparisonOp::Equal => ComparisonOp::NotEqual,
            ComparisonOp::NotEqual => ComparisonOp::Equal,
            ComparisonOp::LessThan => ComparisonOp::GreaterThanOrEqual,
            ComparisonOp::LessThanOrEqual => ComparisonOp::GreaterThan,
            ComparisonOp::GreaterThan => ComparisonOp::LessThanOrEqual,
            ComparisonOp::GreaterThanOrEqual => ComparisonOp::LessThan,
        }
    }

    /// Evaluates the operator against the ordering of `cell` relative to the operand.
    #[must_use]
    pub fn test_ordering(self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Equal => ordering == Ordering::Equal,
            ComparisonOp::NotEqual => ordering != Ordering::Equal,
            ComparisonOp::LessThan => ordering == Ordering::Less,
            ComparisonOp::LessThanOrEqual => ordering != Ordering::Greater,
            ComparisonOp::GreaterThan => ordering == Ordering::Greater,
            ComparisonOp::GreaterThanOrEqual => ordering != Ordering::Less,
        }
    }

    /// Like [`ComparisonOp::test_ordering`], but for partially ordered values.
    ///
    /// Unordered pairs (NaN) only satisfy `!=`.
    #[must_use]
    pub fn test_partial(self, ordering: Option<Ordering>) -> bool {
        match ordering {
            Some(ordering) => self.test_ordering(ordering),
            None => self == ComparisonOp::NotEqual,
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator joining the two children of a [`Combine`] node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CombinationOp {
    /// Logical conjunction.
    And,
    /// Logical disjunction.
    Or,
}

impl CombinationOp {
    /// Returns the De Morgan dual of this operator.
    #[must_use]
    pub fn dual(self) -> Self {
        match self {
            CombinationOp::And => CombinationOp::Or,
            CombinationOp::Or => CombinationOp::And,
        }
    }

    /// Returns a textual representation of the operator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CombinationOp::And => "AND",
            CombinationOp::Or => "OR",
        }
    }
}

impl fmt::Display for CombinationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leaf comparison of a single field against an operand.
#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    /// Dimension or attribute name.
    pub field: Arc<str>,
    /// Operator applied as `cell <op> operand`.
    pub op: ComparisonOp,
    /// Right-hand side operand.
    pub operand: Operand,
}

impl Comparison {
    /// Creates a new comparison leaf.
    #[must_use]
    pub fn new<F, O>(field: F, op: ComparisonOp, operand: O) -> Self
    where
        F: Into<Arc<str>>,
        O: Into<Operand>,
    {
        Self {
            field: field.into(),
            op,
            operand: operand.into(),
        }
    }

    /// Returns the same comparison with the operator negated.
    #[must_use]
    pub fn negated(&self) -> Self {
        Self {
            field: Arc::clone(&self.field),
            op: self.op.negated(),
            operand: self.operand.clone(),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.operand)
    }
}

/// Internal node joining two sub-conditions.
#[derive(Clone, Debug, PartialEq)]
pub struct Combine {
    /// Combination operator.
    pub op: CombinationOp,
    /// Left child.
    pub left: Condition,
    /// Right child.
    pub right: Condition,
}
