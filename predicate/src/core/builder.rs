//! Builder for composing condition trees.

use std::sync::Arc;

use super::{CombinationOp, ComparisonOp, Condition, Operand};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BuilderCombine {
    Leaf,
    Conjunction,
    Disjunction,
}

/// Builder for composing conditions incrementally.
///
/// Clauses are folded left to right into binary `Combine` nodes, so
/// `and().a().b().c()` yields `((a AND b) AND c)`. A builder without clauses
/// produces [`Condition::Empty`].
#[derive(Debug)]
pub struct ConditionBuilder {
    combine: BuilderCombine,
    clauses: Vec<Condition>,
}

impl ConditionBuilder {
    const fn new(combine: BuilderCombine) -> Self {
        Self {
            combine,
            clauses: Vec::new(),
        }
    }

    /// Creates a builder that expects a single clause.
    #[must_use]
    pub fn leaf() -> Self {
        Self::new(BuilderCombine::Leaf)
    }

    /// Creates a builder that emits an `AND` of all clauses.
    #[must_use]
    pub fn and() -> Self {
        Self::new(BuilderCombine::Conjunction)
    }

    /// Creates a builder that emits an `OR` of all clauses.
    #[must_use]
    pub fn or() -> Self {
        Self::new(BuilderCombine::Disjunction)
    }

    /// Adds an existing condition to the builder.
    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.clauses.push(condition);
        self
    }

    /// Adds a comparison clause.
    #[must_use]
    pub fn compare<F, O>(mut self, field: F, op: ComparisonOp, operand: O) -> Self
    where
        F: Into<Arc<str>>,
        O: Into<Operand>,
    {
        self.clauses.push(Condition::comparison(field, op, operand));
        self
    }

    /// Adds an equality clause.
    #[must_use]
    pub fn equals<F, O>(self, field: F, operand: O) -> Self
    where
        F: Into<Arc<str>>,
        O: Into<Operand>,
    {
        self.compare(field, ComparisonOp::Equal, operand)
    }

    /// Adds an inequality clause.
    #[must_use]
    pub fn not_equals<F, O>(self, field: F, operand: O) -> Self
    where
        F: Into<Arc<str>>,
        O: Into<Operand>,
    {
        self.compare(field, ComparisonOp::NotEqual, operand)
    }

    /// Adds a `<` clause.
    #[must_use]
    pub fn less_than<F, O>(self, field: F, operand: O) -> Self
    where
        F: Into<Arc<str>>,
        O: Into<Operand>,
    {
        self.compare(field, ComparisonOp::LessThan, operand)
    }

    /// Adds a `<=` clause.
    #[must_use]
    pub fn less_than_or_equal<F, O>(self, field: F, operand: O) -> Self
    where
        F: Into<Arc<str>>,
        O: Into<Operand>,
    {
        self.compare(field, ComparisonOp::LessThanOrEqual, operand)
    }

    /// Adds a `>` clause.
    #[must_use]
    pub fn greater_than<F, O>(self, field: F, operand: O) -> Self
    where
        F: Into<Arc<str>>,
        O: Into<Operand>,
    {
        self.compare(field, ComparisonOp::GreaterThan, operand)
    }

    /// Adds a `>=` clause.
    #[must_use]
    pub fn greater_than_or_equal<F, O>(self, field: F, operand: O) -> Self
    where
        F: Into<Arc<str>>,
        O: Into<Operand>,
    {
        self.compare(field, ComparisonOp::GreaterThanOrEqual, operand)
    }

    /// Adds an `IS NULL` clause (`field = NULL`).
    #[must_use]
    pub fn is_null<F>(self, field: F) -> Self
    where
        F: Into<Arc<str>>,
    {
        self.compare(field, ComparisonOp::Equal, Operand::Null)
    }

    /// Adds an `IS NOT NULL` clause (`field != NULL`).
    #[must_use]
    pub fn is_not_null<F>(self, field: F) -> Self
    where
        F: Into<Arc<str>>,
    {
        self.compare(field, ComparisonOp::NotEqual, Operand::Null)
    }

    fn branch<F>(mut self, combine: BuilderCombine, build: F) -> Self
    where
        F: FnOnce(ConditionBuilder) -> ConditionBuilder,
    {
        let condition = build(ConditionBuilder::new(combine)).build();
        self.clauses.push(condition);
        self
    }

    /// Adds a nested conjunction built by the supplied closure.
    #[must_use]
    pub fn and_group<F>(self, build: F) -> Self
    where
        F: FnOnce(ConditionBuilder) -> ConditionBuilder,
    {
        self.branch(BuilderCombine::Conjunction, build)
    }

    /// Adds a nested disjunction built by the supplied closure.
    #[must_use]
    pub fn or_group<F>(self, build: F) -> Self
    where
        F: FnOnce(ConditionBuilder) -> ConditionBuilder,
    {
        self.branch(BuilderCombine::Disjunction, build)
    }

    /// Adds the negation of a conjunction built by the supplied closure.
    ///
    /// An empty group stays [`Condition::Empty`] and is rejected when the
    /// condition is bound.
    #[must_use]
    pub fn not_group<F>(mut self, build: F) -> Self
    where
        F: FnOnce(ConditionBuilder) -> ConditionBuilder,
    {
        let condition = build(ConditionBuilder::and()).build();
        self.clauses.push(condition.negate().unwrap_or(Condition::Empty));
        self
    }

    /// Consumes the builder and returns the composed condition.
    ///
    /// # Panics
    ///
    /// Panics if a [`ConditionBuilder::leaf`] builder holds more than one clause.
    #[must_use]
    pub fn build(self) -> Condition {
        let op = match self.combine {
            BuilderCombine::Leaf => {
                assert!(
                    self.clauses.len() <= 1,
                    "ConditionBuilder::leaf must contain exactly one clause"
                );
                CombinationOp::And
            }
            BuilderCombine::Conjunction => CombinationOp::And,
            BuilderCombine::Disjunction => CombinationOp::Or,
        };
        let mut clauses = self.clauses.into_iter();
        let Some(first) = clauses.next() else {
            return Condition::Empty;
        };
        clauses.fold(first, |acc, clause| acc.combine(&clause, op))
    }
}

impl Default for ConditionBuilder {
    fn default() -> Self {
        Self::leaf()
    }
}
