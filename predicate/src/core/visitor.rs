use super::{CombinationOp, Comparison, Condition};

/// Visitor that walks condition trees bottom-up and folds them into a value.
pub trait ConditionVisitor {
    /// Error type used when the walk fails.
    type Error;
    /// Concrete value type produced while walking the condition.
    type Value;

    /// Handles an unconstructed (`Empty`) tree or subtree.
    fn visit_empty(&mut self) -> Result<Self::Value, Self::Error>;

    /// Evaluates a leaf comparison.
    fn visit_comparison(&mut self, comparison: &Comparison) -> Result<Self::Value, Self::Error>;

    /// Combines the results of both children of a `Combine` node.
    fn combine(
        &mut self,
        op: CombinationOp,
        left: Self::Value,
        right: Self::Value,
    ) -> Result<Self::Value, Self::Error>;

    /// Visits the supplied condition by walking the tree recursively.
    fn visit_condition(&mut self, condition: &Condition) -> Result<Self::Value, Self::Error> {
        match condition {
            Condition::Empty => self.visit_empty(),
            Condition::Comparison(comparison) => self.visit_comparison(comparison),
            Condition::Combine(node) => {
                let left = self.visit_condition(&node.left)?;
                let right = self.visit_condition(&node.right)?;
                self.combine(node.op, left, right)
            }
        }
    }
}
