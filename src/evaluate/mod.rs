//! Condition evaluation over per-tile field buffers.
//!
//! Leaves are evaluated one field at a time into a [`SelectionVector`].
//! `AND`/`OR` nodes pass a mask down to their right child so cells already
//! decided by the left child are never compared again.

pub(crate) mod comparator;
mod selection;

use cellfilter_predicate::{CombinationOp, Condition};
pub use selection::SelectionVector;

use crate::{
    buffer::FieldBufferSet,
    observability::log_trace,
    query::{BoundCondition, BoundNode, QueryError},
    schema::FieldCatalog,
};

/// Binds `condition` against `catalog` and evaluates it over one tile.
///
/// # Errors
///
/// Fails on any binding error (see [`BoundCondition::bind`]) and on any error
/// of [`BoundCondition::evaluate`].
pub fn evaluate<C>(
    condition: &Condition,
    catalog: &C,
    buffers: &FieldBufferSet<'_>,
) -> Result<SelectionVector, QueryError>
where
    C: FieldCatalog + ?Sized,
{
    BoundCondition::bind(condition, catalog)?.evaluate(buffers)
}

impl BoundCondition {
    /// Evaluates the condition over one tile.
    ///
    /// Every referenced buffer is looked up and checked before any cell is
    /// compared, so the call either yields a full selection or fails without
    /// partial output.
    ///
    /// # Errors
    ///
    /// - [`QueryError::MissingBuffer`] when a referenced field has no buffer.
    /// - [`QueryError::MalformedBuffer`] when a buffer does not match its
    ///   field's layout or the buffers disagree on the cell count.
    pub fn evaluate(&self, buffers: &FieldBufferSet<'_>) -> Result<SelectionVector, QueryError> {
        let mut cell_count = None;
        for (name, field) in &self.fields {
            let buffer = buffers.get(name)?;
            buffer.validate(field)?;
            match cell_count {
                None => cell_count = Some(buffer.cell_count()),
                Some(expected) if expected != buffer.cell_count() => {
                    return Err(QueryError::malformed(
                        name,
                        format!(
                            "{} cells where other fields have {expected}",
                            buffer.cell_count()
                        ),
                    ));
                }
                Some(_) => {}
            }
        }

        let len = cell_count.unwrap_or_default() as usize;
        let selection = self.root.evaluate(buffers, &SelectionVector::all(len))?;
        log_trace!(
            component = "evaluate",
            event = "tile_evaluated",
            cells = len,
            selected = selection.count_selected(),
        );
        Ok(selection)
    }
}

impl BoundNode {
    /// Cells outside `mask` always come out unselected.
    fn evaluate(
        &self,
        buffers: &FieldBufferSet<'_>,
        mask: &SelectionVector,
    ) -> Result<SelectionVector, QueryError> {
        match self {
            BoundNode::Leaf(leaf) => {
                let buffer = buffers.get(&leaf.field)?;
                Ok(leaf.comparator.evaluate(buffer, leaf.layout, mask))
            }
            BoundNode::Combine {
                op: CombinationOp::And,
                left,
                right,
            } => {
                let left = left.evaluate(buffers, mask)?;
                if left.count_selected() == 0 {
                    return Ok(left);
                }
                right.evaluate(buffers, &left)
            }
            BoundNode::Combine {
                op: CombinationOp::Or,
                left,
                right,
            } => {
                let left = left.evaluate(buffers, mask)?;
                let undecided = mask & &!&left;
                if undecided.count_selected() == 0 {
                    return Ok(left);
                }
                let right = right.evaluate(buffers, &undecided)?;
                Ok(&left | &right)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use cellfilter_predicate::{ComparisonOp, Condition, ConditionBuilder, Operand};

    use super::evaluate;
    use crate::{
        buffer::{FieldBuffer, FieldBufferSet},
        query::{BoundCondition, ErrorKind},
        schema::{ArraySchema, ArrayType, Datatype, FieldInfo},
    };

    fn le_i64(values: &[i64]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn schema() -> ArraySchema {
        ArraySchema::builder(ArrayType::Sparse)
            .dimension("d", Datatype::Int64)
            .field(FieldInfo::attribute("a", Datatype::Int64).nullable(true))
            .field(FieldInfo::attribute("s", Datatype::StringUtf8).var_sized())
            .build()
            .expect("schema")
    }

    #[test]
    fn mixed_dimension_and_attribute_tree() {
        let schema = schema();
        let d = le_i64(&[1, 2, 3, 4]);
        let a = le_i64(&[10, 20, 30, 40]);
        let validity = [1u8, 1, 0, 1];
        let s = b"xyzxyyz";
        let offsets = [0u64, 1, 3, 5];
        let buffers = FieldBufferSet::new()
            .with("d", FieldBuffer::fixed(&d, 4))
            .with("a", FieldBuffer::fixed(&a, 4).with_validity(&validity))
            .with("s", FieldBuffer::var(s, &offsets, 4));

        // (d >= 2 AND a != 40) OR s = "x"
        let cond = ConditionBuilder::or()
            .and_group(|g| g.greater_than_or_equal("d", 2i64).not_equals("a", 40i64))
            .equals("s", "x")
            .build();
        let selection = evaluate(&cond, &schema, &buffers).expect("evaluate");
        assert_eq!(selection.to_vec(), vec![true, true, false, false]);

        let nulls = Condition::comparison("a", ComparisonOp::Equal, Operand::Null);
        let selection = evaluate(&nulls, &schema, &buffers).expect("evaluate");
        assert_eq!(selection.to_vec(), vec![false, false, true, false]);
    }

    #[test]
    fn missing_buffer_fails_even_when_short_circuited() {
        let schema = schema();
        let d = le_i64(&[1, 2]);
        let buffers = FieldBufferSet::new().with("d", FieldBuffer::fixed(&d, 2));
        let cond = Condition::comparison("d", ComparisonOp::GreaterThan, 5i64)
            .and(&Condition::comparison("s", ComparisonOp::Equal, "x"));
        let err = evaluate(&cond, &schema, &buffers).expect_err("missing s");
        assert_eq!(err.kind(), ErrorKind::MissingBuffer);
        assert_eq!(err.to_string(), "no buffer supplied for field 's'");
    }

    #[test]
    fn cell_counts_must_agree() {
        let schema = schema();
        let d = le_i64(&[1, 2]);
        let a = le_i64(&[1, 2, 3]);
        let validity = [1u8; 3];
        let buffers = FieldBufferSet::new()
            .with("d", FieldBuffer::fixed(&d, 2))
            .with("a", FieldBuffer::fixed(&a, 3).with_validity(&validity));
        let cond = Condition::comparison("d", ComparisonOp::GreaterThan, 0i64)
            .or(&Condition::comparison("a", ComparisonOp::GreaterThan, 0i64));
        let err = evaluate(&cond, &schema, &buffers).expect_err("count mismatch");
        assert_eq!(err.kind(), ErrorKind::MalformedBuffer);
    }

    #[test]
    fn empty_condition_is_rejected() {
        let schema = schema();
        let err = evaluate(&Condition::Empty, &schema, &FieldBufferSet::new())
            .expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::InvalidCondition);
    }

    #[test]
    fn bound_condition_is_reusable_across_tiles() {
        let schema = schema();
        let cond = Condition::comparison("d", ComparisonOp::LessThan, 3i64);
        let bound = BoundCondition::bind(&cond, &schema).expect("bind");
        for (values, expected) in [
            (le_i64(&[1, 5, 2]), vec![true, false, true]),
            (le_i64(&[9]), vec![false]),
            (Vec::new(), Vec::new()),
        ] {
            let count = (values.len() / 8) as u64;
            let buffers = FieldBufferSet::new().with("d", FieldBuffer::fixed(&values, count));
            assert_eq!(bound.evaluate(&buffers).expect("evaluate").to_vec(), expected);
        }
    }
}
