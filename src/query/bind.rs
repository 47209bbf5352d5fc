//! Resolves condition leaves against a field catalog.
//!
//! Binding is where deferred validation happens: field existence, operand
//! width, and `NULL` usage. Each leaf also gets its [`Comparator`] here, so
//! evaluation never re-inspects datatypes.

use std::{collections::BTreeMap, sync::Arc};

use cellfilter_predicate::{
    CombinationOp, Comparison, ComparisonOp, Condition, ConditionVisitor, Operand,
};

use super::QueryError;
use crate::{
    evaluate::comparator::{CellLayout, Comparator, NumericKind},
    observability::log_debug,
    schema::{FieldCatalog, FieldInfo},
};

/// Leaf with its field resolved and comparator selected.
#[derive(Clone, Debug)]
pub(crate) struct BoundLeaf {
    pub(crate) field: Arc<str>,
    pub(crate) layout: CellLayout,
    pub(crate) comparator: Comparator,
}

#[derive(Clone, Debug)]
pub(crate) enum BoundNode {
    Leaf(BoundLeaf),
    Combine {
        op: CombinationOp,
        left: Box<BoundNode>,
        right: Box<BoundNode>,
    },
}

/// A condition validated against a catalog and ready for evaluation.
///
/// Binding happens once per read; the bound form is immutable and can be
/// evaluated against many tiles concurrently.
#[derive(Clone, Debug)]
pub struct BoundCondition {
    pub(crate) root: BoundNode,
    pub(crate) fields: BTreeMap<Arc<str>, FieldInfo>,
}

impl BoundCondition {
    /// Validates every leaf of `condition` against `catalog`.
    ///
    /// # Errors
    ///
    /// - [`QueryError::InvalidCondition`] if the tree is or contains `Empty`.
    /// - [`QueryError::FieldNotFound`] for unknown fields.
    /// - [`QueryError::TypeMismatch`] for operands that do not fit their field.
    pub fn bind<C>(condition: &Condition, catalog: &C) -> Result<Self, QueryError>
    where
        C: FieldCatalog + ?Sized,
    {
        let mut binder = Binder {
            catalog,
            fields: BTreeMap::new(),
        };
        let root = condition.accept(&mut binder)?;
        log_debug!(
            component = "bind",
            event = "condition_bound",
            leaves = condition.leaf_count(),
            fields = binder.fields.len(),
            condition = %condition,
        );
        Ok(Self {
            root,
            fields: binder.fields,
        })
    }

    /// Names of the fields the condition reads.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|name| &**name)
    }
}

struct Binder<'c, C: ?Sized> {
    catalog: &'c C,
    fields: BTreeMap<Arc<str>, FieldInfo>,
}

impl<C> ConditionVisitor for Binder<'_, C>
where
    C: FieldCatalog + ?Sized,
{
    type Error = QueryError;
    type Value = BoundNode;

    fn visit_empty(&mut self) -> Result<BoundNode, QueryError> {
        Err(QueryError::InvalidCondition(
            "condition is empty or has an empty subtree".into(),
        ))
    }

    fn visit_comparison(&mut self, comparison: &Comparison) -> Result<BoundNode, QueryError> {
        let field = self.catalog.resolve(&comparison.field)?;
        let comparator = select_comparator(field, comparison.op, &comparison.operand)?;
        let layout = match field.fixed_width() {
            Some(width) => CellLayout::Fixed(width),
            None => CellLayout::Var,
        };
        self.fields
            .entry(Arc::clone(&comparison.field))
            .or_insert_with(|| field.clone());
        Ok(BoundNode::Leaf(BoundLeaf {
            field: Arc::clone(&comparison.field),
            layout,
            comparator,
        }))
    }

    fn combine(
        &mut self,
        op: CombinationOp,
        left: BoundNode,
        right: BoundNode,
    ) -> Result<BoundNode, QueryError> {
        Ok(BoundNode::Combine {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }
}

fn select_comparator(
    field: &FieldInfo,
    op: ComparisonOp,
    operand: &Operand,
) -> Result<Comparator, QueryError> {
    let name = field.name();
    let bytes = match operand {
        Operand::Null => {
            // Character fields take NULL even when not nullable; `= NULL`
            // then matches nothing.
            if !field.is_nullable() && !field.datatype().is_string() {
                return Err(QueryError::type_mismatch(
                    name,
                    "NULL operand on a non-nullable field",
                ));
            }
            return match op {
                ComparisonOp::Equal => Ok(Comparator::IsNull),
                ComparisonOp::NotEqual => Ok(Comparator::IsNotNull),
                other => Err(QueryError::type_mismatch(
                    name,
                    format!("NULL operand only supports = and !=, got {other}"),
                )),
            };
        }
        Operand::Value(bytes) => bytes,
    };

    let datatype = field.datatype();
    let Some(kind) = NumericKind::of(datatype) else {
        return Ok(Comparator::Bytes {
            op,
            operand: Arc::clone(bytes),
        });
    };
    let value_size = datatype.value_size();
    match field.fixed_width() {
        Some(width) if bytes.len() != width => Err(QueryError::type_mismatch(
            name,
            format!(
                "operand is {} bytes, {datatype} cells are {width}",
                bytes.len()
            ),
        )),
        None if bytes.len() % value_size != 0 => Err(QueryError::type_mismatch(
            name,
            format!(
                "operand is {} bytes, not a multiple of the {value_size}-byte {datatype} value",
                bytes.len()
            ),
        )),
        _ => Ok(Comparator::Numeric {
            op,
            kind,
            operand: Arc::clone(bytes),
        }),
    }
}

/// Builds a comparison leaf, validating it against `catalog` immediately.
///
/// # Errors
///
/// Returns [`QueryError::FieldNotFound`] when `field` is unknown and
/// [`QueryError::TypeMismatch`] when the operand does not fit the field.
pub fn make_comparison<C, O>(
    catalog: &C,
    field: &str,
    op: ComparisonOp,
    operand: O,
) -> Result<Condition, QueryError>
where
    C: FieldCatalog + ?Sized,
    O: Into<Operand>,
{
    let operand = operand.into();
    let info = catalog.resolve(field)?;
    select_comparator(info, op, &operand)?;
    Ok(Condition::comparison(field, op, operand))
}
