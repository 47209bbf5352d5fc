//! Per-leaf comparison kernels.
//!
//! A [`Comparator`] is chosen once when a leaf is bound, from the field's
//! datatype and layout. Evaluation then dispatches on it once per tile and
//! runs a monomorphized loop over the cells.

use std::{cmp::Ordering, sync::Arc};

use cellfilter_predicate::ComparisonOp;

use super::SelectionVector;
use crate::{buffer::FieldBuffer, schema::Datatype};

/// Numeric interpretation of a field's values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NumericKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl NumericKind {
    /// `None` for datatypes compared byte-wise.
    pub(crate) fn of(datatype: Datatype) -> Option<Self> {
        Some(match datatype {
            Datatype::Int8 => NumericKind::I8,
            Datatype::UInt8 | Datatype::Bool => NumericKind::U8,
            Datatype::Int16 => NumericKind::I16,
            Datatype::UInt16 => NumericKind::U16,
            Datatype::Int32 => NumericKind::I32,
            Datatype::UInt32 => NumericKind::U32,
            Datatype::Int64 | Datatype::Datetime(_) => NumericKind::I64,
            Datatype::UInt64 => NumericKind::U64,
            Datatype::Float32 => NumericKind::F32,
            Datatype::Float64 => NumericKind::F64,
            Datatype::Char | Datatype::StringAscii | Datatype::StringUtf8 | Datatype::Blob => {
                return None
            }
        })
    }
}

/// Cell layout of the compared field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CellLayout {
    /// Every cell spans this many bytes.
    Fixed(usize),
    /// Cells are addressed by offsets.
    Var,
}

/// Kernel of a bound leaf. Null cells never satisfy `Bytes` or `Numeric`,
/// whatever the operator.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Comparator {
    /// `field = NULL`
    IsNull,
    /// `field != NULL`
    IsNotNull,
    /// Unsigned lexicographic byte order.
    Bytes { op: ComparisonOp, operand: Arc<[u8]> },
    /// Element-wise numeric order.
    Numeric {
        op: ComparisonOp,
        kind: NumericKind,
        operand: Arc<[u8]>,
    },
}

impl Comparator {
    /// Evaluates the comparison for every cell selected by `mask`; cells
    /// outside the mask come out unselected.
    pub(crate) fn evaluate(
        &self,
        buffer: &FieldBuffer<'_>,
        layout: CellLayout,
        mask: &SelectionVector,
    ) -> SelectionVector {
        match self {
            Comparator::IsNull => {
                SelectionVector::from_fn(mask.len(), |i| mask.is_selected(i) && !buffer.is_valid(i))
            }
            Comparator::IsNotNull => {
                SelectionVector::from_fn(mask.len(), |i| mask.is_selected(i) && buffer.is_valid(i))
            }
            Comparator::Bytes { op, operand } => {
                let (op, operand) = (*op, &**operand);
                scan(buffer, layout, mask, |cell| op.test_ordering(cell.cmp(operand)))
            }
            Comparator::Numeric { op, kind, operand } => {
                let (op, operand) = (*op, &**operand);
                match kind {
                    NumericKind::I8 => scan_numeric::<i8>(op, operand, buffer, layout, mask),
                    NumericKind::U8 => scan_numeric::<u8>(op, operand, buffer, layout, mask),
                    NumericKind::I16 => scan_numeric::<i16>(op, operand, buffer, layout, mask),
                    NumericKind::U16 => scan_numeric::<u16>(op, operand, buffer, layout, mask),
                    NumericKind::I32 => scan_numeric::<i32>(op, operand, buffer, layout, mask),
                    NumericKind::U32 => scan_numeric::<u32>(op, operand, buffer, layout, mask),
                    NumericKind::I64 => scan_numeric::<i64>(op, operand, buffer, layout, mask),
                    NumericKind::U64 => scan_numeric::<u64>(op, operand, buffer, layout, mask),
                    NumericKind::F32 => scan_numeric::<f32>(op, operand, buffer, layout, mask),
                    NumericKind::F64 => scan_numeric::<f64>(op, operand, buffer, layout, mask),
                }
            }
        }
    }
}

/// Fixed-width little-endian value.
trait Native: Copy + PartialOrd {
    const SIZE: usize;

    /// `bytes` is exactly `SIZE` long.
    fn read(bytes: &[u8]) -> Self;
}

macro_rules! impl_native {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Native for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn read(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_native!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

fn scan<F>(
    buffer: &FieldBuffer<'_>,
    layout: CellLayout,
    mask: &SelectionVector,
    test: F,
) -> SelectionVector
where
    F: Fn(&[u8]) -> bool,
{
    let len = mask.len();
    match layout {
        CellLayout::Fixed(width) => SelectionVector::from_fn(len, |i| {
            mask.is_selected(i) && buffer.is_valid(i) && test(buffer.fixed_cell(i, width))
        }),
        CellLayout::Var => SelectionVector::from_fn(len, |i| {
            mask.is_selected(i) && buffer.is_valid(i) && test(buffer.var_cell(i))
        }),
    }
}

fn scan_numeric<T: Native>(
    op: ComparisonOp,
    operand: &[u8],
    buffer: &FieldBuffer<'_>,
    layout: CellLayout,
    mask: &SelectionVector,
) -> SelectionVector {
    match layout {
        CellLayout::Fixed(width) if width == T::SIZE => {
            let rhs = T::read(operand);
            scan(buffer, layout, mask, |cell| {
                op.test_partial(T::read(cell).partial_cmp(&rhs))
            })
        }
        _ => {
            let rhs: Vec<T> = operand.chunks_exact(T::SIZE).map(T::read).collect();
            scan(buffer, layout, mask, |cell| {
                op.test_partial(compare_seq(cell, &rhs))
            })
        }
    }
}

/// Lexicographic order of a cell's values against `rhs`; a proper prefix
/// orders first.
fn compare_seq<T: Native>(cell: &[u8], rhs: &[T]) -> Option<Ordering> {
    cell.chunks_exact(T::SIZE)
        .map(T::read)
        .partial_cmp(rhs.iter().copied())
}
