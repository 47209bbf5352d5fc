//! Applies a selection to a tile's result buffers.
//!
//! Dense reads keep every cell and overwrite unselected attribute cells with
//! the attribute's fill value. Sparse reads drop unselected cells and compact
//! the rest, preserving their order.
//!
//! Dense output keeps every buffer's offsets count, trailing element
//! included. Sparse output always follows the [`OffsetsConfig`], whether or
//! not any cell was dropped.

mod dense;
mod sparse;

use crate::{
    buffer::{OffsetsConfig, ResultBuffers},
    evaluate::SelectionVector,
    observability::log_trace,
    query::QueryError,
    schema::{ArrayType, FieldCatalog},
};

/// How unselected cells are materialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReadMode {
    /// Keep the buffer shape; replace unselected attribute cells with fill
    /// values.
    DenseFill,
    /// Remove unselected cells and compact the remaining ones.
    SparseCompact,
}

impl From<ArrayType> for ReadMode {
    fn from(array_type: ArrayType) -> Self {
        match array_type {
            ArrayType::Dense => ReadMode::DenseFill,
            ArrayType::Sparse => ReadMode::SparseCompact,
        }
    }
}

/// Rewrites `buffers` according to `selection` and `mode`.
///
/// Every buffer is checked against its field and against the selection
/// length before any of them is rewritten.
///
/// # Errors
///
/// - [`QueryError::FieldNotFound`] for a buffer whose field is unknown.
/// - [`QueryError::MalformedBuffer`] when a buffer does not match its
///   field's layout or the selection length.
/// - [`QueryError::Schema`] when a fill value does not fit its field.
pub fn apply<C>(
    selection: &SelectionVector,
    mode: ReadMode,
    catalog: &C,
    buffers: ResultBuffers,
    offsets: &OffsetsConfig,
) -> Result<ResultBuffers, QueryError>
where
    C: FieldCatalog + ?Sized,
{
    for (name, buffer) in buffers.iter() {
        let field = catalog.resolve(name)?;
        buffer.as_field_buffer().validate(field)?;
        if buffer.cell_count() != selection.len() as u64 {
            return Err(QueryError::malformed(
                name,
                format!(
                    "{} cells for a selection of {}",
                    buffer.cell_count(),
                    selection.len()
                ),
            ));
        }
    }

    if selection.is_all() {
        log_trace!(
            component = "apply",
            event = "selection_passthrough",
            cells = selection.len(),
        );
        return Ok(match mode {
            ReadMode::DenseFill => buffers,
            ReadMode::SparseCompact => buffers
                .into_iter()
                .map(|(name, buffer)| (name, buffer.conform_offsets(offsets)))
                .collect(),
        });
    }

    let mut out = ResultBuffers::new();
    for (name, buffer) in buffers {
        let field = catalog.resolve(&name)?;
        let rewritten = match mode {
            ReadMode::DenseFill => dense::fill(selection, field, buffer)?,
            ReadMode::SparseCompact => sparse::compact(selection, field, &buffer, offsets),
        };
        out.insert(name, rewritten);
    }
    log_trace!(
        component = "apply",
        event = "selection_applied",
        mode = ?mode,
        cells = selection.len(),
        selected = selection.count_selected(),
        fields = out.len(),
    );
    Ok(out)
}
