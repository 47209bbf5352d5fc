use crate::{
    buffer::{OffsetsConfig, ResultBuffer},
    evaluate::SelectionVector,
    schema::FieldInfo,
};

/// Keeps only selected cells, in read order.
pub(super) fn compact(
    selection: &SelectionVector,
    field: &FieldInfo,
    buffer: &ResultBuffer,
    offsets: &OffsetsConfig,
) -> ResultBuffer {
    let view = buffer.as_field_buffer();
    let kept = selection.count_selected();

    let (data, cell_offsets) = match field.fixed_width() {
        Some(width) => {
            let mut data = Vec::with_capacity(kept * width);
            for idx in selection.selected_indices() {
                data.extend_from_slice(view.fixed_cell(idx, width));
            }
            (data, None)
        }
        None => {
            let mut data = Vec::new();
            let mut cell_offsets = Vec::with_capacity(offsets.offsets_len(kept));
            for idx in selection.selected_indices() {
                cell_offsets.push(data.len() as u64);
                data.extend_from_slice(view.var_cell(idx));
            }
            if offsets.extra_element {
                cell_offsets.push(data.len() as u64);
            }
            (data, Some(cell_offsets))
        }
    };

    let validity = view
        .validity()
        .map(|validity| selection.selected_indices().map(|idx| validity[idx]).collect());

    ResultBuffer::from_parts(data, cell_offsets, validity, kept as u64)
}
