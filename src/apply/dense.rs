use crate::{
    buffer::ResultBuffer,
    evaluate::SelectionVector,
    query::QueryError,
    schema::{FieldInfo, FieldKind},
};

/// Replaces unselected attribute cells with the field's fill value.
///
/// Coordinates are never filled. Fixed-size cells are overwritten in place;
/// variable-sized attributes are rebuilt into a new data arena and offsets
/// because the fill may differ in length from the value it replaces. The
/// rebuilt offsets keep the input's trailing element, if it had one.
pub(super) fn fill(
    selection: &SelectionVector,
    field: &FieldInfo,
    buffer: ResultBuffer,
) -> Result<ResultBuffer, QueryError> {
    if field.kind() == FieldKind::Dimension {
        return Ok(buffer);
    }

    let fill = field.fill();
    let cell_count = buffer.cell_count();
    let rejected = !selection;

    let (data, cell_offsets, validity) = match field.fixed_width() {
        Some(width) => {
            if fill.bytes.len() != width {
                return Err(QueryError::Schema(format!(
                    "fill value of {} bytes does not fit {width}-byte cells of '{}'",
                    fill.bytes.len(),
                    field.name()
                )));
            }
            let (mut data, cell_offsets, validity) = buffer.into_parts();
            for idx in rejected.selected_indices() {
                data[idx * width..(idx + 1) * width].copy_from_slice(&fill.bytes);
            }
            (data, cell_offsets, validity)
        }
        None => {
            let trailing = buffer.has_trailing_offset();
            let view = buffer.as_field_buffer();
            let filled = rejected.count_selected();
            let mut data = Vec::with_capacity(view.values().len() + filled * fill.bytes.len());
            let mut cell_offsets = Vec::with_capacity(view.len() + usize::from(trailing));
            for idx in 0..view.len() {
                cell_offsets.push(data.len() as u64);
                if selection.is_selected(idx) {
                    data.extend_from_slice(view.var_cell(idx));
                } else {
                    data.extend_from_slice(&fill.bytes);
                }
            }
            if trailing {
                cell_offsets.push(data.len() as u64);
            }
            let validity = view.validity().map(<[u8]>::to_vec);
            (data, Some(cell_offsets), validity)
        }
    };

    let validity = validity.map(|mut validity| {
        let fill_valid = u8::from(fill.valid);
        for idx in rejected.selected_indices() {
            validity[idx] = fill_valid;
        }
        validity
    });

    Ok(ResultBuffer::from_parts(data, cell_offsets, validity, cell_count))
}

#[cfg(test)]
mod tests {
    use super::fill;
    use crate::{
        buffer::{OffsetsConfig, ResultBuffer},
        evaluate::SelectionVector,
        schema::{Datatype, FieldInfo},
    };

    #[test]
    fn fixed_cells_are_overwritten_in_place() {
        let field = FieldInfo::attribute("a", Datatype::Int16)
            .nullable(true)
            .with_fill(7i16.to_le_bytes())
            .with_fill_validity(true);
        let data: Vec<u8> = [1i16, 2, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
        let buffer = ResultBuffer::fixed(data, 3).with_validity(vec![0, 1, 1]);
        let selection = SelectionVector::from(vec![false, true, false]);

        let out = fill(&selection, &field, buffer).expect("fill");
        let expected: Vec<u8> = [7i16, 2, 7].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(out.data(), &expected[..]);
        assert_eq!(out.validity(), Some(&[1, 1, 1][..]));
        assert_eq!(out.cell_count(), 3);
    }

    #[test]
    fn var_cells_are_rebuilt_with_shifted_offsets() {
        let field = FieldInfo::attribute("s", Datatype::StringAscii)
            .var_sized()
            .with_fill("--");
        let selection = SelectionVector::from(vec![true, false, true]);

        let buffer =
            ResultBuffer::from_var_cells(["bird", "bunny", "cat"], &OffsetsConfig::default());
        let out = fill(&selection, &field, buffer).expect("fill");
        assert_eq!(out.data(), b"bird--cat");
        assert_eq!(out.offsets(), Some(&[0, 4, 6][..]));
        assert_eq!(out.cell_count(), 3);

        let buffer =
            ResultBuffer::from_var_cells(["bird", "bunny", "cat"], &OffsetsConfig::EXTRA_ELEMENT);
        let out = fill(&selection, &field, buffer).expect("fill");
        assert_eq!(out.data(), b"bird--cat");
        assert_eq!(out.offsets(), Some(&[0, 4, 6, 9][..]));
    }

    #[test]
    fn dimensions_pass_through() {
        let field = FieldInfo::dimension("d", Datatype::UInt8);
        let buffer = ResultBuffer::fixed(vec![1, 2], 2);
        let out = fill(&SelectionVector::none(2), &field, buffer.clone()).expect("fill");
        assert_eq!(out, buffer);
    }
}
