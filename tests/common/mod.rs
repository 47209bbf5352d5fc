//! Common test utilities for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use cellfilter::{
    ArraySchema, ArrayType, Datatype, FieldInfo, OffsetsConfig, ResultBuffer, ResultBuffers,
};

/// Little-endian encoding of `i32` values.
pub fn le_i32(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Little-endian encoding of `f64` values.
pub fn le_f64(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decodes little-endian `i32` values.
pub fn i32s(bytes: &[u8]) -> Vec<i32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Splits a variable-sized result buffer back into its cells.
pub fn var_cells(buffer: &ResultBuffer) -> Vec<Vec<u8>> {
    let view = buffer.as_field_buffer();
    (0..buffer.cell_count() as usize)
        .map(|idx| view.var_cell(idx).to_vec())
        .collect()
}

/// 2-D array over `rows, cols` (`Int32`) with an `Int32` attribute `a`
/// (fill `-1`) and a nullable variable-sized ASCII attribute `s`.
pub fn grid_schema(array_type: ArrayType) -> Arc<ArraySchema> {
    Arc::new(
        ArraySchema::builder(array_type)
            .dimension("rows", Datatype::Int32)
            .dimension("cols", Datatype::Int32)
            .field(FieldInfo::attribute("a", Datatype::Int32).with_fill((-1i32).to_le_bytes()))
            .field(
                FieldInfo::attribute("s", Datatype::StringAscii)
                    .var_sized()
                    .nullable(true)
                    .with_fill("none")
                    .with_fill_validity(true),
            )
            .dimension_label("row_label", "rows")
            .build()
            .expect("grid schema should build"),
    )
}

/// Row-major dense tile over `[1, side] x [1, side]`. Attribute `a` holds the
/// cell's position in the tile and `s` holds `"r{row}c{col}"`.
pub fn grid_tile(side: i32) -> ResultBuffers {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut names = Vec::new();
    for row in 1..=side {
        for col in 1..=side {
            rows.push(row);
            cols.push(col);
            names.push(format!("r{row}c{col}"));
        }
    }
    let count = rows.len() as u64;
    let attrs: Vec<i32> = (0..count as i32).collect();
    ResultBuffers::new()
        .with("rows", ResultBuffer::fixed(le_i32(&rows), count))
        .with("cols", ResultBuffer::fixed(le_i32(&cols), count))
        .with("a", ResultBuffer::fixed(le_i32(&attrs), count))
        .with(
            "s",
            ResultBuffer::from_var_cells(&names, &OffsetsConfig::default())
                .with_validity(vec![1; count as usize]),
        )
}

/// Sparse tile holding exactly the given coordinates and attribute values.
pub fn sparse_tile(coords: &[(i32, i32)], attrs: &[i32], names: &[&str]) -> ResultBuffers {
    let count = coords.len() as u64;
    let rows: Vec<i32> = coords.iter().map(|(row, _)| *row).collect();
    let cols: Vec<i32> = coords.iter().map(|(_, col)| *col).collect();
    ResultBuffers::new()
        .with("rows", ResultBuffer::fixed(le_i32(&rows), count))
        .with("cols", ResultBuffer::fixed(le_i32(&cols), count))
        .with("a", ResultBuffer::fixed(le_i32(attrs), count))
        .with(
            "s",
            ResultBuffer::from_var_cells(names, &OffsetsConfig::default())
                .with_validity(vec![1; count as usize]),
        )
}
