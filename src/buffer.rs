//! Per-tile field buffers.
//!
//! [`FieldBuffer`] is a borrowed, read-only view used by the evaluator;
//! [`ResultBuffer`] owns the same layout and is what the result applier
//! rewrites. Offsets are byte offsets into the value buffer and validity is a
//! byte map (non-zero means valid).

use std::{
    collections::{btree_map, BTreeMap, BTreeSet},
    ops::Range,
    sync::Arc,
};

use crate::{query::QueryError, schema::FieldInfo};

/// Controls the shape of offsets produced by sparse compaction.
///
/// Dense fill keeps each buffer's own convention so its offsets count never
/// changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OffsetsConfig {
    /// Append a trailing offset equal to the data length.
    pub extra_element: bool,
}

impl OffsetsConfig {
    /// Offsets with a trailing element.
    pub const EXTRA_ELEMENT: OffsetsConfig = OffsetsConfig {
        extra_element: true,
    };

    /// Number of offsets emitted for `cell_count` cells.
    #[must_use]
    pub fn offsets_len(&self, cell_count: usize) -> usize {
        cell_count + usize::from(self.extra_element)
    }
}

/// Borrowed view of one field's buffers for a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldBuffer<'a> {
    values: &'a [u8],
    offsets: Option<&'a [u64]>,
    validity: Option<&'a [u8]>,
    cell_count: u64,
}

impl<'a> FieldBuffer<'a> {
    /// View over fixed-size cells.
    #[must_use]
    pub fn fixed(values: &'a [u8], cell_count: u64) -> Self {
        Self {
            values,
            offsets: None,
            validity: None,
            cell_count,
        }
    }

    /// View over variable-sized cells. `offsets` may hold `cell_count` or
    /// `cell_count + 1` entries.
    #[must_use]
    pub fn var(values: &'a [u8], offsets: &'a [u64], cell_count: u64) -> Self {
        Self {
            values,
            offsets: Some(offsets),
            validity: None,
            cell_count,
        }
    }

    /// Attaches a validity byte map.
    #[must_use]
    pub fn with_validity(mut self, validity: &'a [u8]) -> Self {
        self.validity = Some(validity);
        self
    }

    /// Raw value bytes.
    #[must_use]
    pub fn values(&self) -> &'a [u8] {
        self.values
    }

    /// Byte offsets, present for variable-sized fields.
    #[must_use]
    pub fn offsets(&self) -> Option<&'a [u64]> {
        self.offsets
    }

    /// Validity byte map, present for nullable fields.
    #[must_use]
    pub fn validity(&self) -> Option<&'a [u8]> {
        self.validity
    }

    /// Number of cells in the tile.
    #[must_use]
    pub fn cell_count(&self) -> u64 {
        self.cell_count
    }

    pub(crate) fn len(&self) -> usize {
        self.cell_count as usize
    }

    /// Returns false only for cells marked null.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is past the validity map.
    #[must_use]
    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity.map_or(true, |validity| validity[idx] != 0)
    }

    /// Byte span of a variable-sized cell.
    ///
    /// The last cell ends at the value buffer's end unless a trailing offset
    /// is present.
    ///
    /// # Panics
    ///
    /// Panics if the buffer has no offset for `idx`, which includes every
    /// fixed-size buffer. Run [`FieldBuffer::validate`] first.
    #[must_use]
    pub fn var_span(&self, idx: usize) -> Range<usize> {
        let offsets = self.offsets.unwrap_or_default();
        let start = offsets[idx] as usize;
        let end = offsets
            .get(idx + 1)
            .map_or(self.values.len(), |&end| end as usize);
        start..end
    }

    /// Value bytes of a variable-sized cell.
    ///
    /// # Panics
    ///
    /// Panics under the conditions of [`FieldBuffer::var_span`], or when the
    /// span lies outside the value bytes.
    #[must_use]
    pub fn var_cell(&self, idx: usize) -> &'a [u8] {
        &self.values[self.var_span(idx)]
    }

    /// Value bytes of a fixed-size cell of `width` bytes.
    ///
    /// # Panics
    ///
    /// Panics if cell `idx` extends past the value bytes.
    #[must_use]
    pub fn fixed_cell(&self, idx: usize, width: usize) -> &'a [u8] {
        &self.values[idx * width..(idx + 1) * width]
    }

    /// Checks that the buffers match the layout `field` declares.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::MalformedBuffer`] naming the field on any
    /// inconsistency.
    pub fn validate(&self, field: &FieldInfo) -> Result<(), QueryError> {
        let name = field.name();
        let cells = usize::try_from(self.cell_count)
            .map_err(|_| QueryError::malformed(name, "cell count exceeds address space"))?;

        match (field.fixed_width(), self.offsets) {
            (Some(width), None) => {
                let expected = cells.checked_mul(width).ok_or_else(|| {
                    QueryError::malformed(name, "cell count exceeds address space")
                })?;
                if self.values.len() != expected {
                    return Err(QueryError::malformed(
                        name,
                        format!(
                            "{} value bytes for {cells} cells of width {width}",
                            self.values.len()
                        ),
                    ));
                }
            }
            (Some(_), Some(_)) => {
                return Err(QueryError::malformed(name, "offsets given for a fixed-size field"));
            }
            (None, None) => {
                return Err(QueryError::malformed(
                    name,
                    "variable-sized field requires offsets",
                ));
            }
            (None, Some(offsets)) => validate_offsets(name, offsets, cells, self.values.len())?,
        }

        match (field.is_nullable(), self.validity) {
            (true, Some(validity)) if validity.len() != cells => Err(QueryError::malformed(
                name,
                format!("{} validity entries for {cells} cells", validity.len()),
            )),
            (true, None) => Err(QueryError::malformed(name, "nullable field requires validity")),
            (false, Some(_)) => Err(QueryError::malformed(
                name,
                "validity given for a non-nullable field",
            )),
            _ => Ok(()),
        }
    }
}

fn validate_offsets(
    name: &str,
    offsets: &[u64],
    cells: usize,
    data_len: usize,
) -> Result<(), QueryError> {
    if offsets.len() != cells && offsets.len() != cells + 1 {
        return Err(QueryError::malformed(
            name,
            format!("{} offsets for {cells} cells", offsets.len()),
        ));
    }
    if offsets.windows(2).any(|pair| pair[0] > pair[1]) {
        return Err(QueryError::malformed(name, "offsets are not monotonic"));
    }
    if let Some(&last) = offsets.last() {
        if last > data_len as u64 {
            return Err(QueryError::malformed(
                name,
                format!("offset {last} past {data_len} value bytes"),
            ));
        }
        if offsets.len() == cells + 1 && last != data_len as u64 {
            return Err(QueryError::malformed(
                name,
                format!("trailing offset {last} does not match {data_len} value bytes"),
            ));
        }
    }
    Ok(())
}

/// Borrowed buffers for every field an evaluation reads.
#[derive(Clone, Debug, Default)]
pub struct FieldBufferSet<'a> {
    buffers: BTreeMap<Arc<str>, FieldBuffer<'a>>,
}

impl<'a> FieldBufferSet<'a> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the buffer for `name`.
    pub fn insert(&mut self, name: impl Into<Arc<str>>, buffer: FieldBuffer<'a>) {
        self.buffers.insert(name.into(), buffer);
    }

    /// Builder form of [`FieldBufferSet::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<Arc<str>>, buffer: FieldBuffer<'a>) -> Self {
        self.insert(name, buffer);
        self
    }

    /// Looks up the buffer for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::MissingBuffer`] when no buffer was supplied.
    pub fn get(&self, name: &str) -> Result<&FieldBuffer<'a>, QueryError> {
        self.buffers
            .get(name)
            .ok_or_else(|| QueryError::MissingBuffer(name.to_string()))
    }

    /// Returns true when a buffer was supplied for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.buffers.contains_key(name)
    }

    /// Number of buffers in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns true when the set holds no buffer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// Owned buffers of one field in a read result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultBuffer {
    data: Vec<u8>,
    offsets: Option<Vec<u64>>,
    validity: Option<Vec<u8>>,
    cell_count: u64,
}

impl ResultBuffer {
    /// Fixed-size cells.
    #[must_use]
    pub fn fixed(data: Vec<u8>, cell_count: u64) -> Self {
        Self {
            data,
            offsets: None,
            validity: None,
            cell_count,
        }
    }

    /// Variable-sized cells addressed by byte offsets.
    #[must_use]
    pub fn var(data: Vec<u8>, offsets: Vec<u64>, cell_count: u64) -> Self {
        Self {
            data,
            offsets: Some(offsets),
            validity: None,
            cell_count,
        }
    }

    /// Packs variable-sized cells into a data arena and offsets.
    #[must_use]
    pub fn from_var_cells<I, C>(cells: I, config: &OffsetsConfig) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        let mut data = Vec::new();
        let mut offsets = Vec::new();
        for cell in cells {
            offsets.push(data.len() as u64);
            data.extend_from_slice(cell.as_ref());
        }
        let cell_count = offsets.len() as u64;
        if config.extra_element {
            offsets.push(data.len() as u64);
        }
        Self::var(data, offsets, cell_count)
    }

    /// Attaches a validity byte map.
    #[must_use]
    pub fn with_validity(mut self, validity: Vec<u8>) -> Self {
        self.validity = Some(validity);
        self
    }

    /// Value bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Byte offsets for variable-sized fields.
    #[must_use]
    pub fn offsets(&self) -> Option<&[u64]> {
        self.offsets.as_deref()
    }

    /// Validity byte map for nullable fields.
    #[must_use]
    pub fn validity(&self) -> Option<&[u8]> {
        self.validity.as_deref()
    }

    /// Number of cells.
    #[must_use]
    pub fn cell_count(&self) -> u64 {
        self.cell_count
    }

    /// Borrows the buffer as an evaluator view.
    #[must_use]
    pub fn as_field_buffer(&self) -> FieldBuffer<'_> {
        FieldBuffer {
            values: &self.data,
            offsets: self.offsets.as_deref(),
            validity: self.validity.as_deref(),
            cell_count: self.cell_count,
        }
    }

    /// Returns true when the offsets carry a trailing element.
    pub(crate) fn has_trailing_offset(&self) -> bool {
        self.offsets
            .as_ref()
            .is_some_and(|offsets| offsets.len() as u64 == self.cell_count + 1)
    }

    /// Adds or drops the trailing offset of a validated variable-sized
    /// buffer so it follows `config`.
    pub(crate) fn conform_offsets(mut self, config: &OffsetsConfig) -> Self {
        let trailing = self.has_trailing_offset();
        if let Some(offsets) = self.offsets.as_mut() {
            match (trailing, config.extra_element) {
                (false, true) => offsets.push(self.data.len() as u64),
                (true, false) => {
                    offsets.pop();
                }
                _ => {}
            }
        }
        self
    }

    pub(crate) fn into_parts(self) -> (Vec<u8>, Option<Vec<u64>>, Option<Vec<u8>>) {
        (self.data, self.offsets, self.validity)
    }

    pub(crate) fn from_parts(
        data: Vec<u8>,
        offsets: Option<Vec<u64>>,
        validity: Option<Vec<u8>>,
        cell_count: u64,
    ) -> Self {
        Self {
            data,
            offsets,
            validity,
            cell_count,
        }
    }
}

/// Owned result buffers of one tile, keyed by field name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultBuffers {
    buffers: BTreeMap<String, ResultBuffer>,
}

impl ResultBuffers {
    /// Creates an empty buffer set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the buffer for `name`.
    pub fn insert(&mut self, name: impl Into<String>, buffer: ResultBuffer) {
        self.buffers.insert(name.into(), buffer);
    }

    /// Builder form of [`ResultBuffers::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, buffer: ResultBuffer) -> Self {
        self.insert(name, buffer);
        self
    }

    /// Buffer of `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResultBuffer> {
        self.buffers.get(name)
    }

    /// Buffers in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResultBuffer)> {
        self.buffers
            .iter()
            .map(|(name, buffer)| (name.as_str(), buffer))
    }

    /// Field names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.buffers.keys().map(String::as_str)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns true when no field is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Cells per field, as reported to the caller after a read.
    #[must_use]
    pub fn result_buffer_elements(&self) -> BTreeMap<&str, u64> {
        self.buffers
            .iter()
            .map(|(name, buffer)| (name.as_str(), buffer.cell_count))
            .collect()
    }

    /// Borrows every buffer as an evaluator view.
    #[must_use]
    pub fn field_buffer_set(&self) -> FieldBufferSet<'_> {
        let mut set = FieldBufferSet::new();
        for (name, buffer) in &self.buffers {
            set.insert(name.as_str(), buffer.as_field_buffer());
        }
        set
    }

    /// Drops every field not named in `keep`.
    pub fn retain_fields(&mut self, keep: &BTreeSet<Arc<str>>) {
        self.buffers.retain(|name, _| keep.contains(name.as_str()));
    }
}

impl IntoIterator for ResultBuffers {
    type Item = (String, ResultBuffer);
    type IntoIter = btree_map::IntoIter<String, ResultBuffer>;

    fn into_iter(self) -> Self::IntoIter {
        self.buffers.into_iter()
    }
}

impl FromIterator<(String, ResultBuffer)> for ResultBuffers {
    fn from_iter<T: IntoIterator<Item = (String, ResultBuffer)>>(iter: T) -> Self {
        Self {
            buffers: iter.into_iter().collect(),
        }
    }
}
