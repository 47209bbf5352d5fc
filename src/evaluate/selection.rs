use std::ops::{BitAnd, BitOr, Not};

use arrow::buffer::BooleanBuffer;

/// One boolean per cell of a tile, aligned with the tile's cell order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionVector {
    bits: BooleanBuffer,
}

impl SelectionVector {
    /// Selects every cell.
    #[must_use]
    pub fn all(len: usize) -> Self {
        Self {
            bits: BooleanBuffer::new_set(len),
        }
    }

    /// Selects no cell.
    #[must_use]
    pub fn none(len: usize) -> Self {
        Self {
            bits: BooleanBuffer::new_unset(len),
        }
    }

    /// Builds a selection by evaluating `f` for every cell index.
    pub fn from_fn<F>(len: usize, f: F) -> Self
    where
        F: FnMut(usize) -> bool,
    {
        Self {
            bits: BooleanBuffer::collect_bool(len, f),
        }
    }

    /// Number of cells covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns true when the selection covers no cell.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of selected cells.
    #[must_use]
    pub fn count_selected(&self) -> usize {
        self.bits.count_set_bits()
    }

    /// Returns true when every cell is selected.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.count_selected() == self.len()
    }

    /// Returns whether cell `idx` is selected.
    #[must_use]
    pub fn is_selected(&self, idx: usize) -> bool {
        self.bits.value(idx)
    }

    /// Indices of selected cells in ascending order.
    pub fn selected_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.set_indices()
    }

    /// Iterates the per-cell outcomes.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.bits.iter()
    }

    /// Collects the outcomes into a `Vec<bool>`.
    #[must_use]
    pub fn to_vec(&self) -> Vec<bool> {
        self.iter().collect()
    }
}

impl From<BooleanBuffer> for SelectionVector {
    fn from(bits: BooleanBuffer) -> Self {
        Self { bits }
    }
}

impl From<Vec<bool>> for SelectionVector {
    fn from(values: Vec<bool>) -> Self {
        Self {
            bits: BooleanBuffer::from(values),
        }
    }
}

impl From<&[bool]> for SelectionVector {
    fn from(values: &[bool]) -> Self {
        Self {
            bits: BooleanBuffer::from(values),
        }
    }
}

impl BitAnd for &SelectionVector {
    type Output = SelectionVector;

    fn bitand(self, rhs: &SelectionVector) -> SelectionVector {
        SelectionVector {
            bits: &self.bits & &rhs.bits,
        }
    }
}

impl BitOr for &SelectionVector {
    type Output = SelectionVector;

    fn bitor(self, rhs: &SelectionVector) -> SelectionVector {
        SelectionVector {
            bits: &self.bits | &rhs.bits,
        }
    }
}

impl Not for &SelectionVector {
    type Output = SelectionVector;

    fn not(self) -> SelectionVector {
        SelectionVector { bits: !&self.bits }
    }
}
