#![deny(missing_docs)]
//! Query-condition evaluation for dense and sparse multi-dimensional arrays.
//!
//! A read produces tiles of cells; each field of a tile arrives as raw value
//! bytes plus optional offsets (variable-sized fields) and validity
//! (nullable fields). This crate filters those tiles:
//!
//! 1. build a [`Condition`](query::Condition) from field comparisons joined
//!    by `AND`/`OR`,
//! 2. bind it against the array's [`FieldCatalog`](schema::FieldCatalog),
//! 3. evaluate it per tile into a [`SelectionVector`](evaluate::SelectionVector),
//! 4. apply the selection: dense reads fill unselected cells, sparse reads
//!    drop them.
//!
//! [`ReadQuery`](read::ReadQuery) runs the whole pipeline for a read.

/// Logging macros and conventions.
mod observability;

/// Result application for dense and sparse reads.
pub mod apply;

/// Borrowed and owned per-tile field buffers.
pub mod buffer;

/// Condition evaluation into per-cell selections.
pub mod evaluate;

/// Condition model, binding and errors.
pub mod query;

/// Read submission boundary.
pub mod read;

/// Field catalog and array schema.
pub mod schema;

pub use crate::{
    apply::{apply, ReadMode},
    buffer::{FieldBuffer, FieldBufferSet, OffsetsConfig, ResultBuffer, ResultBuffers},
    evaluate::{evaluate, SelectionVector},
    query::{
        make_comparison, BoundCondition, CombinationOp, ComparisonOp, Condition,
        ConditionBuilder, ErrorKind, Operand, QueryError,
    },
    read::{QueryStatus, ReadOptions, ReadQuery},
    schema::{ArraySchema, ArrayType, Datatype, FieldCatalog, FieldInfo},
};
