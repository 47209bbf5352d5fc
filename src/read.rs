//! Read submission: ties a condition to an array schema and runs it over
//! the tiles a read produced.

use std::{collections::BTreeSet, sync::Arc};

use crate::{
    apply::{apply, ReadMode},
    buffer::{OffsetsConfig, ResultBuffers},
    observability::log_debug,
    query::{is_compatible_with_dimension_labels, BoundCondition, Condition, QueryError},
    schema::{ArraySchema, FieldCatalog},
};

/// Tuning knobs of a read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadOptions {
    pub(crate) offsets: OffsetsConfig,
    pub(crate) parallel_tile_threshold: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            offsets: OffsetsConfig::default(),
            parallel_tile_threshold: 4,
        }
    }
}

impl ReadOptions {
    /// Emit a trailing offset equal to the data length for variable-sized
    /// fields of sparse reads. Dense reads keep the offsets they were given.
    pub fn offsets_extra_element(self, extra_element: bool) -> Self {
        ReadOptions {
            offsets: OffsetsConfig { extra_element },
            ..self
        }
    }

    /// Minimum number of tiles before they are processed on the rayon pool.
    /// Has no effect without the `parallel` feature.
    pub fn parallel_tile_threshold(self, parallel_tile_threshold: usize) -> Self {
        ReadOptions {
            parallel_tile_threshold,
            ..self
        }
    }

    /// Offsets convention for sparse results.
    pub fn offsets(&self) -> &OffsetsConfig {
        &self.offsets
    }
}

/// Lifecycle of a [`ReadQuery`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryStatus {
    /// Still being configured.
    Uninitialized,
    /// Submitted and finished successfully.
    Completed,
    /// Submitted and failed.
    Failed,
}

/// A read over one array, optionally filtered by a condition.
#[derive(Debug)]
pub struct ReadQuery {
    schema: Arc<ArraySchema>,
    options: ReadOptions,
    condition: Condition,
    labels: Vec<Arc<str>>,
    output_fields: Option<BTreeSet<Arc<str>>>,
    status: QueryStatus,
}

impl ReadQuery {
    /// Starts a read over an array with `schema`.
    pub fn new(schema: Arc<ArraySchema>) -> Self {
        ReadQuery {
            schema,
            options: ReadOptions::default(),
            condition: Condition::Empty,
            labels: Vec::new(),
            output_fields: None,
            status: QueryStatus::Uninitialized,
        }
    }

    /// Replaces the read options.
    pub fn with_options(self, options: ReadOptions) -> Self {
        ReadQuery { options, ..self }
    }

    /// Sets the condition filtering this read.
    ///
    /// # Errors
    ///
    /// [`QueryError::InvalidCondition`] for an empty condition and
    /// [`QueryError::InvalidState`] once the query was submitted.
    pub fn set_condition(&mut self, condition: &Condition) -> Result<(), QueryError> {
        self.ensure_unsubmitted()?;
        if condition.is_empty() {
            return Err(QueryError::InvalidCondition(
                "cannot set an empty condition on a read".into(),
            ));
        }
        self.condition = condition.clone();
        Ok(())
    }

    /// Requests ordered results for a dimension label.
    ///
    /// # Errors
    ///
    /// [`QueryError::FieldNotFound`] for an unknown label and
    /// [`QueryError::InvalidState`] once the query was submitted.
    pub fn add_dimension_label(&mut self, name: &str) -> Result<(), QueryError> {
        self.ensure_unsubmitted()?;
        let label = self
            .schema
            .dimension_label(name)
            .ok_or_else(|| QueryError::FieldNotFound(name.to_string()))?;
        self.labels.push(Arc::from(label.name()));
        Ok(())
    }

    /// Restricts the returned buffers to `names`. Fields read only for
    /// filtering are dropped from the result.
    ///
    /// # Errors
    ///
    /// [`QueryError::FieldNotFound`] for an unknown field and
    /// [`QueryError::InvalidState`] once the query was submitted.
    pub fn set_output_fields<I, S>(&mut self, names: I) -> Result<(), QueryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_unsubmitted()?;
        let mut fields = BTreeSet::new();
        for name in names {
            let field = self.schema.resolve(name.as_ref())?;
            fields.insert(Arc::from(field.name()));
        }
        self.output_fields = Some(fields);
        Ok(())
    }

    /// Current condition; [`Condition::Empty`] when none was set.
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Current lifecycle state.
    pub fn status(&self) -> QueryStatus {
        self.status
    }

    /// Result mode implied by the array type.
    pub fn mode(&self) -> ReadMode {
        ReadMode::from(self.schema.array_type())
    }

    /// Fields each submitted tile must carry: the output fields plus every
    /// field the condition reads. `None` when no output restriction was set.
    pub fn required_fields(&self) -> Option<BTreeSet<Arc<str>>> {
        let mut fields = self.output_fields.clone()?;
        fields.extend(self.condition.field_names());
        Some(fields)
    }

    /// Checks the query's feature combination.
    ///
    /// # Errors
    ///
    /// [`QueryError::IncompatibleFeature`] when a condition is combined with
    /// dimension-label results.
    pub fn check(&self) -> Result<(), QueryError> {
        if !self.labels.is_empty() && !is_compatible_with_dimension_labels(&self.condition) {
            return Err(QueryError::IncompatibleFeature(
                "cannot use query conditions and dimension labels together".into(),
            ));
        }
        Ok(())
    }

    /// Filters `tiles` and returns them in the same order.
    ///
    /// The condition is bound once and shared by every tile. With the
    /// `parallel` feature, tiles are processed on the rayon pool when there
    /// are at least [`ReadOptions::parallel_tile_threshold`] of them.
    ///
    /// # Errors
    ///
    /// Any error of [`ReadQuery::check`], of binding, evaluation, or
    /// result application. The first failing tile fails the whole read.
    pub fn submit(&mut self, tiles: Vec<ResultBuffers>) -> Result<Vec<ResultBuffers>, QueryError> {
        self.ensure_unsubmitted()?;
        let outcome = self.run(tiles);
        self.status = match &outcome {
            Ok(_) => QueryStatus::Completed,
            Err(_) => QueryStatus::Failed,
        };
        outcome
    }

    fn ensure_unsubmitted(&self) -> Result<(), QueryError> {
        match self.status {
            QueryStatus::Uninitialized => Ok(()),
            QueryStatus::Completed | QueryStatus::Failed => Err(QueryError::InvalidState(
                "query cannot be modified or resubmitted after submission",
            )),
        }
    }

    fn run(&self, tiles: Vec<ResultBuffers>) -> Result<Vec<ResultBuffers>, QueryError> {
        self.check()?;
        let bound = if self.condition.is_empty() {
            None
        } else {
            Some(BoundCondition::bind(&self.condition, &*self.schema)?)
        };
        let mode = self.mode();
        log_debug!(
            component = "read",
            event = "read_submitted",
            tiles = tiles.len(),
            mode = ?mode,
            condition = %self.condition,
        );

        let results = self.process_tiles(bound.as_ref(), mode, tiles)?;

        log_debug!(
            component = "read",
            event = "read_completed",
            tiles = results.len(),
            cells = results
                .iter()
                .filter_map(|tile| tile.result_buffer_elements().into_values().next())
                .sum::<u64>(),
        );
        Ok(results)
    }

    #[cfg(feature = "parallel")]
    fn process_tiles(
        &self,
        bound: Option<&BoundCondition>,
        mode: ReadMode,
        tiles: Vec<ResultBuffers>,
    ) -> Result<Vec<ResultBuffers>, QueryError> {
        use rayon::prelude::*;

        if tiles.len() >= self.options.parallel_tile_threshold {
            tiles
                .into_par_iter()
                .map(|tile| self.process_tile(bound, mode, tile))
                .collect()
        } else {
            tiles
                .into_iter()
                .map(|tile| self.process_tile(bound, mode, tile))
                .collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn process_tiles(
        &self,
        bound: Option<&BoundCondition>,
        mode: ReadMode,
        tiles: Vec<ResultBuffers>,
    ) -> Result<Vec<ResultBuffers>, QueryError> {
        tiles
            .into_iter()
            .map(|tile| self.process_tile(bound, mode, tile))
            .collect()
    }

    fn process_tile(
        &self,
        bound: Option<&BoundCondition>,
        mode: ReadMode,
        mut tile: ResultBuffers,
    ) -> Result<ResultBuffers, QueryError> {
        let selection = match bound {
            Some(bound) => Some(bound.evaluate(&tile.field_buffer_set())?),
            None => None,
        };
        if let Some(output) = &self.output_fields {
            tile.retain_fields(output);
        }
        match selection {
            Some(selection) => apply(&selection, mode, &*self.schema, tile, &self.options.offsets),
            None => Ok(tile),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{QueryStatus, ReadOptions, ReadQuery};
    use crate::{
        buffer::{ResultBuffer, ResultBuffers},
        query::{ComparisonOp, Condition, ErrorKind},
        schema::{ArraySchema, ArrayType, Datatype},
    };

    fn schema(array_type: ArrayType) -> Arc<ArraySchema> {
        Arc::new(
            ArraySchema::builder(array_type)
                .dimension("d", Datatype::Int32)
                .attribute("a", Datatype::Int32)
                .attribute("b", Datatype::UInt8)
                .dimension_label("d_label", "d")
                .build()
                .expect("schema"),
        )
    }

    fn le_i32(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn tile(d: &[i32], a: &[i32], b: &[u8]) -> ResultBuffers {
        ResultBuffers::new()
            .with("d", ResultBuffer::fixed(le_i32(d), d.len() as u64))
            .with("a", ResultBuffer::fixed(le_i32(a), a.len() as u64))
            .with("b", ResultBuffer::fixed(b.to_vec(), b.len() as u64))
    }

    #[test]
    fn empty_condition_is_rejected() {
        let mut query = ReadQuery::new(schema(ArrayType::Sparse));
        let err = query.set_condition(&Condition::Empty).expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::InvalidCondition);
    }

    #[test]
    fn conditions_and_labels_are_exclusive() {
        let mut query = ReadQuery::new(schema(ArrayType::Dense));
        query.add_dimension_label("d_label").expect("label");
        query.check().expect("labels alone are fine");
        query
            .set_condition(&Condition::comparison("a", ComparisonOp::Equal, 1i32))
            .expect("condition");
        let err = query.submit(vec![tile(&[1], &[1], &[1])]).expect_err("exclusive");
        assert_eq!(err.kind(), ErrorKind::IncompatibleFeature);
        assert_eq!(
            err.to_string(),
            "incompatible feature: cannot use query conditions and dimension labels together"
        );
        assert_eq!(query.status(), QueryStatus::Failed);

        let mut query = ReadQuery::new(schema(ArrayType::Dense));
        let err = query.add_dimension_label("nope").expect_err("unknown label");
        assert_eq!(err.kind(), ErrorKind::FieldNotFound);
    }

    #[test]
    fn filter_only_fields_are_dropped() {
        let mut query = ReadQuery::new(schema(ArrayType::Sparse));
        query
            .set_condition(&Condition::comparison("b", ComparisonOp::GreaterThan, 1u8))
            .expect("condition");
        query.set_output_fields(["d", "a"]).expect("outputs");
        assert_eq!(
            query
                .required_fields()
                .expect("restricted")
                .iter()
                .map(|name| name.to_string())
                .collect::<Vec<_>>(),
            vec!["a", "b", "d"]
        );

        let out = query
            .submit(vec![tile(&[1, 2, 3], &[10, 20, 30], &[0, 2, 3])])
            .expect("submit");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].names().collect::<Vec<_>>(), vec!["a", "d"]);
        assert_eq!(out[0].get("d").expect("d").data(), &le_i32(&[2, 3])[..]);
        assert_eq!(query.status(), QueryStatus::Completed);
    }

    #[test]
    fn changes_after_submission_are_rejected() {
        let mut query = ReadQuery::new(schema(ArrayType::Sparse));
        let out = query.submit(vec![tile(&[1], &[1], &[1])]).expect("unfiltered");
        assert_eq!(out, vec![tile(&[1], &[1], &[1])]);

        let cond = Condition::comparison("a", ComparisonOp::Equal, 1i32);
        let err = query.set_condition(&cond).expect_err("after submit");
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(query.submit(Vec::new()).is_err());
    }

    #[test]
    fn parallel_and_sequential_tiles_agree() {
        let tiles: Vec<ResultBuffers> = (0..8)
            .map(|t| {
                let d: Vec<i32> = (0..16).map(|i| t * 16 + i).collect();
                let a: Vec<i32> = d.iter().map(|v| v % 7).collect();
                let b: Vec<u8> = d.iter().map(|v| (v % 5) as u8).collect();
                tile(&d, &a, &b)
            })
            .collect();
        let cond = Condition::comparison("a", ComparisonOp::LessThan, 3i32)
            .or(&Condition::comparison("b", ComparisonOp::Equal, 4u8));

        let mut results = Vec::new();
        for threshold in [1, usize::MAX] {
            let options = ReadOptions::default()
                .parallel_tile_threshold(threshold)
                .offsets_extra_element(true);
            let mut query = ReadQuery::new(schema(ArrayType::Dense)).with_options(options);
            query.set_condition(&cond).expect("condition");
            results.push(query.submit(tiles.clone()).expect("submit"));
        }
        assert_eq!(results[0], results[1]);
        assert_eq!(results[0].len(), 8);
        assert_eq!(results[0][3].get("d"), tiles[3].get("d"));
    }
}
