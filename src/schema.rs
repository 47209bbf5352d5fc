//! Field catalog: dimensions, attributes, and dimension labels of an array.
//!
//! The evaluator only consumes the catalog through [`FieldCatalog`]; the
//! in-memory [`ArraySchema`] is the implementation used by the read path and
//! by tests.

use std::{collections::HashMap, fmt, num::NonZeroU32, sync::Arc};

pub use arrow::datatypes::TimeUnit;

use crate::query::QueryError;

/// Physical datatype of a dimension or attribute value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Datatype {
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    UInt64,
    /// IEEE 754 single precision.
    Float32,
    /// IEEE 754 double precision.
    Float64,
    /// One byte, `0` or `1`.
    Bool,
    /// Single character byte.
    Char,
    /// ASCII string bytes.
    StringAscii,
    /// UTF-8 string bytes.
    StringUtf8,
    /// Opaque bytes.
    Blob,
    /// Signed 64-bit ticks since the epoch.
    Datetime(TimeUnit),
}

impl Datatype {
    /// Size in bytes of a single value.
    #[must_use]
    pub fn value_size(self) -> usize {
        match self {
            Datatype::Int8
            | Datatype::UInt8
            | Datatype::Bool
            | Datatype::Char
            | Datatype::StringAscii
            | Datatype::StringUtf8
            | Datatype::Blob => 1,
            Datatype::Int16 | Datatype::UInt16 => 2,
            Datatype::Int32 | Datatype::UInt32 | Datatype::Float32 => 4,
            Datatype::Int64 | Datatype::UInt64 | Datatype::Float64 | Datatype::Datetime(_) => 8,
        }
    }

    /// Returns true for character datatypes.
    #[must_use]
    pub fn is_string(self) -> bool {
        matches!(
            self,
            Datatype::Char | Datatype::StringAscii | Datatype::StringUtf8
        )
    }

    /// Default fill value for one value of this datatype.
    ///
    /// Signed integers and datetimes use their minimum, unsigned integers
    /// their maximum, floats NaN; `Char` uses the minimum signed byte and the
    /// remaining byte types use `0`.
    #[must_use]
    pub fn default_fill(self) -> Vec<u8> {
        match self {
            Datatype::Int8 => i8::MIN.to_le_bytes().to_vec(),
            Datatype::UInt8 => u8::MAX.to_le_bytes().to_vec(),
            Datatype::Int16 => i16::MIN.to_le_bytes().to_vec(),
            Datatype::UInt16 => u16::MAX.to_le_bytes().to_vec(),
            Datatype::Int32 => i32::MIN.to_le_bytes().to_vec(),
            Datatype::UInt32 => u32::MAX.to_le_bytes().to_vec(),
            Datatype::Int64 | Datatype::Datetime(_) => i64::MIN.to_le_bytes().to_vec(),
            Datatype::UInt64 => u64::MAX.to_le_bytes().to_vec(),
            Datatype::Float32 => f32::NAN.to_le_bytes().to_vec(),
            Datatype::Float64 => f64::NAN.to_le_bytes().to_vec(),
            Datatype::Char => i8::MIN.to_le_bytes().to_vec(),
            Datatype::Bool | Datatype::StringAscii | Datatype::StringUtf8 | Datatype::Blob => {
                vec![0]
            }
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datatype::Datetime(unit) => write!(f, "Datetime({unit:?})"),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

/// Number of values stored per cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellValNum {
    /// A fixed number of values.
    Fixed(NonZeroU32),
    /// A variable number of values, addressed through offsets.
    Var,
}

impl CellValNum {
    /// One value per cell.
    pub const SINGLE: CellValNum = CellValNum::Fixed(NonZeroU32::MIN);
}

/// Whether a field is a coordinate or a stored value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Coordinate of the array domain.
    Dimension,
    /// Value stored in a cell.
    Attribute,
}

/// Value substituted for cells a dense read does not select.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FillValue {
    /// Encoded fill bytes (one cell's worth).
    pub bytes: Arc<[u8]>,
    /// Validity written for filled cells of nullable fields.
    pub valid: bool,
}

/// Resolved description of a dimension or attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    name: Arc<str>,
    kind: FieldKind,
    datatype: Datatype,
    cell_val_num: CellValNum,
    nullable: bool,
    fill: FillValue,
}

impl FieldInfo {
    fn new(name: &str, kind: FieldKind, datatype: Datatype) -> Self {
        Self {
            name: Arc::from(name),
            kind,
            datatype,
            cell_val_num: CellValNum::SINGLE,
            nullable: false,
            fill: FillValue {
                bytes: Arc::from(datatype.default_fill()),
                valid: false,
            },
        }
    }

    /// Declares a dimension with one value per cell.
    #[must_use]
    pub fn dimension(name: &str, datatype: Datatype) -> Self {
        Self::new(name, FieldKind::Dimension, datatype)
    }

    /// Declares a non-nullable attribute with one value per cell.
    #[must_use]
    pub fn attribute(name: &str, datatype: Datatype) -> Self {
        Self::new(name, FieldKind::Attribute, datatype)
    }

    /// Sets the number of values per cell, resetting the fill to the
    /// datatype default repeated for the new width.
    #[must_use]
    pub fn with_cell_val_num(mut self, cell_val_num: CellValNum) -> Self {
        self.cell_val_num = cell_val_num;
        let single = self.datatype.default_fill();
        let bytes = match cell_val_num {
            CellValNum::Fixed(n) => single.repeat(n.get() as usize),
            CellValNum::Var => single,
        };
        self.fill.bytes = Arc::from(bytes);
        self
    }

    /// Marks the field as variable-sized.
    #[must_use]
    pub fn var_sized(self) -> Self {
        self.with_cell_val_num(CellValNum::Var)
    }

    /// Sets whether the field carries a validity buffer.
    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Overrides the fill bytes.
    #[must_use]
    pub fn with_fill<B: AsRef<[u8]>>(mut self, bytes: B) -> Self {
        self.fill.bytes = Arc::from(bytes.as_ref());
        self
    }

    /// Overrides the validity written for filled cells.
    #[must_use]
    pub fn with_fill_validity(mut self, valid: bool) -> Self {
        self.fill.valid = valid;
        self
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dimension or attribute.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Value datatype.
    #[must_use]
    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    /// Values per cell.
    #[must_use]
    pub fn cell_val_num(&self) -> CellValNum {
        self.cell_val_num
    }

    /// Whether cells may be null.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Fill value used by dense reads.
    #[must_use]
    pub fn fill(&self) -> &FillValue {
        &self.fill
    }

    /// Returns true for variable-sized fields.
    #[must_use]
    pub fn is_var_sized(&self) -> bool {
        self.cell_val_num == CellValNum::Var
    }

    /// Byte width of one cell, or `None` for variable-sized fields.
    #[must_use]
    pub fn fixed_width(&self) -> Option<usize> {
        match self.cell_val_num {
            CellValNum::Fixed(n) => Some(n.get() as usize * self.datatype.value_size()),
            CellValNum::Var => None,
        }
    }
}

/// Resolves field names to their descriptions.
pub trait FieldCatalog {
    /// Looks a field up by name.
    fn field(&self, name: &str) -> Option<&FieldInfo>;

    /// Looks a field up by name, failing with [`QueryError::FieldNotFound`].
    fn resolve(&self, name: &str) -> Result<&FieldInfo, QueryError> {
        self.field(name)
            .ok_or_else(|| QueryError::FieldNotFound(name.to_string()))
    }
}

/// Dense arrays fill unselected cells; sparse arrays drop them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArrayType {
    /// Every coordinate of the domain has a cell.
    Dense,
    /// Only written coordinates have cells.
    Sparse,
}

/// Ordered label attached to a dimension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DimensionLabel {
    name: Arc<str>,
    dimension: Arc<str>,
}

impl DimensionLabel {
    /// Label name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the labelled dimension.
    #[must_use]
    pub fn dimension(&self) -> &str {
        &self.dimension
    }
}

/// In-memory array schema implementing [`FieldCatalog`].
#[derive(Clone, Debug)]
pub struct ArraySchema {
    array_type: ArrayType,
    fields: Vec<FieldInfo>,
    by_name: HashMap<Arc<str>, usize>,
    labels: Vec<DimensionLabel>,
}

impl ArraySchema {
    /// Starts a schema declaration.
    #[must_use]
    pub fn builder(array_type: ArrayType) -> SchemaBuilder {
        SchemaBuilder::new(array_type)
    }

    /// Dense or sparse.
    #[must_use]
    pub fn array_type(&self) -> ArrayType {
        self.array_type
    }

    /// Dimensions in declaration order.
    pub fn dimensions(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields
            .iter()
            .filter(|field| field.kind == FieldKind::Dimension)
    }

    /// Attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields
            .iter()
            .filter(|field| field.kind == FieldKind::Attribute)
    }

    /// Looks up a dimension label by name.
    #[must_use]
    pub fn dimension_label(&self, name: &str) -> Option<&DimensionLabel> {
        self.labels.iter().find(|label| &*label.name == name)
    }
}

impl FieldCatalog for ArraySchema {
    fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.by_name.get(name).map(|&idx| &self.fields[idx])
    }
}

/// Builder for [`ArraySchema`].
#[derive(Clone, Debug)]
pub struct SchemaBuilder {
    array_type: ArrayType,
    fields: Vec<FieldInfo>,
    labels: Vec<DimensionLabel>,
}

impl SchemaBuilder {
    fn new(array_type: ArrayType) -> Self {
        Self {
            array_type,
            fields: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Adds a dimension with one value per cell.
    #[must_use]
    pub fn dimension(self, name: &str, datatype: Datatype) -> Self {
        self.field(FieldInfo::dimension(name, datatype))
    }

    /// Adds an attribute with one value per cell.
    #[must_use]
    pub fn attribute(self, name: &str, datatype: Datatype) -> Self {
        self.field(FieldInfo::attribute(name, datatype))
    }

    /// Adds a fully described field.
    #[must_use]
    pub fn field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds an ordered label over `dimension`.
    #[must_use]
    pub fn dimension_label(mut self, name: &str, dimension: &str) -> Self {
        self.labels.push(DimensionLabel {
            name: Arc::from(name),
            dimension: Arc::from(dimension),
        });
        self
    }

    /// Validates the declaration and produces the schema.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Schema`] when the schema has no dimension, when a
    /// name is declared twice, when a dimension is nullable, when a fill value
    /// does not fit its attribute, or when a label targets an unknown
    /// dimension.
    pub fn build(self) -> Result<ArraySchema, QueryError> {
        let mut by_name = HashMap::with_capacity(self.fields.len());
        for (idx, field) in self.fields.iter().enumerate() {
            if by_name.insert(Arc::clone(&field.name), idx).is_some() {
                return Err(QueryError::Schema(format!(
                    "duplicate field name '{}'",
                    field.name
                )));
            }
            check_field(field)?;
        }
        if !self
            .fields
            .iter()
            .any(|field| field.kind == FieldKind::Dimension)
        {
            return Err(QueryError::Schema(
                "an array requires at least one dimension".into(),
            ));
        }
        for label in &self.labels {
            if by_name.contains_key(&label.name) {
                return Err(QueryError::Schema(format!(
                    "dimension label '{}' collides with a field name",
                    label.name
                )));
            }
            match by_name.get(&label.dimension).map(|&idx| &self.fields[idx]) {
                Some(field) if field.kind == FieldKind::Dimension => {}
                _ => {
                    return Err(QueryError::Schema(format!(
                        "dimension label '{}' targets unknown dimension '{}'",
                        label.name, label.dimension
                    )))
                }
            }
        }

        Ok(ArraySchema {
            array_type: self.array_type,
            fields: self.fields,
            by_name,
            labels: self.labels,
        })
    }
}

fn check_field(field: &FieldInfo) -> Result<(), QueryError> {
    if field.kind == FieldKind::Dimension && field.nullable {
        return Err(QueryError::Schema(format!(
            "dimension '{}' cannot be nullable",
            field.name
        )));
    }
    let fill_len = field.fill.bytes.len();
    let fits = match field.fixed_width() {
        Some(width) => fill_len == width,
        None => fill_len % field.datatype.value_size() == 0,
    };
    if !fits {
        return Err(QueryError::Schema(format!(
            "fill value of {fill_len} bytes does not fit field '{}' of type {}",
            field.name, field.datatype
        )));
    }
    Ok(())
}
