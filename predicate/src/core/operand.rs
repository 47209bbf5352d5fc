use std::{fmt, sync::Arc};

/// Right-hand side of a comparison: raw typed bytes or `NULL`.
///
/// The byte length is carried explicitly and need not match the width of the
/// field being compared; for variable-sized fields a shorter operand acts as a
/// prefix bound. Numeric conversions produce little-endian bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Encoded value bytes.
    Value(Arc<[u8]>),
    /// The `NULL` literal, usable with `=` and `!=` on nullable fields.
    Null,
}

impl Operand {
    /// Creates an operand from raw bytes.
    #[must_use]
    pub fn bytes<B>(bytes: B) -> Self
    where
        B: AsRef<[u8]>,
    {
        Self::Value(Arc::from(bytes.as_ref()))
    }

    /// Returns the `NULL` literal.
    #[must_use]
    pub fn null() -> Self {
        Self::Null
    }

    /// Returns true for the `NULL` literal.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Operand::Null)
    }

    /// Returns the operand bytes, or `None` for `NULL`.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Operand::Value(bytes) => Some(bytes),
            Operand::Null => None,
        }
    }

    /// Declared byte length; zero for `NULL`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().map_or(0, <[u8]>::len)
    }

    /// Returns true when the operand carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Operand::bytes(value.to_le_bytes())
                }
            }
        )*
    };
}

impl_from_primitive!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::bytes([u8::from(value)])
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::bytes(value.as_bytes())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Operand::Value(Arc::from(value.into_bytes()))
    }
}

impl From<&[u8]> for Operand {
    fn from(value: &[u8]) -> Self {
        Operand::bytes(value)
    }
}

impl From<Vec<u8>> for Operand {
    fn from(value: Vec<u8>) -> Self {
        Operand::Value(Arc::from(value))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Null => f.write_str("NULL"),
            Operand::Value(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) if text.chars().all(|c| !c.is_control()) => write!(f, "'{text}'"),
                _ => {
                    f.write_str("0x")?;
                    for byte in bytes.iter() {
                        write!(f, "{byte:02x}")?;
                    }
                    Ok(())
                }
            },
        }
    }
}
