//! Field schemas and the values that follow them.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// One numeric field of a tracked value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, used as the key of decoded [`SampleRecord`](crate::SampleRecord)s.
    pub name: String,
    /// Quantization grain: values are stored in units of `2^-precision_bits`.
    pub precision_bits: u8,
}

impl FieldSpec {
    /// Create a field spec.
    pub fn new(name: impl Into<String>, precision_bits: u8) -> Self {
        Self {
            name: name.into(),
            precision_bits,
        }
    }
}

/// Ordered field schema. The order is the wire order of the history buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldConfig {
    fields: Vec<FieldSpec>,
}

impl FieldConfig {
    /// Create a schema from fields in wire order.
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Iterate fields in wire order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldSpec> {
        self.fields.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Wire index of the field called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

impl<'a> IntoIterator for &'a FieldConfig {
    type Item = &'a FieldSpec;
    type IntoIter = std::slice::Iter<'a, FieldSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// A value whose numeric fields are tracked over time.
///
/// `to_fields` and `from_fields` use the order of [`field_config`](Self::field_config).
pub trait TrackedValue: Clone {
    /// Schema shared by writers and readers of this value type.
    fn field_config() -> &'static FieldConfig;

    /// Flatten into per-field values in schema order.
    fn to_fields(&self) -> Vec<f64>;

    /// Rebuild from per-field values in schema order.
    fn from_fields(values: &[f64]) -> Self;
}

/// A 2D pointer position in container-relative pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal offset.
    pub x: f64,
    /// Vertical offset.
    pub y: f64,
}

impl Position {
    /// Create a position.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

static POSITION_FIELDS: LazyLock<FieldConfig> =
    LazyLock::new(|| FieldConfig::new(vec![FieldSpec::new("x", 8), FieldSpec::new("y", 8)]));

impl TrackedValue for Position {
    fn field_config() -> &'static FieldConfig {
        &POSITION_FIELDS
    }

    fn to_fields(&self) -> Vec<f64> {
        vec![self.x, self.y]
    }

    fn from_fields(values: &[f64]) -> Self {
        Self {
            x: values.first().copied().unwrap_or_default(),
            y: values.get(1).copied().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_schema_order() {
        let config = Position::field_config();
        let names: Vec<&str> = config.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["x", "y"]);
        assert!(config.iter().all(|f| f.precision_bits == 8));
        assert_eq!(config.index_of("y"), Some(1));
        assert_eq!(config.index_of("z"), None);
    }

    #[test]
    fn test_position_field_roundtrip() {
        let p = Position::new(12.5, -3.0);
        assert_eq!(Position::from_fields(&p.to_fields()), p);
    }
}
