//! Ordered column/value mappings used for statement parameters and result rows.

use crate::entities::ColumnSpec;
use crate::errors::{Error, Result};
use sea_orm::{ColumnType, QueryResult, Value};

/// Ordered mapping from column name to value.
///
/// Iteration order is insertion order, which is also the order values are
/// bound into generated statements. Inserting an existing column replaces its
/// value without moving it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnValues {
    entries: Vec<(String, Value)>,
}

/// Column values supplied to a statement (`data` or `where`).
pub type Params = ColumnValues;

/// One record returned by a select.
pub type Row = ColumnValues;

impl ColumnValues {
    /// Creates an empty mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Sets `column` to `value`, returning the previous value if there was one.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let column = column.into();
        let value = value.into();
        if let Some((_, existing)) = self.entries.iter_mut().find(|(name, _)| *name == column) {
            return Some(std::mem::replace(existing, value));
        }
        self.entries.push((column, value));
        None
    }

    /// Builder-style [`ColumnValues::insert`].
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Value stored for `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Integer value of `column`, `None` when absent, NULL or not an integer.
    #[must_use]
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::BigInt(Some(v)) => Some(*v),
            Value::Int(Some(v)) => Some(i64::from(*v)),
            Value::SmallInt(Some(v)) => Some(i64::from(*v)),
            Value::TinyInt(Some(v)) => Some(i64::from(*v)),
            Value::Unsigned(Some(v)) => Some(i64::from(*v)),
            Value::BigUnsigned(Some(v)) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// String value of `column`, `None` when absent, NULL or not a string.
    #[must_use]
    pub fn get_str(&self, column: &str) -> Option<&str> {
        match self.get(column)? {
            Value::String(Some(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no column is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(column, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Decodes one result row, reading `columns` by their declared types.
    pub(crate) fn from_query_result(result: &QueryResult, columns: &[ColumnSpec]) -> Result<Self> {
        let mut row = Self::new();
        for column in columns {
            let value = read_value(result, column)?;
            row.entries.push((column.name.clone(), value));
        }
        Ok(row)
    }
}

fn read_value(result: &QueryResult, column: &ColumnSpec) -> Result<Value> {
    let name = column.name.as_str();
    let value = match &column.column_type {
        ColumnType::BigInteger | ColumnType::BigUnsigned => {
            Value::BigInt(result.try_get::<Option<i64>>("", name)?)
        }
        ColumnType::Integer
        | ColumnType::SmallInteger
        | ColumnType::TinyInteger
        | ColumnType::Unsigned
        | ColumnType::SmallUnsigned
        | ColumnType::TinyUnsigned => Value::Int(result.try_get::<Option<i32>>("", name)?),
        ColumnType::Boolean => Value::Bool(result.try_get::<Option<bool>>("", name)?),
        ColumnType::Float | ColumnType::Double => {
            Value::Double(result.try_get::<Option<f64>>("", name)?)
        }
        ColumnType::String(_) | ColumnType::Char(_) | ColumnType::Text => {
            Value::String(result.try_get::<Option<String>>("", name)?.map(Box::new))
        }
        other => {
            return Err(Error::UnsupportedColumnType {
                column: column.name.clone(),
                column_type: format!("{other:?}"),
            });
        }
    };
    Ok(value)
}

impl<K, V, const N: usize> From<[(K, V); N]> for ColumnValues
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for ColumnValues
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (column, value) in iter {
            values.insert(column, value);
        }
        values
    }
}

impl IntoIterator for ColumnValues {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order_and_replaces_in_place() {
        let mut values = ColumnValues::new();
        values.insert("b", 1i64);
        values.insert("a", 2i64);
        let previous = values.insert("b", 3i64);

        assert_eq!(previous, Some(Value::BigInt(Some(1))));
        let columns: Vec<&str> = values.iter().map(|(name, _)| name).collect();
        assert_eq!(columns, vec!["b", "a"]);
        assert_eq!(values.get_i64("b"), Some(3));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_typed_getters() {
        let values = ColumnValues::from([
            ("id", Value::from(7i32)),
            ("prefix", Value::from("!")),
            ("missing", Value::String(None)),
        ]);

        assert_eq!(values.get_i64("id"), Some(7));
        assert_eq!(values.get_str("prefix"), Some("!"));
        assert_eq!(values.get_str("missing"), None);
        assert_eq!(values.get_i64("prefix"), None);
        assert!(values.get("nope").is_none());
    }

    #[test]
    fn test_equality_ignores_construction_path() {
        let built = ColumnValues::new().with("test", 42i64);
        let collected: ColumnValues = vec![("test".to_string(), 42i64)].into_iter().collect();
        assert_eq!(built, ColumnValues::from([("test", 42i64)]));
        assert_eq!(built, collected);
        assert!(ColumnValues::default().is_empty());
    }
}
