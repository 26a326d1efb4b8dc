//! Row representation and row shapes.

use crate::field::FieldDescriptor;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// How fetched rows are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RowShape {
    /// Positional. Name lookup uses the bare column names.
    #[default]
    Tuple,
    /// Keyed by column name; a name that repeats an earlier column is
    /// keyed as `table.name` instead.
    Dict,
    /// Keyed by `table.name`, or the bare name for columns with no table.
    DictQualified,
}

impl RowShape {
    /// Map the numeric `how` argument: 0 tuple, 1 dict, 2 qualified dict.
    pub fn from_index(how: u32) -> Option<Self> {
        match how {
            0 => Some(RowShape::Tuple),
            1 => Some(RowShape::Dict),
            2 => Some(RowShape::DictQualified),
            _ => None,
        }
    }
}

/// Column keys shared across all rows in a result set.
///
/// This struct is wrapped in `Arc` so all rows from the same fetch share
/// the same keys.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    shape: RowShape,
    /// Column keys in order
    names: Vec<String>,
    /// Key -> index mapping for O(1) lookup
    name_to_index: HashMap<String, usize>,
}

impl ColumnInfo {
    /// Create column info from a list of keys.
    pub fn new(names: Vec<String>) -> Self {
        Self::with_shape(RowShape::Tuple, names)
    }

    fn with_shape(shape: RowShape, names: Vec<String>) -> Self {
        let mut name_to_index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            name_to_index.entry(name.clone()).or_insert(i);
        }
        Self {
            shape,
            names,
            name_to_index,
        }
    }

    /// Compute the keys a shape assigns to a result's fields.
    pub fn for_fields(fields: &[FieldDescriptor], shape: RowShape) -> Self {
        let names = match shape {
            RowShape::Tuple => fields.iter().map(|f| f.name.clone()).collect(),
            RowShape::Dict => {
                let mut seen = std::collections::HashSet::with_capacity(fields.len());
                fields
                    .iter()
                    .map(|f| {
                        if seen.insert(f.name.as_str()) {
                            f.name.clone()
                        } else {
                            format!("{}.{}", f.table, f.name)
                        }
                    })
                    .collect()
            }
            RowShape::DictQualified => fields.iter().map(FieldDescriptor::qualified_name).collect(),
        };
        Self::with_shape(shape, names)
    }

    pub fn shape(&self) -> RowShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Get the index of a column by key.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// A single converted row.
#[derive(Debug, Clone)]
pub struct Row {
    values: Vec<Value>,
    columns: Arc<ColumnInfo>,
}

impl Row {
    /// Create a row with shared column keys.
    pub fn with_columns(columns: Arc<ColumnInfo>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    pub fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.columns)
    }

    pub fn shape(&self) -> RowShape {
        self.columns.shape()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by the key this row's shape assigned.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Iterate over (key, value) pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// The row as a key -> value map. Later columns overwrite earlier
    /// ones with the same key.
    pub fn into_map(self) -> HashMap<String, Value> {
        self.columns
            .names()
            .iter()
            .cloned()
            .zip(self.values)
            .collect()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values && self.columns.names() == other.columns.names()
    }
}
