use std::fmt::{Display, Formatter};

use common_base::sample::{FieldValue, Sample, REALTIME_NS};
use serde::{Deserialize, Serialize};

use crate::error::LogError;

/// ColumnType is the packed representation of one column, fixed when the
/// schema is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// u64 nanoseconds, always the first column of a row and never listed
    /// in a chunk header.
    #[serde(rename = "timestamp")]
    Timestamp,
    #[serde(rename = "uint32")]
    Uint32,
    #[serde(rename = "float")]
    Float,
}

impl ColumnType {
    pub fn of(value: &FieldValue) -> Self {
        match value {
            FieldValue::Uint32(_) => ColumnType::Uint32,
            FieldValue::Float(_) => ColumnType::Float,
        }
    }

    /// width returns the number of payload bytes a value of this type packs into.
    pub fn width(&self) -> usize {
        match self {
            ColumnType::Timestamp => 8,
            ColumnType::Uint32 | ColumnType::Float => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Timestamp => "timestamp",
            ColumnType::Uint32 => "uint32",
            ColumnType::Float => "float",
        }
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, typ: ColumnType) -> Self {
        Self {
            name: name.into(),
            typ,
        }
    }
}

/// Schema is the ordered column layout of one chunk's rows. The timestamp
/// column always comes first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// derive builds the schema of a chunk from its first sample.
    pub fn derive(sample: &Sample) -> Self {
        let mut columns = Vec::with_capacity(sample.fields.len() + 1);
        columns.push(Column::new(REALTIME_NS, ColumnType::Timestamp));
        for (name, value) in &sample.fields {
            columns.push(Column::new(name.as_str(), ColumnType::of(value)));
        }

        Self { columns }
    }

    /// from_fields rebuilds a schema from the field columns listed in a chunk
    /// header.
    pub fn from_fields(fields: &[Column]) -> anyhow::Result<Self> {
        let mut columns = Vec::with_capacity(fields.len() + 1);
        columns.push(Column::new(REALTIME_NS, ColumnType::Timestamp));
        for column in fields {
            if column.typ == ColumnType::Timestamp {
                return Err(anyhow!(
                    "schema: column '{}' may not be declared as timestamp",
                    column.name
                ));
            }
            columns.push(column.clone());
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        self.columns.as_slice()
    }

    /// fields returns the columns after the timestamp, as listed in a header.
    pub fn fields(&self) -> &[Column] {
        &self.columns[1..]
    }

    /// row_size returns the packed size in bytes of one row.
    pub fn row_size(&self) -> usize {
        self.columns.iter().map(|c| c.typ.width()).sum()
    }

    /// check verifies that sample has the same field names, order and kinds
    /// as this schema. `row` is the sample's position in its batch.
    pub fn check(&self, sample: &Sample, row: usize) -> Result<(), LogError> {
        let fields = self.fields();
        if sample.fields.len() != fields.len() {
            return Err(LogError::SchemaMismatch {
                row,
                reason: format!(
                    "expected {} fields, found {}",
                    fields.len(),
                    sample.fields.len()
                ),
            });
        }

        for (i, ((name, value), column)) in sample.fields.iter().zip(fields).enumerate() {
            if name != &column.name {
                return Err(LogError::SchemaMismatch {
                    row,
                    reason: format!(
                        "field {} is '{}', expected '{}'",
                        i, name, column.name
                    ),
                });
            }

            let typ = ColumnType::of(value);
            if typ != column.typ {
                return Err(LogError::SchemaMismatch {
                    row,
                    reason: format!(
                        "field '{}' is {}, expected {}",
                        name, typ, column.typ
                    ),
                });
            }
        }

        Ok(())
    }
}
