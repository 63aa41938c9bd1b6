//! Materialized table model
//!
//! A [`Table`] is the fully loaded dataset the inference engine works on:
//! ordered columns, each holding one raw cell per row. A cell is either the
//! raw text read from the source or `None` when the loader marked it null.

use serde::{Deserialize, Serialize};

/// A single named column with its raw cells in row order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name as it appeared in the header
    pub name: String,
    /// Raw cell values; `None` is the null marker
    pub values: Vec<Option<String>>,
}

impl Column {
    /// Create a new column
    pub fn new(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Build a column from string slices, treating `None` as null
    pub fn from_strs(name: impl Into<String>, values: &[Option<&str>]) -> Self {
        Self::new(
            name,
            values.iter().map(|v| v.map(str::to_string)).collect(),
        )
    }

    /// Number of null cells
    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// Iterate over the non-null cells in row order
    pub fn non_null(&self) -> impl Iterator<Item = &str> {
        self.values.iter().filter_map(|v| v.as_deref())
    }

    /// Number of non-null cells
    pub fn non_null_count(&self) -> usize {
        self.values.len() - self.null_count()
    }
}

/// Error raised when assembling a table with inconsistent shape
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    /// A column's length differs from the table's row count
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Two columns share the same name
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),
}

/// Ordered collection of equally sized columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Create a table, checking every column has the same number of rows
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let row_count = columns.first().map(|c| c.values.len()).unwrap_or(0);
        let mut table = Self {
            columns: Vec::with_capacity(columns.len()),
            row_count,
        };
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Build a table from a header row and record rows
    pub fn from_rows(
        headers: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
    ) -> Result<Self, TableError> {
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();

        for (row_index, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TableError::RaggedColumn {
                    column: format!("row {}", row_index + 1),
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
            for (column, cell) in columns.iter_mut().zip(row) {
                column.values.push(cell);
            }
        }

        Self::new(columns)
    }

    /// Append a column at the end of the table
    pub fn push_column(&mut self, column: Column) -> Result<(), TableError> {
        if self.columns.is_empty() {
            self.row_count = column.values.len();
        } else if column.values.len() != self.row_count {
            return Err(TableError::RaggedColumn {
                column: column.name,
                expected: self.row_count,
                actual: column.values.len(),
            });
        }
        if self.column(&column.name).is_some() {
            return Err(TableError::DuplicateColumn(column.name));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Replace the cells of an existing column, keeping its position
    pub fn replace_values(
        &mut self,
        name: &str,
        values: Vec<Option<String>>,
    ) -> Result<bool, TableError> {
        if values.len() != self.row_count {
            return Err(TableError::RaggedColumn {
                column: name.to_string(),
                expected: self.row_count,
                actual: values.len(),
            });
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(column) => {
                column.values = values;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Columns in their original order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in their original order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Iterate rows as borrowed cells, in column order
    pub fn rows(&self) -> impl Iterator<Item = Vec<Option<&str>>> + '_ {
        (0..self.row_count).map(move |row| {
            self.columns
                .iter()
                .map(|c| c.values[row].as_deref())
                .collect()
        })
    }
}
