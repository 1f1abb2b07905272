//! # Table Schemas
//!
//! A [`TableSchema`] is the ordered column descriptor one [`Table`] is
//! parameterized with: column names, types, key/required/optional roles, and
//! the per-table flags (autoincrement column, context time column,
//! value-uniqueness enforcement). Schemas are immutable once built and shared
//! behind an `Arc`; there is no class-level static state.
//!
//! [`Table`]: crate::table::Table

use serde::{Deserialize, Serialize};

use obsdm_core::error::{Error, Result};
use obsdm_core::types::TagKind;
use obsdm_core::value::ColumnType;

/// Role of a column within its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnRole {
    /// Part of the row key; frozen once the row is added.
    Key,
    /// Mandatory value attribute.
    Required,
    /// Value attribute with an explicit presence flag.
    Optional,
}

/// One column descriptor: name, type, role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub ctype: ColumnType,
    pub role: ColumnRole,
}

impl ColumnSpec {
    pub fn key(name: impl Into<String>, ctype: ColumnType) -> Self {
        Self { name: name.into(), ctype, role: ColumnRole::Key }
    }

    pub fn required(name: impl Into<String>, ctype: ColumnType) -> Self {
        Self { name: name.into(), ctype, role: ColumnRole::Required }
    }

    pub fn optional(name: impl Into<String>, ctype: ColumnType) -> Self {
        Self { name: name.into(), ctype, role: ColumnRole::Optional }
    }
}

/// Per-table behavior flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaFlags {
    /// Name of the key column whose [`Tag`](obsdm_core::Tag) value the table
    /// mints on `add`.
    pub autoincrement: Option<String>,
    /// Name of the distinguished time column; enables the context index.
    pub context_time: Option<String>,
    /// Reject rows whose mandatory value attributes collide with another
    /// row's.
    pub enforce_value_uniqueness: bool,
}

/// Immutable schema descriptor for one table.
#[derive(Debug)]
pub struct TableSchema {
    name: String,
    tag_kind: TagKind,
    columns: Vec<ColumnSpec>,
    auto_col: Option<usize>,
    time_col: Option<usize>,
    enforce_value_uniqueness: bool,
    // derived column index sets, in declared order
    key_cols: Vec<usize>,
    required_cols: Vec<usize>,
    lookup_cols: Vec<usize>,
    context_cols: Vec<usize>,
    auto_bucket_cols: Vec<usize>,
}

impl TableSchema {
    /// Build and validate a schema.
    ///
    /// Rejected with a [`Error::Conversion`]: duplicate column names, no key
    /// column, an autoincrement column that is not a `Tag`-typed key, a
    /// context time column that is not a `Time`-typed key.
    pub fn new(
        name: impl Into<String>,
        tag_kind: TagKind,
        columns: Vec<ColumnSpec>,
        flags: SchemaFlags,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::conversion("table name must not be empty"));
        }
        for (i, col) in columns.iter().enumerate() {
            if col.name.is_empty() {
                return Err(Error::conversion(format!("{}: column {} has no name", name, i)));
            }
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(Error::conversion(format!(
                    "{}: duplicate column '{}'",
                    name, col.name
                )));
            }
        }

        let index_of = |col_name: &str| -> Result<usize> {
            columns
                .iter()
                .position(|c| c.name == col_name)
                .ok_or_else(|| Error::conversion(format!("{}: no column '{}'", name, col_name)))
        };

        let auto_col = match &flags.autoincrement {
            None => None,
            Some(col_name) => {
                let i = index_of(col_name)?;
                if columns[i].role != ColumnRole::Key || columns[i].ctype != ColumnType::Tag {
                    return Err(Error::conversion(format!(
                        "{}: autoincrement column '{}' must be a Tag-typed key",
                        name, col_name
                    )));
                }
                Some(i)
            }
        };

        let time_col = match &flags.context_time {
            None => None,
            Some(col_name) => {
                let i = index_of(col_name)?;
                if columns[i].role != ColumnRole::Key || columns[i].ctype != ColumnType::Time {
                    return Err(Error::conversion(format!(
                        "{}: context time column '{}' must be a Time-typed key",
                        name, col_name
                    )));
                }
                Some(i)
            }
        };

        let key_cols: Vec<usize> = indices_with(&columns, |c| c.role == ColumnRole::Key);
        if key_cols.is_empty() {
            return Err(Error::conversion(format!("{}: schema has no key column", name)));
        }
        let required_cols = indices_with(&columns, |c| c.role == ColumnRole::Required);
        // comparisons span key and required columns; optionals are excluded
        let lookup_cols = indices_with(&columns, |c| c.role != ColumnRole::Optional)
            .into_iter()
            .filter(|&i| Some(i) != auto_col)
            .collect();
        let context_cols = key_cols
            .iter()
            .copied()
            .filter(|&i| Some(i) != time_col)
            .collect();
        let auto_bucket_cols = key_cols
            .iter()
            .copied()
            .filter(|&i| Some(i) != auto_col)
            .collect();

        Ok(Self {
            name,
            tag_kind,
            columns,
            auto_col,
            time_col,
            enforce_value_uniqueness: flags.enforce_value_uniqueness,
            key_cols,
            required_cols,
            lookup_cols,
            context_cols,
            auto_bucket_cols,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entity kind of the tags this table mints.
    pub fn tag_kind(&self) -> TagKind {
        self.tag_kind
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> &ColumnSpec {
        &self.columns[index]
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn auto_col(&self) -> Option<usize> {
        self.auto_col
    }

    pub fn time_col(&self) -> Option<usize> {
        self.time_col
    }

    pub fn has_context_index(&self) -> bool {
        self.time_col.is_some()
    }

    pub fn enforce_value_uniqueness(&self) -> bool {
        self.enforce_value_uniqueness
    }

    /// Key columns, declared order.
    pub fn key_cols(&self) -> &[usize] {
        &self.key_cols
    }

    /// Mandatory value columns, declared order.
    pub fn required_cols(&self) -> &[usize] {
        &self.required_cols
    }

    /// Columns compared by `lookup` and the autoincrement deduplication:
    /// every key and required column except the autoincrement column.
    pub fn lookup_cols(&self) -> &[usize] {
        &self.lookup_cols
    }

    /// Context columns: the key columns minus the time column.
    pub fn context_cols(&self) -> &[usize] {
        &self.context_cols
    }

    /// Counter bucket for autoincrement minting: the key columns minus the
    /// autoincrement column.
    pub fn auto_bucket_cols(&self) -> &[usize] {
        &self.auto_bucket_cols
    }

    /// Columns a caller supplies to `new_row_with`, declared order. These
    /// coincide with the lookup columns: everything but the autoincrement
    /// column and the optionals.
    pub fn explicit_cols(&self) -> &[usize] {
        &self.lookup_cols
    }
}

fn indices_with(columns: &[ColumnSpec], pred: impl Fn(&ColumnSpec) -> bool) -> Vec<usize> {
    columns
        .iter()
        .enumerate()
        .filter(|&(_, c)| pred(c))
        .map(|(i, _)| i)
        .collect()
}
