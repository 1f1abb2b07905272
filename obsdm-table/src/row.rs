//! # Rows
//!
//! One [`Row`] holds one slot per schema column. Key slots freeze once the
//! row is added to its table; optional slots carry presence through
//! `Some`/`None`. Rows are created detached through a
//! [`Table`](crate::table::Table) and owned by it after `add`.

use std::io::{Read, Write};
use std::sync::Arc;

use obsdm_core::error::{Error, Result};
use obsdm_core::serialization::{BinReader, BinWriter};
use obsdm_core::types::ArrayTime;
use obsdm_core::value::Value;

use crate::schema::{ColumnRole, TableSchema};
use crate::xml;

/// One logical record, split into key and value attributes.
#[derive(Debug)]
pub struct Row {
    schema: Arc<TableSchema>,
    slots: Vec<Option<Value>>,
    added: bool,
}

impl Row {
    /// Detached row with type defaults in every key and required slot;
    /// optional slots start absent.
    pub(crate) fn new_default(schema: Arc<TableSchema>) -> Row {
        let slots = schema
            .columns()
            .iter()
            .map(|c| match c.role {
                ColumnRole::Optional => None,
                _ => Some(Value::default_for(c.ctype)),
            })
            .collect();
        Row { schema, slots, added: false }
    }

    /// Detached row from explicit values, aligned with
    /// [`TableSchema::explicit_cols`] in declared order. The autoincrement
    /// slot, if any, keeps its default until `add` mints it.
    pub(crate) fn with_values(schema: Arc<TableSchema>, values: Vec<Value>) -> Result<Row> {
        let explicit = schema.explicit_cols();
        if values.len() != explicit.len() {
            return Err(Error::conversion(format!(
                "{}: expected {} values, got {}",
                schema.name(),
                explicit.len(),
                values.len()
            )));
        }
        let mut row = Row::new_default(schema.clone());
        for (&i, value) in explicit.iter().zip(values) {
            row.check_type(i, &value)?;
            row.slots[i] = Some(value);
        }
        Ok(row)
    }

    /// Detached deep copy; every nested sequence is cloned, and the copy is
    /// not added to any table.
    pub fn duplicate(&self) -> Row {
        Row {
            schema: self.schema.clone(),
            slots: self.slots.clone(),
            added: false,
        }
    }

    /// True once the row was inserted into its table's collection.
    pub fn is_added(&self) -> bool {
        self.added
    }

    pub(crate) fn mark_added(&mut self) {
        self.added = true;
    }

    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.schema
            .column_index(name)
            .ok_or_else(|| Error::conversion(format!("{}: no column '{}'", self.schema.name(), name)))
    }

    fn check_type(&self, index: usize, value: &Value) -> Result<()> {
        let col = self.schema.column(index);
        if value.column_type() != col.ctype {
            return Err(Error::conversion(format!(
                "{}.{}: expected {}, got {}",
                self.schema.name(),
                col.name,
                col.ctype.name(),
                value.column_type().name()
            )));
        }
        Ok(())
    }

    /// The value of a column; [`Error::NoSuchRow`] when the slot is empty.
    pub fn get(&self, name: &str) -> Result<&Value> {
        let i = self.index_of(name)?;
        self.slots[i].as_ref().ok_or_else(|| Error::NoSuchRow {
            message: format!("{}.{} is unset", self.schema.name(), name),
        })
    }

    /// The value of a column, or `None` when the slot is empty.
    pub fn get_opt(&self, name: &str) -> Option<&Value> {
        let i = self.schema.column_index(name)?;
        self.slots[i].as_ref()
    }

    /// Set a column. Type-checked against the schema; a key column fails
    /// with [`Error::IllegalAccess`] once the row is added.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let i = self.index_of(name)?;
        if self.added && self.schema.column(i).role == ColumnRole::Key {
            return Err(Error::IllegalAccess {
                message: format!(
                    "{}.{}: key attribute is frozen once the row is added",
                    self.schema.name(),
                    name
                ),
            });
        }
        self.check_type(i, &value)?;
        self.slots[i] = Some(value);
        Ok(())
    }

    /// Empty a non-key slot. Rendering a row whose required slot was cleared
    /// fails with [`Error::NoSuchRow`].
    pub fn clear(&mut self, name: &str) -> Result<()> {
        let i = self.index_of(name)?;
        if self.schema.column(i).role == ColumnRole::Key {
            return Err(Error::IllegalAccess {
                message: format!("{}.{}: key attribute cannot be cleared", self.schema.name(), name),
            });
        }
        self.slots[i] = None;
        Ok(())
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&Value> {
        self.slots[index].as_ref()
    }

    // Bypasses the frozen-key check; only the table's mint path uses it,
    // before the row is added.
    pub(crate) fn set_slot(&mut self, index: usize, value: Value) {
        self.slots[index] = Some(value);
    }

    /// Structural equality over every non-autoincrement key and required
    /// attribute, `values` aligned with [`TableSchema::lookup_cols`].
    pub fn compare_keyless(&self, values: &[Value]) -> bool {
        self.values_match(self.schema.lookup_cols(), values)
    }

    /// Equality restricted to the mandatory value attributes, `values`
    /// aligned with [`TableSchema::required_cols`].
    pub fn compare_required_value(&self, values: &[Value]) -> bool {
        self.values_match(self.schema.required_cols(), values)
    }

    pub(crate) fn values_match(&self, indices: &[usize], values: &[Value]) -> bool {
        indices.len() == values.len()
            && indices
                .iter()
                .zip(values)
                .all(|(&i, v)| self.slots[i].as_ref() == Some(v))
    }

    pub(crate) fn matches_on(&self, other: &Row, indices: &[usize]) -> bool {
        indices.iter().all(|&i| self.slots[i] == other.slots[i])
    }

    /// Canonical text fingerprint over the given columns; empty slots
    /// contribute a placeholder token.
    pub(crate) fn fingerprint(&self, indices: &[usize]) -> String {
        let parts: Vec<String> = indices
            .iter()
            .map(|&i| match &self.slots[i] {
                Some(v) => v.to_text(),
                None => "~".to_string(),
            })
            .collect();
        parts.join("|")
    }

    /// The value of the distinguished time column.
    pub(crate) fn time(&self) -> Result<ArrayTime> {
        let i = self.schema.time_col().ok_or_else(|| {
            Error::conversion(format!("{}: table has no time column", self.schema.name()))
        })?;
        self.slots[i]
            .as_ref()
            .and_then(|v| v.as_time())
            .ok_or_else(|| Error::NoSuchRow {
                message: format!(
                    "{}.{} is unset",
                    self.schema.name(),
                    self.schema.column(i).name
                ),
            })
    }

    /// Render one `<row>…</row>` fragment. Optional slots are emitted only
    /// when present; an empty key or required slot fails with
    /// [`Error::NoSuchRow`].
    pub fn to_xml(&self) -> Result<String> {
        let mut out = String::from("  <row>\n");
        for (i, col) in self.schema.columns().iter().enumerate() {
            match (&self.slots[i], col.role) {
                (None, ColumnRole::Optional) => {}
                (None, _) => {
                    return Err(Error::NoSuchRow {
                        message: format!("{}.{} is unset", self.schema.name(), col.name),
                    })
                }
                (Some(value), _) => xml::write_element(&mut out, &col.name, &value.to_text()),
            }
        }
        out.push_str("  </row>\n");
        Ok(out)
    }

    /// Parse one `<row>` fragment's inner content. A missing key or required
    /// element aborts with [`Error::Conversion`].
    pub(crate) fn from_xml(fragment: &str, schema: &Arc<TableSchema>) -> Result<Row> {
        let mut slots = Vec::with_capacity(schema.columns().len());
        for col in schema.columns() {
            match xml::element_in(fragment, &col.name) {
                Some(text) => {
                    let value = Value::parse(col.ctype, &xml::unescape_text(text))?;
                    slots.push(Some(value));
                }
                None if col.role == ColumnRole::Optional => slots.push(None),
                None => {
                    return Err(Error::conversion(format!(
                        "row is missing element <{}>",
                        col.name
                    )))
                }
            }
        }
        Ok(Row { schema: schema.clone(), slots, added: false })
    }

    /// Serialize the attributes in declared order; optional slots are
    /// preceded by a presence flag.
    pub(crate) fn to_bin<W: Write>(&self, writer: &mut BinWriter<W>) -> Result<()> {
        for (i, col) in self.schema.columns().iter().enumerate() {
            match (&self.slots[i], col.role) {
                (slot, ColumnRole::Optional) => {
                    writer.write_bool(slot.is_some())?;
                    if let Some(value) = slot {
                        writer.write_value(value)?;
                    }
                }
                (Some(value), _) => writer.write_value(value)?,
                (None, _) => {
                    return Err(Error::NoSuchRow {
                        message: format!("{}.{} is unset", self.schema.name(), col.name),
                    })
                }
            }
        }
        Ok(())
    }

    pub(crate) fn from_bin<R: Read>(
        reader: &mut BinReader<R>,
        schema: &Arc<TableSchema>,
    ) -> Result<Row> {
        let mut slots = Vec::with_capacity(schema.columns().len());
        for col in schema.columns() {
            if col.role == ColumnRole::Optional {
                if reader.read_bool()? {
                    slots.push(Some(reader.read_value(col.ctype)?));
                } else {
                    slots.push(None);
                }
            } else {
                slots.push(Some(reader.read_value(col.ctype)?));
            }
        }
        Ok(Row { schema: schema.clone(), slots, added: false })
    }
}
