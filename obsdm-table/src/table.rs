//! # The Table Engine
//!
//! An ordered, uniqueness-checked collection of [`Row`]s for one schema.
//! One generic engine serves every table: the schema descriptor drives key
//! comparison, autoincrement minting with deduplication, the optional
//! time-ordered context index, both wire formats, and file persistence.
//!
//! ## Residency
//!
//! ```text
//!  Empty ──first access──> Loading ──success──> Resident
//! ```
//!
//! A table opened through its container starts `Empty`; the first externally
//! observable access reads the backing file exactly once. `Loading` doubles
//! as the reentrancy guard: ingestion paths that run while a load is in
//! progress see `Loading` and do not trigger a second load. There is no
//! back-transition from `Resident`, and no intrinsic locking — two threads
//! racing a first-time load must be serialized by the caller.

use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use obsdm_core::config::FileFormat;
use obsdm_core::error::{Error, Result};
use obsdm_core::serialization::{BinReader, BinWriter};
use obsdm_core::types::{Entity, Tag};
use obsdm_core::value::Value;

use crate::mime;
use crate::row::Row;
use crate::schema::TableSchema;
use crate::xml;

/// Residency of a table relative to its backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residency {
    /// Attached to a backing file that was not read yet.
    Empty,
    /// A load is in progress; doubles as the reentrancy guard.
    Loading,
    /// Rows are in memory.
    Resident,
}

/// An ordered, uniqueness-checked row collection for one schema, with dual
/// serialization and lazy load.
pub struct Table {
    schema: Arc<TableSchema>,
    entity: Entity,
    container_entity: Entity,
    rows: Vec<Row>,
    /// fingerprint of the non-auto key columns -> next value to mint
    auto_next: HashMap<String, i64>,
    /// context fingerprint -> (time, row index), kept time-ascending
    context: HashMap<String, Vec<(i64, usize)>>,
    residency: Residency,
    directory: Option<PathBuf>,
    format: FileFormat,
}

impl Table {
    pub(crate) fn new_in(
        schema: Arc<TableSchema>,
        container_entity: Entity,
        directory: Option<PathBuf>,
        format: FileFormat,
        residency: Residency,
    ) -> Table {
        let entity = Entity::generate(format!("{}Table", schema.name()));
        Table {
            schema,
            entity,
            container_entity,
            rows: Vec::new(),
            auto_next: HashMap::new(),
            context: HashMap::new(),
            residency,
            directory,
            format,
        }
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    /// This table's identity record.
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn version(&self) -> &str {
        &self.entity.version
    }

    pub fn residency(&self) -> Residency {
        self.residency
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    // ---- detached row construction -------------------------------------

    /// A detached row with default-valued key and required attributes.
    pub fn new_row(&self) -> Row {
        Row::new_default(self.schema.clone())
    }

    /// A detached row from explicit values, aligned with
    /// [`TableSchema::explicit_cols`].
    pub fn new_row_with(&self, values: Vec<Value>) -> Result<Row> {
        Row::with_values(self.schema.clone(), values)
    }

    /// A detached deep copy of another row.
    pub fn new_row_copy(&self, other: &Row) -> Row {
        other.duplicate()
    }

    // ---- collection ----------------------------------------------------

    pub fn size(&mut self) -> Result<usize> {
        self.ensure_resident()?;
        Ok(self.rows.len())
    }

    /// All rows, insertion order.
    pub fn get(&mut self) -> Result<&[Row]> {
        self.ensure_resident()?;
        Ok(&self.rows)
    }

    pub fn iter(&mut self) -> Result<std::slice::Iter<'_, Row>> {
        Ok(self.get()?.iter())
    }

    /// Mutable access to one row; key attributes stay frozen through the
    /// row's own setters.
    pub fn row_mut(&mut self, index: usize) -> Result<Option<&mut Row>> {
        self.ensure_resident()?;
        Ok(self.rows.get_mut(index))
    }

    /// Insert a detached row.
    ///
    /// Without autoincrement: an equal key discards the argument and returns
    /// the already-present row; otherwise value uniqueness is enforced when
    /// the schema demands it, then the row is appended.
    ///
    /// With autoincrement: a row equal on every non-auto attribute returns
    /// the already-present row unchanged; otherwise a fresh key is minted
    /// from the counter of the non-auto key fingerprint and the row is
    /// appended.
    pub fn add(&mut self, row: Row) -> Result<&Row> {
        self.ensure_resident()?;
        let schema = self.schema.clone();
        if let Some(auto) = schema.auto_col() {
            if let Some(at) = self
                .rows
                .iter()
                .position(|r| row.matches_on(r, schema.lookup_cols()))
            {
                return Ok(&self.rows[at]);
            }
            let bucket = row.fingerprint(schema.auto_bucket_cols());
            let value = self.auto_next.get(&bucket).copied().unwrap_or(0);
            let mut row = row;
            row.set_slot(auto, Value::Tag(Tag::new(value, schema.tag_kind())));
            self.append(row)
        } else {
            if let Some(at) = self
                .rows
                .iter()
                .position(|r| row.matches_on(r, schema.key_cols()))
            {
                return Ok(&self.rows[at]);
            }
            if schema.enforce_value_uniqueness()
                && self
                    .rows
                    .iter()
                    .any(|r| row.matches_on(r, schema.required_cols()))
            {
                return Err(Error::UniquenessViolation {
                    table: schema.name().to_string(),
                    message: "another row carries the same mandatory value attributes".to_string(),
                });
            }
            self.append(row)
        }
    }

    /// Insert a row whose key is already stated — the deserialization path.
    /// Never coalesces: an existing equal key is a [`Error::DuplicateKey`],
    /// a mandatory-value collision is a [`Error::UniquenessViolation`], and
    /// success always appends.
    pub fn check_and_add(&mut self, row: Row) -> Result<&Row> {
        self.ensure_resident()?;
        let schema = self.schema.clone();
        for &i in schema.key_cols() {
            if row.slot(i).is_none() {
                return Err(Error::NoSuchRow {
                    message: format!(
                        "{}.{} is unset",
                        schema.name(),
                        schema.column(i).name
                    ),
                });
            }
        }
        if self
            .rows
            .iter()
            .any(|r| row.matches_on(r, schema.key_cols()))
        {
            return Err(Error::DuplicateKey {
                table: schema.name().to_string(),
                key: row.fingerprint(schema.key_cols()),
            });
        }
        if schema.enforce_value_uniqueness()
            && self
                .rows
                .iter()
                .any(|r| row.matches_on(r, schema.required_cols()))
        {
            return Err(Error::UniquenessViolation {
                table: schema.name().to_string(),
                message: "another row carries the same mandatory value attributes".to_string(),
            });
        }
        self.append(row)
    }

    // Single insertion point: freezes the key, keeps the autoincrement
    // counters and the context index consistent with the appended row.
    fn append(&mut self, mut row: Row) -> Result<&Row> {
        let schema = self.schema.clone();
        for &i in schema.key_cols() {
            if row.slot(i).is_none() {
                return Err(Error::NoSuchRow {
                    message: format!(
                        "{}.{} is unset",
                        schema.name(),
                        schema.column(i).name
                    ),
                });
            }
        }
        if let Some(auto) = schema.auto_col() {
            let minted = row
                .slot(auto)
                .and_then(Value::as_tag)
                .map(Tag::value)
                .ok_or_else(|| Error::NoSuchRow {
                    message: format!(
                        "{}.{} is unset",
                        schema.name(),
                        schema.column(auto).name
                    ),
                })?;
            let bucket = row.fingerprint(schema.auto_bucket_cols());
            let next = self.auto_next.entry(bucket).or_insert(0);
            if minted >= *next {
                *next = minted + 1;
            }
        }
        let index = self.rows.len();
        if schema.has_context_index() {
            let time = row.time()?.get();
            let fingerprint = row.fingerprint(schema.context_cols());
            let bucket = self.context.entry(fingerprint).or_default();
            let at = bucket.partition_point(|&(t, _)| t <= time);
            bucket.insert(at, (time, index));
        }
        row.mark_added();
        self.rows.push(row);
        Ok(&self.rows[index])
    }

    // ---- queries -------------------------------------------------------

    /// The first row whose key attributes match, in declared key order.
    pub fn get_row_by_key(&mut self, key: &[Value]) -> Result<Option<&Row>> {
        self.ensure_resident()?;
        let schema = self.schema.clone();
        if key.len() != schema.key_cols().len() {
            return Err(Error::conversion(format!(
                "{}: expected {} key values, got {}",
                schema.name(),
                schema.key_cols().len(),
                key.len()
            )));
        }
        Ok(self
            .rows
            .iter()
            .find(|r| r.values_match(schema.key_cols(), key)))
    }

    /// The first row whose non-autoincrement attributes match, aligned with
    /// [`TableSchema::lookup_cols`].
    pub fn lookup(&mut self, values: &[Value]) -> Result<Option<&Row>> {
        self.ensure_resident()?;
        let schema = self.schema.clone();
        if values.len() != schema.lookup_cols().len() {
            return Err(Error::conversion(format!(
                "{}: expected {} lookup values, got {}",
                schema.name(),
                schema.lookup_cols().len(),
                values.len()
            )));
        }
        Ok(self.rows.iter().find(|r| r.compare_keyless(values)))
    }

    /// Every row observed under a context (the key attributes minus the
    /// time attribute), ascending by time regardless of insertion order;
    /// `None` if the context was never observed.
    pub fn get_by_context(&mut self, context: &[Value]) -> Result<Option<Vec<&Row>>> {
        self.ensure_resident()?;
        let schema = self.schema.clone();
        if !schema.has_context_index() {
            return Err(Error::conversion(format!(
                "{}: table has no context index",
                schema.name()
            )));
        }
        if context.len() != schema.context_cols().len() {
            return Err(Error::conversion(format!(
                "{}: expected {} context values, got {}",
                schema.name(),
                schema.context_cols().len(),
                context.len()
            )));
        }
        let fingerprint = context
            .iter()
            .map(Value::to_text)
            .collect::<Vec<_>>()
            .join("|");
        Ok(self
            .context
            .get(&fingerprint)
            .map(|bucket| bucket.iter().map(|&(_, i)| &self.rows[i]).collect()))
    }

    // ---- XML -----------------------------------------------------------

    /// Render the whole table document. A row that raises
    /// [`Error::NoSuchRow`] while being rendered is skipped with a warning;
    /// every other error aborts.
    pub fn to_xml(&mut self) -> Result<String> {
        self.ensure_resident()?;
        let root = format!("{}Table", self.schema.name());
        let mut out = String::new();
        xml::write_declaration(&mut out);
        out.push_str(&format!("<{}>\n", root));
        xml::write_entity(&mut out, &self.entity, "Entity");
        xml::write_entity(&mut out, &self.container_entity, "ContainerEntity");
        for (index, row) in self.rows.iter().enumerate() {
            match row.to_xml() {
                Ok(fragment) => out.push_str(&fragment),
                Err(Error::NoSuchRow { message }) => {
                    warn!(
                        "Skipping row {} of {} during XML emission: {}",
                        index,
                        self.schema.name(),
                        message
                    );
                }
                Err(e) => return Err(e),
            }
        }
        out.push_str(&format!("</{}>\n", root));
        Ok(out)
    }

    /// Ingest a whole table document. The root tag and both entity blocks
    /// are validated before any row is parsed; rows go through
    /// [`Table::check_and_add`].
    pub fn from_xml(&mut self, doc: &str) -> Result<()> {
        self.with_load_guard(|t| t.from_xml_inner(doc))
    }

    fn from_xml_inner(&mut self, doc: &str) -> Result<()> {
        let root = format!("{}Table", self.schema.name());
        let mut scanner = xml::Scanner::new(doc);
        scanner.expect_declaration()?;
        scanner.expect_open(&root)?;
        let entity = xml::parse_entity(&mut scanner, "Entity")?;
        let container_entity = xml::parse_entity(&mut scanner, "ContainerEntity")?;
        let schema = self.schema.clone();
        let mut parsed = Vec::new();
        while let Some(fragment) = scanner.next_element("row")? {
            parsed.push(Row::from_xml(fragment, &schema)?);
        }
        scanner.expect_close(&root)?;
        self.entity = entity;
        self.container_entity = container_entity;
        for row in parsed {
            self.check_and_add(row)?;
        }
        Ok(())
    }

    // ---- MIME / binary -------------------------------------------------

    /// The table's binary form inside the MIME envelope.
    pub fn to_mime(&mut self) -> Result<Bytes> {
        self.ensure_resident()?;
        let mut payload = Vec::new();
        let mut writer = BinWriter::new(&mut payload, mime::MIME_BYTE_ORDER);
        writer.write_entity(&self.entity)?;
        writer.write_entity(&self.container_entity)?;
        writer.write_int(self.rows.len() as i32)?;
        for row in &self.rows {
            row.to_bin(&mut writer)?;
        }
        drop(writer);
        Ok(mime::build(&self.entity, &self.container_entity, &payload))
    }

    /// Ingest a MIME document. Fails with a conversion error before any
    /// mutation when the binary part marker is absent.
    pub fn set_from_mime(&mut self, msg: &[u8]) -> Result<()> {
        self.with_load_guard(|t| t.set_from_mime_inner(msg))
    }

    fn set_from_mime_inner(&mut self, msg: &[u8]) -> Result<()> {
        let payload = mime::binary_part(msg)?;
        let mut reader = BinReader::new(Cursor::new(payload), mime::MIME_BYTE_ORDER);
        let entity = reader.read_entity()?;
        let container_entity = reader.read_entity()?;
        let count = reader.read_int()?;
        if count < 0 {
            return Err(Error::malformed(format!("negative row count {}", count)));
        }
        let schema = self.schema.clone();
        let mut parsed = Vec::with_capacity(count as usize);
        for _ in 0..count {
            parsed.push(Row::from_bin(&mut reader, &schema)?);
        }
        self.entity = entity;
        self.container_entity = container_entity;
        for row in parsed {
            self.check_and_add(row)?;
        }
        Ok(())
    }

    // ---- file persistence ----------------------------------------------

    fn file_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.{}", self.schema.name(), self.format.extension()))
    }

    /// Write `<TableName>.xml` or `<TableName>.bin` under `dir`, chosen by
    /// the table's format flag.
    pub fn to_file(&mut self, dir: &Path) -> Result<()> {
        self.ensure_resident()?;
        fs::create_dir_all(dir).map_err(|e| {
            Error::conversion(format!("cannot create {}: {}", dir.display(), e))
        })?;
        let path = self.file_path(dir);
        match self.format {
            FileFormat::Xml => {
                let doc = self.to_xml()?;
                fs::write(&path, doc)
            }
            FileFormat::Binary => {
                let msg = self.to_mime()?;
                fs::write(&path, &msg)
            }
        }
        .map_err(|e| Error::conversion(format!("cannot write {}: {}", path.display(), e)))?;
        info!("Wrote table {} to {:?}", self.schema.name(), path);
        Ok(())
    }

    /// Read the table back from `dir`, same file choice as
    /// [`Table::to_file`].
    pub fn set_from_file(&mut self, dir: &Path) -> Result<()> {
        self.with_load_guard(|t| {
            let path = t.file_path(dir);
            debug!("Reading table {} from {:?}", t.schema.name(), path);
            match t.format {
                FileFormat::Xml => {
                    let doc = fs::read_to_string(&path).map_err(|e| {
                        Error::conversion(format!("cannot read {}: {}", path.display(), e))
                    })?;
                    t.from_xml_inner(&doc)
                }
                FileFormat::Binary => {
                    let msg = fs::read(&path).map_err(|e| {
                        Error::conversion(format!("cannot read {}: {}", path.display(), e))
                    })?;
                    t.set_from_mime_inner(&msg)
                }
            }
        })
    }

    // ---- residency -----------------------------------------------------

    // First externally observable access loads the backing file. `Loading`
    // short-circuits: ingestion running under an active load must not
    // trigger another one.
    fn ensure_resident(&mut self) -> Result<()> {
        match self.residency {
            Residency::Resident | Residency::Loading => Ok(()),
            Residency::Empty => {
                let dir = match self.directory.clone() {
                    Some(dir) => dir,
                    None => {
                        self.residency = Residency::Resident;
                        return Ok(());
                    }
                };
                info!(
                    "Lazily loading table {} from {:?}",
                    self.schema.name(),
                    dir
                );
                self.set_from_file(&dir)
            }
        }
    }

    // Runs `f` with residency pinned to `Loading`; `Resident` on success,
    // the prior state on failure.
    fn with_load_guard<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let prev = self.residency;
        self.residency = Residency::Loading;
        let result = f(self);
        self.residency = if result.is_ok() { Residency::Resident } else { prev };
        result
    }
}
