//! # Container
//!
//! The owner of a dataset's tables: supplies the backing directory, its own
//! identity entity, and the binary-vs-XML mode. Tables copy all three at
//! construction, so a container can be dropped independently of the tables
//! it handed out.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use obsdm_core::config::{ContainerConfig, FileFormat};
use obsdm_core::types::Entity;

use crate::schema::TableSchema;
use crate::table::{Residency, Table};

pub struct Container {
    entity: Entity,
    config: ContainerConfig,
}

impl Container {
    pub fn new(config: ContainerConfig) -> Self {
        Self {
            entity: Entity::generate("Container"),
            config,
        }
    }

    /// The container's identity record; every table document embeds it as
    /// the `ContainerEntity` block.
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    pub fn format(&self) -> FileFormat {
        self.config.format
    }

    pub fn set_format(&mut self, format: FileFormat) {
        self.config.format = format;
    }

    /// A fresh, resident table for this schema. Nothing is read or written
    /// until the table is persisted.
    pub fn create_table(&self, schema: Arc<TableSchema>) -> Table {
        Table::new_in(
            schema,
            self.entity.clone(),
            Some(self.config.directory.clone()),
            self.config.format,
            Residency::Resident,
        )
    }

    /// Attach a table to its backing file. When the file exists the table
    /// starts empty and loads lazily on first access; otherwise it starts
    /// fresh.
    pub fn open_table(&self, schema: Arc<TableSchema>) -> Table {
        let path = self.config.directory.join(format!(
            "{}.{}",
            schema.name(),
            self.config.format.extension()
        ));
        let residency = if path.exists() {
            debug!("Attaching table {} to {:?}", schema.name(), path);
            Residency::Empty
        } else {
            Residency::Resident
        };
        Table::new_in(
            schema,
            self.entity.clone(),
            Some(self.config.directory.clone()),
            self.config.format,
            residency,
        )
    }
}
