//! # Configuration
//!
//! Configuration for OBSDM containers and their tables.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// On-disk representation of a table: one file per table per container
/// directory, `<TableName>.xml` or `<TableName>.bin`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileFormat {
    #[default]
    Xml,
    Binary,
}

impl FileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Xml => "xml",
            FileFormat::Binary => "bin",
        }
    }
}

/// Container configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Directory holding one file per table.
    pub directory: PathBuf,
    /// Format newly attached tables persist in.
    pub format: FileFormat,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./data"),
            format: FileFormat::Xml,
        }
    }
}
