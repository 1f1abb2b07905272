//! # OBSDM Tables
//!
//! Schema-driven metadata tables for an astronomical observation dataset.
//! One generic engine replaces per-table duplicated code: a schema
//! descriptor drives key uniqueness, autoincrement identifier assignment
//! with deduplication, an optional time-ordered context index, and two
//! lossless wire formats.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Write Path                            │
//! │                                                             │
//! │  new_row ──> add / check_and_add ──> Table ──> to_xml       │
//! │                 (uniqueness,           │       to_mime      │
//! │                  autoincrement)        ▼       to_file      │
//! │                                  context index              │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Read Path                             │
//! │                                                             │
//! │  Container ──> open_table ──> first access ──> lazy load    │
//! │                                  │                          │
//! │                                  ▼                          │
//! │                    get / lookup / get_by_context            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod container;
mod mime;
pub mod row;
pub mod schema;
pub mod table;
mod xml;

pub use container::Container;
pub use row::Row;
pub use schema::{ColumnRole, ColumnSpec, SchemaFlags, TableSchema};
pub use table::{Residency, Table};
