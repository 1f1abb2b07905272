//! # OBSDM Core
//!
//! This crate provides the fundamental building blocks for OBSDM, the
//! metadata-table engine of an astronomical observation dataset:
//! - Identifier and identity types (tags, entities)
//! - The polymorphic attribute value
//! - The endian-aware attribute codec
//! - Error types
//! - Configuration
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   obsdm-core                    │
//! ├─────────────────────────────────────────────────┤
//! │  • types         - Tag, ArrayTime, Entity      │
//! │  • value         - polymorphic attribute value │
//! │  • serialization - endian-aware codec          │
//! │  • error         - error handling              │
//! │  • config        - file format & container     │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod serialization;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use config::{ContainerConfig, FileFormat};
pub use error::{Error, Result};
pub use serialization::{BinReader, BinWriter, ByteOrder};
pub use types::{ArrayTime, Entity, EntityId, Tag, TagKind};
pub use value::{ColumnType, Value};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
