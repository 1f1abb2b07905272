//! # Core Types
//!
//! Identifier and identity types shared by every OBSDM table.
//!
//! - [`Tag`]: a typed numeric identifier scoped to an entity kind
//! - [`ArrayTime`]: a point in time as nanoseconds, the distinguished time
//!   attribute of context-indexed tables
//! - [`EntityId`] / [`Entity`]: the identity record distinguishing one table
//!   instance or document from another

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Entity kind discriminator for [`Tag`].
///
/// One variant per table family that mints tags; `NoType` is the kind of a
/// default-constructed tag that was never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TagKind {
    NoType,
    Antenna,
    Station,
    SpectralWindow,
    Feed,
    Pointing,
    CalData,
    SysTemp,
    Scale,
    ExecBlock,
}

impl TagKind {
    pub fn name(self) -> &'static str {
        match self {
            TagKind::NoType => "NoType",
            TagKind::Antenna => "Antenna",
            TagKind::Station => "Station",
            TagKind::SpectralWindow => "SpectralWindow",
            TagKind::Feed => "Feed",
            TagKind::Pointing => "Pointing",
            TagKind::CalData => "CalData",
            TagKind::SysTemp => "SysTemp",
            TagKind::Scale => "Scale",
            TagKind::ExecBlock => "ExecBlock",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "NoType" => Some(TagKind::NoType),
            "Antenna" => Some(TagKind::Antenna),
            "Station" => Some(TagKind::Station),
            "SpectralWindow" => Some(TagKind::SpectralWindow),
            "Feed" => Some(TagKind::Feed),
            "Pointing" => Some(TagKind::Pointing),
            "CalData" => Some(TagKind::CalData),
            "SysTemp" => Some(TagKind::SysTemp),
            "Scale" => Some(TagKind::Scale),
            "ExecBlock" => Some(TagKind::ExecBlock),
            _ => None,
        }
    }
}

/// Typed numeric identifier scoped to an entity kind.
///
/// Ordered by numeric value first (kind breaks ties so the order is total);
/// equal iff both components are equal. The text form is `Kind_value`, e.g.
/// `Antenna_3`, and is what both wire formats carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    value: i64,
    kind: TagKind,
}

impl Tag {
    pub fn new(value: i64, kind: TagKind) -> Self {
        Self { value, kind }
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn kind(&self) -> TagKind {
        self.kind
    }
}

impl Default for Tag {
    fn default() -> Self {
        Self { value: 0, kind: TagKind::NoType }
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value
            .cmp(&other.value)
            .then_with(|| self.kind.cmp(&other.kind))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.name(), self.value)
    }
}

impl FromStr for Tag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, value) = s
            .rsplit_once('_')
            .ok_or_else(|| Error::conversion(format!("invalid tag '{}'", s)))?;
        let kind = TagKind::from_name(kind)
            .ok_or_else(|| Error::conversion(format!("unknown tag kind in '{}'", s)))?;
        let value = value
            .parse::<i64>()
            .map_err(|_| Error::conversion(format!("invalid tag value in '{}'", s)))?;
        Ok(Tag::new(value, kind))
    }
}

/// A point in time as nanoseconds.
///
/// The distinguished time attribute type: context buckets are sorted by it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ArrayTime(pub i64);

impl ArrayTime {
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ArrayTime {
    fn from(ns: i64) -> Self {
        ArrayTime(ns)
    }
}

impl fmt::Display for ArrayTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque document identifier of the form `uid://...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    /// Mint a fresh identifier.
    pub fn generate() -> Self {
        EntityId(format!("uid://X{}", Uuid::new_v4().simple()))
    }

    /// Validate and wrap an existing identifier string.
    pub fn parse(s: &str) -> Result<Self> {
        if !s.starts_with("uid://") || s.len() <= "uid://".len() || s.contains(char::is_whitespace)
        {
            return Err(Error::conversion(format!("invalid entity id '{}'", s)));
        }
        Ok(EntityId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EntityId::parse(s)
    }
}

/// Identity record of one table instance or document: id, type name, version.
///
/// Distinct from row data; both wire formats carry the table's own entity and
/// its container's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub type_name: String,
    pub version: String,
}

impl Entity {
    /// A fresh entity with a generated id.
    pub fn generate(type_name: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(),
            type_name: type_name.into(),
            version: "1".to_string(),
        }
    }

    pub fn new(id: EntityId, type_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            version: version.into(),
        }
    }
}
