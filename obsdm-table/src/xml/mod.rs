//! # XML Element Codec
//!
//! Renders and parses the constrained table document: a fixed declaration,
//! the table's `Entity` block, the owning container's entity block (tag
//! renamed to `ContainerEntity`), then one `<row>` element per row. Thin
//! adapter over the scanner in [`scan`]; it has no grammar of its own.

mod scan;

use obsdm_core::error::{Error, Result};
use obsdm_core::types::{Entity, EntityId};

pub(crate) use scan::Scanner;

pub(crate) const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n";

pub(crate) fn write_declaration(buf: &mut String) {
    buf.push_str(DECLARATION);
}

/// `  <Tag entityId="…" entityTypeName="…" schemaVersion="…"/>`
pub(crate) fn write_entity(buf: &mut String, entity: &Entity, tag: &str) {
    buf.push_str(&format!(
        "  <{} entityId=\"{}\" entityTypeName=\"{}\" schemaVersion=\"{}\"/>\n",
        tag,
        scan::escape(entity.id.as_str()),
        scan::escape(&entity.type_name),
        scan::escape(&entity.version),
    ));
}

/// Parse the next `<Tag …/>` entity block; all three attributes are
/// mandatory.
pub(crate) fn parse_entity(scanner: &mut Scanner<'_>, tag: &str) -> Result<Entity> {
    fn attr<'a>(attrs: &'a [(String, String)], tag: &str, name: &str) -> Result<&'a str> {
        attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| Error::conversion(format!("<{}> is missing attribute '{}'", tag, name)))
    }

    let attrs = scanner.empty_element(tag)?;
    let id = EntityId::parse(attr(&attrs, tag, "entityId")?)?;
    let type_name = attr(&attrs, tag, "entityTypeName")?.to_string();
    let version = attr(&attrs, tag, "schemaVersion")?.to_string();
    Ok(Entity::new(id, type_name, version))
}

/// `    <name>text</name>` with escaping applied.
pub(crate) fn write_element(buf: &mut String, name: &str, text: &str) {
    buf.push_str("    <");
    buf.push_str(name);
    buf.push('>');
    buf.push_str(&scan::escape(text));
    buf.push_str("</");
    buf.push_str(name);
    buf.push_str(">\n");
}

/// The raw inner content of `<name>…</name>` inside a row fragment, if
/// present.
pub(crate) fn element_in<'a>(fragment: &'a str, name: &str) -> Option<&'a str> {
    let open = format!("<{}>", name);
    let close = format!("</{}>", name);
    let start = fragment.find(&open)? + open.len();
    let end = fragment[start..].find(&close)? + start;
    Some(&fragment[start..end])
}

pub(crate) fn unescape_text(text: &str) -> String {
    scan::unescape(text)
}
