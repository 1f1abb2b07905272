//! # MIME Envelope Codec
//!
//! Wraps a table's binary form in the fixed multipart text/binary envelope:
//! a `Multipart/Related` header block, an XML preamble part carrying the
//! container document id, and one `binary/octet-stream` part holding the
//! payload. Parsing locates the binary part by literal marker search and
//! fails with a conversion error when the marker is absent; everything after
//! the marker is handed to the binary reader, which consumes exactly what
//! the payload declares.

use bytes::Bytes;

use obsdm_core::error::{Error, Result};
use obsdm_core::serialization::ByteOrder;
use obsdm_core::types::Entity;

/// Byte order of the binary part.
pub(crate) const MIME_BYTE_ORDER: ByteOrder = ByteOrder::Little;

const BINARY_PART_MARKER: &str =
    "Content-Type: binary/octet-stream\nContent-ID: <content.bin>\n\n";

/// Assemble the envelope around an already-encoded payload.
pub(crate) fn build(entity: &Entity, container_entity: &Entity, payload: &[u8]) -> Bytes {
    let header = format!(
        concat!(
            "MIME-Version: 1.0\n",
            "Content-Type: Multipart/Related; boundary='MIME_boundary'; ",
            "type='text/xml'; start='<header.xml>'\n",
            "Content-Description: Correlator\n",
            "alma-uid:{uid}\n",
            "\n",
            "--MIME_boundary\n",
            "Content-Type: text/xml; charset='ISO-8859-1'\n",
            "Content-Transfer-Encoding: 8bit\n",
            "Content-ID: <header.xml>\n",
            "\n",
            "<?xml version='1.0' encoding='ISO-8859-1'?>\n",
            "<ASDMBinaryTable>\n",
            "  <ExecBlockUID> {exec} </ExecBlockUID>\n",
            "</ASDMBinaryTable>\n",
            "--MIME_boundary\n",
        ),
        uid = entity.id,
        exec = container_entity.id,
    );

    let mut out = Vec::with_capacity(header.len() + BINARY_PART_MARKER.len() + payload.len() + 32);
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(BINARY_PART_MARKER.as_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(b"\n--MIME_boundary--\n");
    Bytes::from(out)
}

/// Everything following the binary-part marker.
pub(crate) fn binary_part(msg: &[u8]) -> Result<&[u8]> {
    let marker = BINARY_PART_MARKER.as_bytes();
    let at = find(msg, marker).ok_or_else(|| {
        Error::conversion("MIME document has no binary part marker")
    })?;
    Ok(&msg[at + marker.len()..])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
