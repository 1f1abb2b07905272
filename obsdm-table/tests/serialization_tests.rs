//! # Serialization Tests
//!
//! XML and MIME round trips, envelope validation, and the asymmetric error
//! policy: a row missing a required value is skipped during XML emission but
//! aborts the binary path.

use std::sync::Arc;

use obsdm_core::{ColumnType, ContainerConfig, Error, Tag, TagKind, Value};
use obsdm_table::{ColumnSpec, Container, Row, SchemaFlags, Table, TableSchema};

fn antenna_schema() -> Arc<TableSchema> {
    Arc::new(
        TableSchema::new(
            "Antenna",
            TagKind::Antenna,
            vec![
                ColumnSpec::key("antennaId", ColumnType::Tag),
                ColumnSpec::required("name", ColumnType::Text),
                ColumnSpec::required("position", ColumnType::DoubleSeq),
                ColumnSpec::required("antennaType", ColumnType::Enum),
                ColumnSpec::optional("dishDiameter", ColumnType::Double),
            ],
            SchemaFlags {
                autoincrement: Some("antennaId".to_string()),
                ..Default::default()
            },
        )
        .unwrap(),
    )
}

fn populated_table(container: &Container) -> Table {
    let mut table = container.create_table(antenna_schema());
    for (name, diameter) in [("DA41", Some(12.0)), ("DA42", None), ("DV01", Some(7.5))] {
        let mut row = table
            .new_row_with(vec![
                Value::Text(name.to_string()),
                Value::DoubleSeq(vec![1.0, -2.5, 3.25]),
                Value::Enum("MOUNT_A".to_string()),
            ])
            .unwrap();
        if let Some(d) = diameter {
            row.set("dishDiameter", Value::Double(d)).unwrap();
        }
        table.add(row).unwrap();
    }
    table
}

fn assert_same_rows(a: &[Row], b: &[Row]) {
    assert_eq!(a.len(), b.len());
    let schema = antenna_schema();
    for (left, right) in a.iter().zip(b) {
        for col in schema.columns() {
            assert_eq!(
                left.get_opt(&col.name),
                right.get_opt(&col.name),
                "column '{}' differs",
                col.name
            );
        }
    }
}

mod xml_tests {
    use super::*;

    #[test]
    fn test_xml_round_trip() {
        let container = Container::new(ContainerConfig::default());
        let mut source = populated_table(&container);
        let doc = source.to_xml().unwrap();

        let mut target = container.create_table(antenna_schema());
        target.from_xml(&doc).unwrap();

        assert_eq!(target.entity(), source.entity());
        let expected: Vec<Row> = source.get().unwrap().iter().map(Row::duplicate).collect();
        assert_same_rows(&expected, target.get().unwrap());
    }

    #[test]
    fn test_envelope_shape() {
        let container = Container::new(ContainerConfig::default());
        let mut table = populated_table(&container);
        let doc = table.to_xml().unwrap();

        assert!(doc.starts_with("<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>"));
        assert!(doc.contains("<AntennaTable>"));
        assert!(doc.contains("</AntennaTable>"));
        assert!(doc.contains("<Entity entityId=\"uid://"));
        assert!(doc.contains("<ContainerEntity entityId=\"uid://"));
        // optional attribute present twice, absent once
        assert_eq!(doc.matches("<dishDiameter>").count(), 2);
        assert_eq!(doc.matches("<row>").count(), 3);
    }

    #[test]
    fn test_emission_skips_row_missing_required_value() {
        let container = Container::new(ContainerConfig::default());
        let mut table = populated_table(&container);
        table
            .row_mut(1)
            .unwrap()
            .expect("row 1 exists")
            .clear("name")
            .unwrap();

        let doc = table.to_xml().unwrap();
        assert_eq!(doc.matches("<row>").count(), 2);

        let mut target = container.create_table(antenna_schema());
        target.from_xml(&doc).unwrap();
        let names: Vec<&str> = target
            .get()
            .unwrap()
            .iter()
            .map(|r| r.get("name").unwrap().as_text().unwrap())
            .collect();
        assert_eq!(names, ["DA41", "DV01"]);
    }

    #[test]
    fn test_root_tag_is_validated() {
        let container = Container::new(ContainerConfig::default());
        let mut source = populated_table(&container);
        let doc = source.to_xml().unwrap();

        let other_schema = Arc::new(
            TableSchema::new(
                "Station",
                TagKind::Station,
                vec![
                    ColumnSpec::key("stationId", ColumnType::Tag),
                    ColumnSpec::required("name", ColumnType::Text),
                ],
                SchemaFlags::default(),
            )
            .unwrap(),
        );
        let mut target = container.create_table(other_schema);
        let err = target.from_xml(&doc).unwrap_err();
        assert!(matches!(err, Error::Conversion { .. }), "{err}");
    }

    #[test]
    fn test_missing_container_entity_is_rejected() {
        let container = Container::new(ContainerConfig::default());
        let mut source = populated_table(&container);
        let doc = source.to_xml().unwrap();
        let broken: String = doc
            .lines()
            .filter(|line| !line.contains("<ContainerEntity"))
            .collect::<Vec<_>>()
            .join("\n");

        let mut target = container.create_table(antenna_schema());
        let err = target.from_xml(&broken).unwrap_err();
        assert!(matches!(err, Error::Conversion { .. }), "{err}");
        assert_eq!(target.size().unwrap(), 0);
    }

    #[test]
    fn test_text_escaping_round_trips() {
        let container = Container::new(ContainerConfig::default());
        let mut table = container.create_table(antenna_schema());
        let row = table
            .new_row_with(vec![
                Value::Text("a<b & c>\"d\"".to_string()),
                Value::DoubleSeq(vec![0.0]),
                Value::Enum("MOUNT_A".to_string()),
            ])
            .unwrap();
        table.add(row).unwrap();
        let doc = table.to_xml().unwrap();

        let mut target = container.create_table(antenna_schema());
        target.from_xml(&doc).unwrap();
        assert_eq!(
            target.get().unwrap()[0].get("name").unwrap(),
            &Value::Text("a<b & c>\"d\"".to_string())
        );
    }
}

mod mime_tests {
    use super::*;

    #[test]
    fn test_mime_round_trip() {
        let container = Container::new(ContainerConfig::default());
        let mut source = populated_table(&container);
        let msg = source.to_mime().unwrap();

        let mut target = container.create_table(antenna_schema());
        target.set_from_mime(&msg).unwrap();

        assert_eq!(target.entity(), source.entity());
        let expected: Vec<Row> = source.get().unwrap().iter().map(Row::duplicate).collect();
        assert_same_rows(&expected, target.get().unwrap());
    }

    #[test]
    fn test_envelope_structure() {
        let container = Container::new(ContainerConfig::default());
        let mut table = populated_table(&container);
        let msg = table.to_mime().unwrap();
        let text = String::from_utf8_lossy(&msg);

        assert!(text.starts_with("MIME-Version: 1.0\n"));
        assert!(text.contains("Content-Description: Correlator\n"));
        assert!(text.contains("<ExecBlockUID>"));
        assert!(text.contains("Content-Type: binary/octet-stream\nContent-ID: <content.bin>\n\n"));
        assert!(text.trim_end().ends_with("--MIME_boundary--"));
    }

    #[test]
    fn test_corrupted_marker_leaves_table_unmodified() {
        let container = Container::new(ContainerConfig::default());
        let mut source = populated_table(&container);
        let mut msg = source.to_mime().unwrap().to_vec();

        let marker = b"binary/octet-stream";
        let at = msg
            .windows(marker.len())
            .position(|w| w == marker)
            .expect("marker present");
        msg[at + marker.len() - 1] = b'n';

        let mut target = container.create_table(antenna_schema());
        let err = target.set_from_mime(&msg).unwrap_err();
        assert!(matches!(err, Error::Conversion { .. }), "{err}");
        assert_eq!(target.size().unwrap(), 0);
    }

    #[test]
    fn test_truncated_payload_is_malformed() {
        let container = Container::new(ContainerConfig::default());
        let mut source = populated_table(&container);
        let msg = source.to_mime().unwrap();
        let truncated = &msg[..msg.len() - 64];

        let mut target = container.create_table(antenna_schema());
        let err = target.set_from_mime(truncated).unwrap_err();
        assert!(matches!(err, Error::MalformedStream { .. }), "{err}");
    }

    #[test]
    fn test_binary_emission_aborts_on_missing_required_value() {
        let container = Container::new(ContainerConfig::default());
        let mut table = populated_table(&container);
        table
            .row_mut(1)
            .unwrap()
            .expect("row 1 exists")
            .clear("name")
            .unwrap();

        // the XML path skips such a row; the binary path must not
        let err = table.to_mime().unwrap_err();
        assert!(matches!(err, Error::NoSuchRow { .. }), "{err}");
    }

    #[test]
    fn test_mime_restores_autoincrement_counter() {
        let container = Container::new(ContainerConfig::default());
        let mut source = populated_table(&container);
        let msg = source.to_mime().unwrap();

        let mut target = container.create_table(antenna_schema());
        target.set_from_mime(&msg).unwrap();
        let row = target
            .new_row_with(vec![
                Value::Text("PM03".to_string()),
                Value::DoubleSeq(vec![4.0]),
                Value::Enum("MOUNT_A".to_string()),
            ])
            .unwrap();
        let tag = *target.add(row).unwrap().get("antennaId").unwrap().as_tag().unwrap();
        assert_eq!(tag, Tag::new(3, TagKind::Antenna));
    }
}
