//! # Persistence Tests
//!
//! File round trips in both formats, lazy loading through the container, and
//! the load-once guarantee.

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use obsdm_core::{ColumnType, ContainerConfig, Error, FileFormat, Tag, TagKind, Value};
use obsdm_table::{ColumnSpec, Container, Residency, SchemaFlags, Table, TableSchema};

fn antenna_schema() -> Arc<TableSchema> {
    Arc::new(
        TableSchema::new(
            "Antenna",
            TagKind::Antenna,
            vec![
                ColumnSpec::key("antennaId", ColumnType::Tag),
                ColumnSpec::required("name", ColumnType::Text),
                ColumnSpec::required("position", ColumnType::DoubleSeq),
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

fn container_in(dir: &TempDir, format: FileFormat) -> Container {
    Container::new(ContainerConfig {
        directory: dir.path().to_path_buf(),
        format,
    })
}

fn populate(table: &mut Table) {
    for name in ["DA41", "DA42"] {
        let row = table
            .new_row_with(vec![
                Value::Text(name.to_string()),
                Value::DoubleSeq(vec![2225061.0, -5440061.0, -2481682.0]),
            ])
            .unwrap();
        table.add(row).unwrap();
    }
}

fn names_of(table: &mut Table) -> Vec<String> {
    table
        .get()
        .unwrap()
        .iter()
        .map(|r| r.get("name").unwrap().as_text().unwrap().to_string())
        .collect()
}

#[test]
fn test_xml_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let container = container_in(&dir, FileFormat::Xml);

    let mut writer = container.create_table(antenna_schema());
    populate(&mut writer);
    writer.to_file(container.directory()).unwrap();
    assert!(dir.path().join("Antenna.xml").exists());

    let mut reader = container.open_table(antenna_schema());
    assert_eq!(names_of(&mut reader), ["DA41", "DA42"]);
    assert_eq!(
        reader.get().unwrap()[0].get("position").unwrap(),
        &Value::DoubleSeq(vec![2225061.0, -5440061.0, -2481682.0])
    );
}

#[test]
fn test_binary_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let container = container_in(&dir, FileFormat::Binary);

    let mut writer = container.create_table(antenna_schema());
    populate(&mut writer);
    writer.to_file(container.directory()).unwrap();
    assert!(dir.path().join("Antenna.bin").exists());

    let mut reader = container.open_table(antenna_schema());
    assert_eq!(names_of(&mut reader), ["DA41", "DA42"]);
}

#[test]
fn test_lazy_load_reads_the_file_once() {
    let dir = TempDir::new().unwrap();
    let container = container_in(&dir, FileFormat::Xml);

    let mut writer = container.create_table(antenna_schema());
    populate(&mut writer);
    writer.to_file(container.directory()).unwrap();

    let mut table = container.open_table(antenna_schema());
    assert_eq!(table.residency(), Residency::Empty);

    // first observable access loads the file
    assert_eq!(table.size().unwrap(), 2);
    assert_eq!(table.residency(), Residency::Resident);

    // a second access must not read again: remove the backing file
    fs::remove_file(dir.path().join("Antenna.xml")).unwrap();
    assert_eq!(names_of(&mut table), ["DA41", "DA42"]);
}

#[test]
fn test_open_without_backing_file_starts_fresh() {
    let dir = TempDir::new().unwrap();
    let container = container_in(&dir, FileFormat::Xml);

    let mut table = container.open_table(antenna_schema());
    assert_eq!(table.residency(), Residency::Resident);
    assert_eq!(table.size().unwrap(), 0);
}

#[test]
fn test_set_from_file_without_file_is_conversion() {
    let dir = TempDir::new().unwrap();
    let container = container_in(&dir, FileFormat::Xml);

    let mut table = container.create_table(antenna_schema());
    let err = table.set_from_file(dir.path()).unwrap_err();
    assert!(matches!(err, Error::Conversion { .. }), "{err}");
}

#[test]
fn test_failed_lazy_load_propagates() {
    let dir = TempDir::new().unwrap();
    let container = container_in(&dir, FileFormat::Xml);

    fs::write(dir.path().join("Antenna.xml"), "not xml at all").unwrap();
    let mut table = container.open_table(antenna_schema());
    assert_eq!(table.residency(), Residency::Empty);

    let err = table.get().unwrap_err();
    assert!(matches!(err, Error::Conversion { .. }), "{err}");
}

#[test]
fn test_add_on_lazy_table_loads_first() {
    let dir = TempDir::new().unwrap();
    let container = container_in(&dir, FileFormat::Xml);

    let mut writer = container.create_table(antenna_schema());
    populate(&mut writer);
    writer.to_file(container.directory()).unwrap();

    let mut table = container.open_table(antenna_schema());
    let row = table
        .new_row_with(vec![
            Value::Text("DV01".to_string()),
            Value::DoubleSeq(vec![0.0, 0.0, 0.0]),
        ])
        .unwrap();
    // adding is an observable access: the two persisted rows load first,
    // so the minted tag continues after them
    let minted = *table.add(row).unwrap().get("antennaId").unwrap().as_tag().unwrap();
    assert_eq!(minted, Tag::new(2, TagKind::Antenna));
    assert_eq!(table.size().unwrap(), 3);
}
