//! End-to-end generation into a temporary output root.

use std::fs;

use daogen::{Entity, EntitySchema, SchemaError, case::upper_camel_case};
use daogen_build::{GenerateError, Generator, HEADER, WriteOutcome, generate, scan_file};
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Default, Entity)]
#[allow(non_snake_case)]
struct User {
    #[daogen(tag = "id")]
    ID: i64,
    #[daogen(tag = "name,omitempty")]
    Name: String,
    Email: Option<String>,
}

#[derive(Debug, Default, Entity)]
struct Audit {
    #[daogen(tag = "created")]
    created_at: i64,
    updated_by: String,
}

#[derive(Debug, Default, Entity)]
struct Shipment {
    sku: String,
    #[daogen(embed)]
    audit: Audit,
    quantities: Vec<u32>,
}

#[derive(Debug, Default, Entity)]
struct Clash {
    #[daogen(tag = "sku")]
    code: String,
    sku: String,
}

fn tempdir() -> TempDir {
    init_logging();
    tempfile::tempdir().unwrap()
}

#[test]
fn writes_dao_and_model_under_conventional_dirs() {
    let dir = tempdir();
    let files = generate(&User::default(), dir.path()).unwrap();

    assert_eq!(files.dao, dir.path().join("dao").join("user.rs"));
    assert_eq!(files.model, dir.path().join("model").join("user.rs"));
    assert_eq!(files.dao_outcome, WriteOutcome::Written);

    let dao = fs::read_to_string(&files.dao).unwrap();
    let model = fs::read_to_string(&files.model).unwrap();
    assert!(dao.starts_with(HEADER));
    assert!(model.starts_with(HEADER));
    assert!(dao.contains("pub fn Email(&self) -> Field<Option<String>>"));
    assert!(model.contains("pub struct User {"));
}

#[test]
fn scanning_the_model_reproduces_the_schema() {
    let dir = tempdir();
    for (files, original) in [
        (generate(&User::default(), dir.path()).unwrap(), EntitySchema::of::<User>().unwrap()),
        (generate(&Shipment::default(), dir.path()).unwrap(), EntitySchema::of::<Shipment>().unwrap()),
    ] {
        let scanned = scan_file(&files.model, &upper_camel_case(&original.name)).unwrap();
        assert_eq!(scanned.fields.len(), original.fields.len());
        assert_eq!(scanned.keys().collect::<Vec<_>>(), original.keys().collect::<Vec<_>>());
    }
}

#[test]
fn embedded_fields_are_emitted_flat() {
    let dir = tempdir();
    let files = generate(&Shipment::default(), dir.path()).unwrap();
    assert!(files.model.ends_with("model/shipment.rs"));

    let model = fs::read_to_string(&files.model).unwrap();
    assert!(model.contains("pub struct Shipment {"));
    assert!(model.contains("pub created_at: i64,"));
    assert!(model.contains("#[daogen(tag = \"created\")]"));
    assert!(!model.contains("embed"));

    let dao = fs::read_to_string(&files.dao).unwrap();
    assert!(dao.contains("use crate::model::shipment::Shipment;"));
    assert!(dao.contains("pub fn updated_by(&self) -> Field<String>"));
    assert!(dao.contains("Field::new(\"updated_by\", \"updatedBy\")"));
}

#[test]
fn regeneration_leaves_identical_files_alone() {
    let dir = tempdir();
    generate(&User::default(), dir.path()).unwrap();
    let again = generate(&User::default(), dir.path()).unwrap();
    assert_eq!(again.dao_outcome, WriteOutcome::Unchanged);
    assert_eq!(again.model_outcome, WriteOutcome::Unchanged);
}

#[test]
fn schema_errors_abort_before_any_write() {
    let dir = tempdir();
    let root = dir.path().join("out");
    let err = generate(&Clash::default(), &root).unwrap_err();
    assert!(matches!(err, GenerateError::Schema(SchemaError::DuplicateKey { .. })));
    assert!(!root.exists());
}

#[test]
fn blocked_model_dir_writes_nothing() {
    let dir = tempdir();
    fs::write(dir.path().join("model"), "not a directory").unwrap();

    let err = generate(&User::default(), dir.path()).unwrap_err();
    assert!(matches!(err, GenerateError::CreateDir { .. }));
    assert!(!dir.path().join("dao").join("user.rs").exists());
}

#[test]
fn failed_dao_write_skips_the_model() {
    let dir = tempdir();
    fs::create_dir_all(dir.path().join("dao").join("user.rs")).unwrap();

    let err = generate(&User::default(), dir.path()).unwrap_err();
    assert!(matches!(err, GenerateError::Write { ref path, .. } if path.ends_with("dao/user.rs")));
    assert!(!dir.path().join("model").join("user.rs").exists());
}

#[test]
fn failed_model_write_rolls_back_the_dao() {
    let dir = tempdir();
    fs::create_dir_all(dir.path().join("model").join("user.rs")).unwrap();

    let err = generate(&User::default(), dir.path()).unwrap_err();
    assert!(matches!(err, GenerateError::Write { ref path, .. } if path.ends_with("model/user.rs")));
    assert!(!dir.path().join("dao").join("user.rs").exists());

    fs::write(dir.path().join("dao").join("user.rs"), "// hand edited\n").unwrap();
    generate(&User::default(), dir.path()).unwrap_err();
    assert_eq!(
        fs::read_to_string(dir.path().join("dao").join("user.rs")).unwrap(),
        "// hand edited\n"
    );
}

#[test]
fn rollback_restores_non_utf8_dao_bytes() {
    let dir = tempdir();
    let dao = dir.path().join("dao").join("user.rs");
    fs::create_dir_all(dao.parent().unwrap()).unwrap();
    fs::write(&dao, [0xff, 0xfe, b'\n']).unwrap();
    fs::create_dir_all(dir.path().join("model").join("user.rs")).unwrap();

    let err = generate(&User::default(), dir.path()).unwrap_err();
    assert!(matches!(err, GenerateError::Write { ref path, .. } if path.ends_with("model/user.rs")));
    assert_eq!(fs::read(&dao).unwrap(), [0xff, 0xfe, b'\n']);
}

#[test]
fn custom_layout_from_config() {
    let dir = tempdir();
    let files = Generator::new()
        .output_root(dir.path())
        .dao_dir("access")
        .model_dir("records")
        .model_module("crate::records")
        .generate(&User::default())
        .unwrap();

    assert_eq!(files.dao, dir.path().join("access").join("user.rs"));
    assert_eq!(files.model, dir.path().join("records").join("user.rs"));
    let dao = fs::read_to_string(&files.dao).unwrap();
    assert!(dao.contains("use crate::records::user::User;"));
}
