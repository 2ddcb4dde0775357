use std::fs;

use tempfile::TempDir;
use upload_engine::{ensure_output_dir, AtomicFileWriter};

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_image() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("scan.png", b"\x89PNG first").unwrap();
    assert_eq!(first.file_name().unwrap(), "scan.png");
    assert_eq!(fs::read(&first).unwrap(), b"\x89PNG first");

    let second = writer.write("scan.png", b"\x89PNG second").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"\x89PNG second");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("scan.png", b"data");
    assert!(result.is_err());
    assert!(!file_path.with_file_name("scan.png").exists());
}
