use std::io::Write;

use super::file_io::*;

/// Passed: "<tmp>/files/data.txt"
/// Expected: "<tmp>/files" created, the file itself not
#[test]
fn test_create_parent_dir_for_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let file_path = temp_dir.path().join("files").join("data.txt");

    create_parent_dir_if_not_exist(&file_path).unwrap();

    assert!(file_path.parent().unwrap().is_dir());
    assert!(!file_path.exists());
}

#[test]
fn test_open_file_for_append_keeps_existing_content() {
    let temp_dir = tempfile::tempdir().unwrap();
    let log_path = temp_dir.path().join("logs").join("hub.log");

    {
        let mut file = open_file_for_append(&log_path).unwrap();
        writeln!(file, "first").unwrap();
    }
    {
        let mut file = open_file_for_append(&log_path).unwrap();
        writeln!(file, "second").unwrap();
    }

    let content = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(content, "first\nsecond\n");
}
