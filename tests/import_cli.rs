use std::fs;
use std::process::Command;

const BINARY: &str = env!("CARGO_BIN_EXE_gather_tiled");

#[test]
fn import_without_remote_assets_writes_tiled_map() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let map_path = temp_dir.path().join("lobby.json");
    let output_dir = temp_dir.path().join("out");
    fs::write(&map_path, r#"{ "dimensions": [40, 30], "objects": [] }"#).expect("write map json");

    let output = Command::new(BINARY)
        .arg("import")
        .arg(&map_path)
        .arg(&output_dir)
        .arg("--cache-dir")
        .arg(temp_dir.path().join("cache"))
        .output()
        .expect("run gather_tiled");

    assert!(output.status.success(), "gather_tiled failed: {}", String::from_utf8_lossy(&output.stderr));
    let generated = fs::read_to_string(output_dir.join("lobby.tmj")).expect("read generated map");
    assert!(generated.contains("\"objectgroup\""), "map should contain the objects layer");
    assert!(generated.contains("\"width\": 40"), "map width should come from dimensions");
    assert!(temp_dir.path().join("cache").join("cache.json").is_file(), "cache index is flushed after a run");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("CLI overrides applied: cache_root"), "overrides should be reported: {stderr}");
}

#[test]
fn malformed_map_fails_before_any_fetch() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let map_path = temp_dir.path().join("broken.json");
    fs::write(&map_path, r#"{ "backgroundImagePath": "http://127.0.0.1:9/bg.png" }"#).expect("write map json");

    let output = Command::new(BINARY)
        .arg("import")
        .arg(&map_path)
        .arg(temp_dir.path().join("out"))
        .arg("--cache-dir")
        .arg(temp_dir.path().join("cache"))
        .output()
        .expect("run gather_tiled");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("dimensions"), "stderr should name the missing field: {stderr}");
    assert!(!temp_dir.path().join("cache").exists(), "nothing is cached for a rejected map");
}

#[test]
fn bad_arguments_exit_with_usage_error() {
    let status = Command::new(BINARY)
        .args(["import", "a.json", "out", "--tile-px", "zero"])
        .status()
        .expect("run gather_tiled");
    assert_eq!(status.code(), Some(2));
}
