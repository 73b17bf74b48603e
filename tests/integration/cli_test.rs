//! Headless runs of the `uwo` binary against the SQLite fixture.

use super::common::{run_uwo, UwoFixture, ZURCHERSTR};

#[tokio::test]
async fn test_variables_prints_preview_and_wall_time() {
    let fixture = UwoFixture::new().await;
    let path = fixture.path().to_string_lossy().to_string();

    let (code, stdout, stderr) = run_uwo(&["variables", "--sqlite-path", &path, "--head", "2"]);

    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("name"));
    assert!(stdout.contains("(showing 2 of 4 rows)"));
    assert!(stdout.contains("Wall time: "));
}

#[tokio::test]
async fn test_series_with_range() {
    let fixture = UwoFixture::new().await;
    let path = fixture.path().to_string_lossy().to_string();

    let (code, stdout, stderr) = run_uwo(&[
        "series",
        ZURCHERSTR,
        "--sqlite-path",
        &path,
        "--start",
        "2020-01-01",
        "--end",
        "2020-02-01",
    ]);

    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("2020-01-15 12:00:00"));
    assert!(!stdout.contains("2020-03-01"));
}

#[test]
fn test_unsupported_backend_exits_with_error() {
    let (code, stdout, stderr) = run_uwo(&["--backend", "7", "variables"]);

    assert_eq!(code, 1);
    assert_eq!(stderr.matches("Unsupported backend: 7").count(), 1, "{stderr}");
    assert!(stdout.contains("Wall time: "));
}

#[test]
fn test_missing_database_file_exits_with_error() {
    let (code, _, stderr) = run_uwo(&["variables", "--sqlite-path", "/nonexistent/uwo.sqlite"]);

    assert_eq!(code, 1);
    assert!(stderr.contains("SQLite database file not found"));
}
