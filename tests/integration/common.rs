//! Common test utilities: a small UWO database in a temporary SQLite file.

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use uwo_tools::config::DatabaseConfig;
use uwo_tools::query::SensorCatalog;

/// Source whose comments the classifier examples work on.
pub const ZURCHERSTR: &str = "bf_f12_47a_zurcherstr";

const SCHEMA: &str = r#"
CREATE TABLE variable (
    variable_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    unit TEXT,
    description TEXT
);
CREATE TABLE site (
    site_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT
);
CREATE TABLE source (
    source_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    site_id INTEGER REFERENCES site(site_id)
);
CREATE TABLE signal (
    signal_id INTEGER PRIMARY KEY,
    timestamp TEXT,
    value REAL,
    source_id INTEGER REFERENCES source(source_id),
    site_id INTEGER REFERENCES site(site_id),
    variable_id INTEGER REFERENCES variable(variable_id)
);
CREATE TABLE meta_data (
    meta_data_id INTEGER PRIMARY KEY,
    source_id INTEGER REFERENCES source(source_id)
);
CREATE TABLE meta_data_history (
    meta_data_history_id INTEGER PRIMARY KEY,
    meta_data_id INTEGER REFERENCES meta_data(meta_data_id),
    timestamp_start TEXT,
    timestamp_end TEXT,
    comment TEXT,
    additional_meta_info TEXT
);
"#;

// Signals are inserted out of timestamp order on purpose. Signal 7 carries an
// empty timestamp string, which sorts first and normalizes to null. Signal 15
// sits exactly on the 2020-02-01 bound used by the range tests.
const DATA: &str = r#"
INSERT INTO variable VALUES
    (1, 'flow_rate', 'l/s', 'Flow rate'),
    (2, 'water_level', 'm', 'Water level'),
    (3, 'temperature', 'degC', 'Water temperature'),
    (4, 'conductivity', 'uS/cm', 'Electrical conductivity');

INSERT INTO site VALUES
    (1, 'bf_f12_47a', 'Manhole Zurcherstrasse'),
    (2, 'rub128basin_usterstr', 'Stormwater basin Usterstrasse'),
    (3, 'empty_site', 'Site without sensors');

INSERT INTO source VALUES
    (1, 'bf_f12_47a_zurcherstr', 'Venturi flume', 1),
    (2, 'bf_f12_47a_level', 'Ultrasonic level sensor', 1),
    (3, 'rub128_flow', 'Area velocity sensor', 2),
    (4, 'unused_sensor', 'Never recorded anything', 3),
    (5, 'bf_f12_47a_backup', 'Backup flow sensor', 1);

INSERT INTO signal VALUES
    (1, '2020-01-15 12:00:00', 3.0, 1, 1, 1),
    (2, '2019-12-31 23:55:00', 1.0, 1, 1, 1),
    (3, '2020-01-01 00:00:00', 2.0, 1, 1, 1),
    (4, '2020-02-01 06:00:00', 5.0, 1, 1, 1),
    (5, '2020-01-31 23:55:00', 4.0, 1, 1, 1),
    (6, '2020-03-01 00:00:00', 6.0, 1, 1, 1),
    (7, '', 7.0, 1, 1, 1),
    (8, '2020-01-01 00:00:00', 0.31, 2, 1, 2),
    (9, '2020-01-01 00:05:00', 0.32, 2, 1, 2),
    (10, '2020-01-10 00:00:00', 2.5, 5, 1, 1),
    (11, '2020-01-10 00:05:00', 2.6, 5, 1, 1),
    (12, '2020-01-05 00:00:00', 10.0, 3, 2, 1),
    (13, '2020-01-20 00:00:00', 11.0, 3, 2, 1),
    (14, '2020-01-05 00:00:00', 12.5, 3, 2, 3),
    (15, '2020-02-01 00:00:00', 4.5, 1, 1, 1);

INSERT INTO meta_data VALUES
    (1, 1),
    (2, 3),
    (3, 1);

INSERT INTO meta_data_history VALUES
    (1, 1, '2020-09-15 08:00:00', '2020-09-20 00:00:00', 'Venturi clogged, flow signal drifts upwards', NULL),
    (2, 1, '2020-08-03 10:00:00', '', 'Sensor cleaned, no findings', 'maintenance'),
    (3, 1, '2020-07-25 00:00:00', '2020-08-10 00:00:00', 'Battery replaced', NULL),
    (4, 3, '2020-10-05 00:00:00', NULL, NULL, NULL),
    (5, 2, '2020-08-15 00:00:00', '2020-08-16 00:00:00', 'Rain gauge check', NULL);
"#;

/// A populated UWO database that lives as long as the fixture.
pub struct UwoFixture {
    _dir: TempDir,
    path: PathBuf,
}

impl UwoFixture {
    /// Creates and fills the database file.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_uwo_test.sqlite");

        let mut conn = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .connect()
            .await
            .unwrap();
        sqlx::raw_sql(SCHEMA).execute(&mut conn).await.unwrap();
        sqlx::raw_sql(DATA).execute(&mut conn).await.unwrap();
        conn.close().await.unwrap();

        Self { _dir: dir, path }
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Database settings selecting this file.
    pub fn config(&self) -> DatabaseConfig {
        DatabaseConfig::sqlite(&self.path)
    }

    /// A catalog reading this file.
    pub fn catalog(&self) -> SensorCatalog {
        SensorCatalog::from_config(self.config())
    }
}

/// Path to the shipped prompt plugins.
pub fn shipped_plugins_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("plugins-sk")
}

/// Runs the `uwo` binary and returns exit code, stdout and stderr.
///
/// The config file points into an empty directory so a user config never
/// leaks into the test, and the process runs from that directory so no
/// `.env` file is picked up.
pub fn run_uwo(args: &[&str]) -> (i32, String, String) {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("config.toml");

    let output = Command::new(env!("CARGO_BIN_EXE_uwo"))
        .current_dir(home.path())
        .arg("--config")
        .arg(&config)
        .args(args)
        .env_remove("UWO_BACKEND")
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute uwo");

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (exit_code, stdout, stderr)
}
