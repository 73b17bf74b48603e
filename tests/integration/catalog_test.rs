//! Catalog operations against a SQLite UWO database.

use super::common::{UwoFixture, ZURCHERSTR};
use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use uwo_tools::config::DatabaseConfig;
use uwo_tools::db::{Table, Value};
use uwo_tools::error::UwoError;
use uwo_tools::query::{SensorCatalog, TimeRangeFilter};

fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn floats(table: &Table, column: &str) -> Vec<f64> {
    table
        .column(column)
        .map(|v| v.as_f64().unwrap())
        .collect()
}

fn strings(table: &Table, column: &str) -> Vec<String> {
    table
        .column(column)
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

fn timestamps(table: &Table, column: &str) -> Vec<Option<NaiveDateTime>> {
    table.column(column).map(Value::as_timestamp).collect()
}

#[tokio::test]
async fn test_list_variables() {
    let fixture = UwoFixture::new().await;
    let table = fixture.catalog().list_variables().await.unwrap();

    assert_eq!(table.column_names(), vec!["name", "unit", "description"]);
    assert_eq!(table.len(), 4);

    let names: HashSet<String> = strings(&table, "name").into_iter().collect();
    assert!(names.contains("flow_rate"));
    assert!(names.contains("conductivity"));
}

#[tokio::test]
async fn test_list_sites_for_variable_is_distinct() {
    let fixture = UwoFixture::new().await;
    let table = fixture
        .catalog()
        .list_sites_for_variable("flow_rate")
        .await
        .unwrap();

    assert_eq!(table.column_names(), vec!["name", "site_id"]);

    let mut site_ids: Vec<i64> = table
        .column("site_id")
        .map(|v| match v {
            Value::Int(id) => *id,
            other => panic!("Expected Int for site_id, got {other:?}"),
        })
        .collect();
    site_ids.sort_unstable();
    // Site 1 has two flow sources with several signals each.
    assert_eq!(site_ids, vec![1, 2]);
}

#[tokio::test]
async fn test_list_sites_for_variable_with_single_site() {
    let fixture = UwoFixture::new().await;
    let table = fixture
        .catalog()
        .list_sites_for_variable("temperature")
        .await
        .unwrap();

    assert_eq!(strings(&table, "name"), vec!["rub128basin_usterstr"]);
}

#[tokio::test]
async fn test_list_sites_for_unknown_variable_is_empty_with_columns() {
    let fixture = UwoFixture::new().await;
    let catalog = fixture.catalog();

    for variable in ["no_such_variable", "conductivity"] {
        let table = catalog.list_sites_for_variable(variable).await.unwrap();
        assert!(table.is_empty(), "{variable} should have no sites");
        assert_eq!(table.column_names(), vec!["name", "site_id"]);
    }
}

#[tokio::test]
async fn test_list_sensors_for_site() {
    let fixture = UwoFixture::new().await;
    let table = fixture
        .catalog()
        .list_sensors_for_site("bf_f12_47a")
        .await
        .unwrap();

    assert_eq!(table.column_names(), vec!["source_id", "name", "description"]);

    let mut names = strings(&table, "name");
    names.sort();
    assert_eq!(
        names,
        vec!["bf_f12_47a_backup", "bf_f12_47a_level", "bf_f12_47a_zurcherstr"]
    );
}

#[tokio::test]
async fn test_list_sensors_for_site_without_signals() {
    let fixture = UwoFixture::new().await;
    let catalog = fixture.catalog();

    // unused_sensor belongs to empty_site but never recorded a signal.
    let table = catalog.list_sensors_for_site("empty_site").await.unwrap();
    assert!(table.is_empty());
    assert_eq!(table.column_names(), vec!["source_id", "name", "description"]);

    let table = catalog.list_sensors_for_site("no_such_site").await.unwrap();
    assert!(table.is_empty());
}

#[tokio::test]
async fn test_time_series_within_inclusive_bounds_ascending() {
    let fixture = UwoFixture::new().await;
    let filter = TimeRangeFilter::between("2020-01-01", "2020-02-01");
    let table = fixture
        .catalog()
        .get_time_series(ZURCHERSTR, &filter)
        .await
        .unwrap();

    assert_eq!(table.column_names(), vec!["timestamp", "value"]);
    assert_eq!(table.columns[0].data_type, "TIMESTAMP");
    // 2020-02-01 00:00:00 lies on the end bound and is included.
    assert_eq!(floats(&table, "value"), vec![2.0, 3.0, 4.0, 4.5]);

    let times: Vec<NaiveDateTime> = timestamps(&table, "timestamp")
        .into_iter()
        .map(Option::unwrap)
        .collect();
    assert_eq!(times[0], ts(2020, 1, 1, 0, 0));
    assert_eq!(times[3], ts(2020, 2, 1, 0, 0));
    assert!(times.windows(2).all(|w| w[0] < w[1]));
    assert!(times
        .iter()
        .all(|t| *t >= ts(2020, 1, 1, 0, 0) && *t <= ts(2020, 2, 1, 0, 0)));
}

#[tokio::test]
async fn test_time_series_without_bounds_returns_everything() {
    let fixture = UwoFixture::new().await;
    let table = fixture
        .catalog()
        .get_time_series(ZURCHERSTR, &TimeRangeFilter::new())
        .await
        .unwrap();

    assert_eq!(table.len(), 8);
    assert_eq!(
        floats(&table, "value"),
        vec![7.0, 1.0, 2.0, 3.0, 4.0, 4.5, 5.0, 6.0]
    );

    // The empty timestamp string cannot be parsed.
    let times = timestamps(&table, "timestamp");
    assert_eq!(times[0], None);
    assert!(table.rows[0][0].is_null());

    let parsed: Vec<NaiveDateTime> = times.into_iter().flatten().collect();
    assert_eq!(parsed.len(), 7);
    assert!(parsed.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(parsed.last(), Some(&ts(2020, 3, 1, 0, 0)));
}

#[tokio::test]
async fn test_time_series_with_start_only() {
    let fixture = UwoFixture::new().await;
    let table = fixture
        .catalog()
        .get_time_series(ZURCHERSTR, &TimeRangeFilter::new().start("2020-02-01"))
        .await
        .unwrap();

    // A bare start date means midnight, so 2020-02-01 00:00:00 is included.
    assert_eq!(floats(&table, "value"), vec![4.5, 5.0, 6.0]);
}

#[tokio::test]
async fn test_time_series_with_end_only() {
    let fixture = UwoFixture::new().await;
    let table = fixture
        .catalog()
        .get_time_series(ZURCHERSTR, &TimeRangeFilter::new().end("2020-01-01"))
        .await
        .unwrap();

    // A bare end date means midnight: 2020-01-01 00:00:00 is included. The
    // empty timestamp text sorts before every bound.
    assert_eq!(floats(&table, "value"), vec![7.0, 1.0, 2.0]);
}

#[tokio::test]
async fn test_time_series_limit_keeps_earliest_rows() {
    let fixture = UwoFixture::new().await;
    let filter = TimeRangeFilter::new().start("2020-01-01").limit(2);
    let table = fixture
        .catalog()
        .get_time_series(ZURCHERSTR, &filter)
        .await
        .unwrap();

    assert_eq!(floats(&table, "value"), vec![2.0, 3.0]);
}

#[tokio::test]
async fn test_time_series_of_unknown_source_is_empty_with_columns() {
    let fixture = UwoFixture::new().await;
    let table = fixture
        .catalog()
        .get_time_series("no_such_sensor", &TimeRangeFilter::new())
        .await
        .unwrap();

    assert!(table.is_empty());
    assert_eq!(table.column_names(), vec!["timestamp", "value"]);
}

#[tokio::test]
async fn test_source_names_are_bound_not_spliced() {
    let fixture = UwoFixture::new().await;
    let catalog = fixture.catalog();

    let table = catalog
        .get_time_series("x' OR '1'='1", &TimeRangeFilter::new())
        .await
        .unwrap();
    assert!(table.is_empty());

    let table = catalog
        .list_sensors_for_site("'; DROP TABLE signal; --")
        .await
        .unwrap();
    assert!(table.is_empty());

    let table = catalog.get_flow_rate_time_series().await.unwrap();
    assert_eq!(table.len(), 12);
}

#[tokio::test]
async fn test_meta_data_without_bounds() {
    let fixture = UwoFixture::new().await;
    let table = fixture
        .catalog()
        .get_meta_data(ZURCHERSTR, &TimeRangeFilter::new())
        .await
        .unwrap();

    assert_eq!(
        table.column_names(),
        vec![
            "timestamp_start",
            "timestamp_end",
            "comment",
            "additional_meta_info",
            "sensor_name"
        ]
    );
    // Rows from both meta_data entries of the source.
    assert_eq!(table.len(), 4);

    assert_eq!(
        timestamps(&table, "timestamp_start"),
        vec![
            Some(ts(2020, 7, 25, 0, 0)),
            Some(ts(2020, 8, 3, 10, 0)),
            Some(ts(2020, 9, 15, 8, 0)),
            Some(ts(2020, 10, 5, 0, 0)),
        ]
    );
    assert_eq!(
        timestamps(&table, "timestamp_end"),
        vec![
            Some(ts(2020, 8, 10, 0, 0)),
            None,
            Some(ts(2020, 9, 20, 0, 0)),
            None,
        ]
    );

    let comments: Vec<&Value> = table.column("comment").collect();
    assert_eq!(comments[0], &Value::from("Battery replaced"));
    assert!(comments[3].is_null());

    assert!(table
        .column("sensor_name")
        .all(|v| v.as_str() == Some(ZURCHERSTR)));
}

#[tokio::test]
async fn test_meta_data_filters_on_timestamp_start() {
    let fixture = UwoFixture::new().await;
    let filter = TimeRangeFilter::between("2020-08-01", "2020-10-01");
    let table = fixture
        .catalog()
        .get_meta_data(ZURCHERSTR, &filter)
        .await
        .unwrap();

    // The 2020-07-25 entry ends inside the range but starts before it.
    assert_eq!(
        strings(&table, "comment"),
        vec![
            "Sensor cleaned, no findings",
            "Venturi clogged, flow signal drifts upwards"
        ]
    );

    let starts: Vec<NaiveDateTime> = timestamps(&table, "timestamp_start")
        .into_iter()
        .map(Option::unwrap)
        .collect();
    assert!(starts.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_meta_data_limit() {
    let fixture = UwoFixture::new().await;
    let table = fixture
        .catalog()
        .get_meta_data(ZURCHERSTR, &TimeRangeFilter::new().limit(2))
        .await
        .unwrap();

    assert_eq!(
        strings(&table, "comment"),
        vec!["Battery replaced", "Sensor cleaned, no findings"]
    );
}

#[tokio::test]
async fn test_meta_data_of_other_source_is_separate() {
    let fixture = UwoFixture::new().await;
    let table = fixture
        .catalog()
        .get_meta_data("rub128_flow", &TimeRangeFilter::new())
        .await
        .unwrap();

    assert_eq!(strings(&table, "comment"), vec!["Rain gauge check"]);
    assert_eq!(strings(&table, "sensor_name"), vec!["rub128_flow"]);
}

#[tokio::test]
async fn test_meta_data_of_unknown_source_keeps_columns() {
    let fixture = UwoFixture::new().await;
    let table = fixture
        .catalog()
        .get_meta_data("unused_sensor", &TimeRangeFilter::new())
        .await
        .unwrap();

    assert!(table.is_empty());
    assert_eq!(table.column_names().last(), Some(&"sensor_name"));
}

#[tokio::test]
async fn test_flow_rate_time_series() {
    let fixture = UwoFixture::new().await;
    let table = fixture.catalog().get_flow_rate_time_series().await.unwrap();

    assert_eq!(
        table.column_names(),
        vec![
            "signal_id",
            "timestamp",
            "value",
            "source_name",
            "site_name",
            "variable_name"
        ]
    );
    assert_eq!(table.len(), 12);
    assert!(table
        .column("variable_name")
        .all(|v| v.as_str() == Some("flow_rate")));

    let sources: HashSet<String> = strings(&table, "source_name").into_iter().collect();
    assert_eq!(
        sources,
        HashSet::from([
            "bf_f12_47a_zurcherstr".to_string(),
            "bf_f12_47a_backup".to_string(),
            "rub128_flow".to_string(),
        ])
    );

    // Timestamps are returned as stored and ordered by the backend.
    let raw = strings(&table, "timestamp");
    assert_eq!(raw[0], "");
    assert!(raw.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_missing_database_file_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = SensorCatalog::from_config(DatabaseConfig::sqlite(dir.path().join("missing.sqlite")));

    let err = catalog.list_variables().await.unwrap_err();
    assert!(matches!(err, UwoError::Connection(_)));
    assert!(!dir.path().join("missing.sqlite").exists());
}

#[tokio::test]
async fn test_unsupported_backend_is_reported_before_connecting() {
    let fixture = UwoFixture::new().await;
    let config = DatabaseConfig {
        backend: 3,
        ..fixture.config()
    };

    let err = SensorCatalog::from_config(config)
        .get_time_series(ZURCHERSTR, &TimeRangeFilter::new())
        .await
        .unwrap_err();
    assert!(matches!(err, UwoError::UnsupportedBackend(3)));
}

#[tokio::test]
async fn test_database_is_opened_read_only() {
    let fixture = UwoFixture::new().await;
    let catalog = fixture.catalog();

    let err = catalog
        .executor()
        .run_sql("DELETE FROM signal")
        .await
        .unwrap_err();
    assert!(matches!(err, UwoError::Query(_)));

    let table = catalog
        .get_time_series(ZURCHERSTR, &TimeRangeFilter::new())
        .await
        .unwrap();
    assert_eq!(table.len(), 8);
}

#[tokio::test]
async fn test_failed_query_does_not_poison_later_calls() {
    let fixture = UwoFixture::new().await;
    let catalog = fixture.catalog();

    let err = catalog
        .executor()
        .run_sql("SELECT * FROM no_such_table")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no_such_table"));

    assert_eq!(catalog.list_variables().await.unwrap().len(), 4);
}
