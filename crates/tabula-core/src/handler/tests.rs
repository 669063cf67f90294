use super::*;
use crate::{
    driver::{CqlType, DriverError, RowSet, SqlType},
    error::ErrorClass,
    obs::sink::ExecKind,
    query::{OrderItem, Predicate},
    record::ETag,
    test_support::{FakeSource, FakeTable, Recorded, RecordingSession, RecordingSink},
};
use std::sync::atomic::Ordering;
use tabula_config::TableConfig;
use uuid::Uuid;

const USER_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

// ----------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------

fn shop(product: &str) -> FakeSource {
    FakeSource::new(product)
        .with_table(
            FakeTable::new("customers")
                .serial_key("id")
                .column("name", SqlType::Varchar)
                .exports("id", "orders", "customer_id"),
        )
        .with_table(
            FakeTable::new("orders")
                .serial_key("id")
                .column("customer_id", SqlType::Integer)
                .column("note", SqlType::Varchar),
        )
        .with_table(FakeTable::new("audit").column("line", SqlType::Varchar))
}

fn rdbms(source: &FakeSource) -> DataHandler {
    DataHandler::rdbms(HandlerConfig::new("shop"), Arc::new(source.clone())).unwrap()
}

fn users() -> Arc<RecordingSession> {
    Arc::new(RecordingSession::new().with_table(
        "users",
        &[
            ("id", CqlType::Uuid),
            ("name", CqlType::Text),
            ("age", CqlType::Int),
        ],
        &["id"],
    ))
}

fn column_family(session: &Arc<RecordingSession>) -> DataHandler {
    let config = HandlerConfig::new("cf").with_keyspace("ks");
    DataHandler::column_family(config, session.clone()).unwrap()
}

fn customer(id: &str) -> Record {
    Record::new().with("id", id)
}

fn user_row(id: &str, name: &str) -> Vec<NativeValue> {
    vec![
        NativeValue::Guid(Uuid::parse_str(id).unwrap()),
        NativeValue::Text(name.to_string()),
        NativeValue::Int32(30),
    ]
}

const USER_COLUMNS: [(&str, CqlType); 3] = [
    ("id", CqlType::Uuid),
    ("name", CqlType::Text),
    ("age", CqlType::Int),
];

// ----------------------------------------------------------------------
// Metadata
// ----------------------------------------------------------------------

#[test]
fn metadata_is_served_from_the_catalog() {
    let handler = rdbms(&shop("MySQL"));

    assert_eq!(handler.table_list(), vec!["customers", "orders", "audit"]);
    assert_eq!(handler.primary_keys().keys_of("orders"), ["id".to_string()]);
    assert_eq!(handler.navigation_properties().len(), 1);
    assert!(handler.table_metadata().contains_key("audit"));
    assert_eq!(handler.config().config_id, "shop");
}

#[test]
fn unknown_products_are_rejected() {
    let err = DataHandler::rdbms(HandlerConfig::new("x"), Arc::new(FakeSource::new("Informix")))
        .err()
        .unwrap();

    assert_eq!(err.class, ErrorClass::QueryGeneration);
}

// ----------------------------------------------------------------------
// Relational reads
// ----------------------------------------------------------------------

#[test]
fn oracle_read_pages_and_stamps_records() {
    let source = shop("Oracle");
    let handler = rdbms(&source);
    source.push_rows(
        &["ID", "NAME"],
        vec![vec![NativeValue::Int32(1), NativeValue::Text("Ada".into())]],
    );

    let options = QueryOptions::new()
        .top(10)
        .skip(20)
        .order_by(OrderItem::new("name"));
    let records = handler
        .read(&mut TxContext::new(), "customers", &options)
        .unwrap();

    assert_eq!(
        source.state().statements(),
        vec!["SELECT id, name FROM customers ORDER BY name OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"]
    );
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value("id"), Some("1"));
    assert_eq!(records[0].value("name"), Some("Ada"));

    let unstamped = Record::new().with("id", "1").with("name", "Ada");
    assert_eq!(
        records[0].etag(),
        Some(&ETag::compute("shop", "customers", &unstamped))
    );
    assert_eq!(source.state().open_connections, 0);
}

#[test]
fn sql_server_synthesizes_an_order() {
    let source = shop("Microsoft SQL Server");
    let handler = rdbms(&source);

    handler
        .read(
            &mut TxContext::new(),
            "orders",
            &QueryOptions::new().select(["note"]).top(5),
        )
        .unwrap();

    assert_eq!(
        source.state().statements(),
        vec!["SELECT id, note FROM orders ORDER BY (SELECT 1) OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"]
    );
}

#[test]
fn read_by_key_uses_the_configured_schema() {
    let source = FakeSource::new("PostgreSQL").with_table(
        FakeTable::new("codes")
            .in_schema("reference")
            .column("code", SqlType::Varchar)
            .column("label", SqlType::Varchar)
            .key("code"),
    );
    let config =
        HandlerConfig::new("ref").with_table(TableConfig::new("codes").with_schema("reference"));
    let handler = DataHandler::rdbms(config, Arc::new(source.clone())).unwrap();

    handler
        .read_by_key(&mut TxContext::new(), "codes", &Record::new().with("code", "EUR"))
        .unwrap();

    let state = source.state();
    assert_eq!(
        state.statements(),
        vec!["SELECT code, label FROM reference.codes WHERE code = ?"]
    );
    assert_eq!(
        state.params.last().unwrap(),
        &vec![NativeValue::Text("EUR".into())]
    );
}

#[test]
fn count_only_runs_when_requested() {
    let source = shop("MySQL");
    let handler = rdbms(&source);
    let mut tx = TxContext::new();

    assert_eq!(handler.count(&mut tx, "customers", &QueryOptions::new()).unwrap(), 0);
    assert!(source.state().statements().is_empty());
    assert_eq!(source.state().acquired, 1);

    source.push_rows(&["total"], vec![vec![NativeValue::Int64(17)]]);
    let options = QueryOptions::new()
        .count(true)
        .filter(Predicate::eq("name", "Ada"));
    assert_eq!(handler.count(&mut tx, "customers", &options).unwrap(), 17);
    assert_eq!(
        source.state().statements(),
        vec!["SELECT COUNT(*) AS total FROM customers WHERE name = ?"]
    );
}

#[test]
fn driver_failures_surface_as_connectivity_and_release() {
    let source = shop("MySQL");
    let handler = rdbms(&source);
    source
        .state()
        .query_results
        .push_back(Err(DriverError::new("socket closed")));

    let err = handler
        .read(&mut TxContext::new(), "customers", &QueryOptions::new())
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::Connectivity);
    assert_eq!(source.state().open_connections, 0);
}

// ----------------------------------------------------------------------
// Relational writes
// ----------------------------------------------------------------------

#[test]
fn insert_folds_generated_keys() {
    let source = shop("MySQL");
    let handler = rdbms(&source);
    source.state().insert_results.push_back(Ok(RowSet::new(
        vec!["id".into()],
        vec![vec![NativeValue::Int32(42)]],
    )));

    let inserted = handler
        .insert(
            &mut TxContext::new(),
            "customers",
            &Record::new().with("name", "Ada"),
        )
        .unwrap();

    assert_eq!(
        source.state().statements(),
        vec!["INSERT INTO customers (name) VALUES (?)"]
    );
    assert_eq!(inserted.value("id"), Some("42"));
    assert_eq!(inserted.value("name"), Some("Ada"));

    let unkeyed = Record::new().with("name", "Ada");
    let keyed = unkeyed.clone().with("id", "42");
    assert_eq!(
        inserted.etag(),
        Some(&ETag::compute("shop", "customers", &keyed))
    );
    assert_ne!(
        inserted.etag(),
        Some(&ETag::compute("shop", "customers", &unkeyed))
    );
}

#[test]
fn update_and_delete_report_whether_a_row_changed() {
    let source = shop("MySQL");
    let handler = rdbms(&source);
    let mut tx = TxContext::new();
    source.state().execute_results.push_back(Ok(0));

    let record = customer("9").with("name", "Grace");
    assert!(!handler.update(&mut tx, "customers", &record).unwrap());
    assert!(handler.delete(&mut tx, "customers", &customer("9")).unwrap());

    assert_eq!(
        source.state().statements(),
        vec![
            "UPDATE customers SET name = ? WHERE id = ?",
            "DELETE FROM customers WHERE id = ?",
        ]
    );
}

#[test]
fn guarded_update_matches_the_old_values() {
    let source = shop("MySQL");
    let handler = rdbms(&source);

    let old = customer("9").with("name", "Grace");
    let new = customer("9").with("name", "Ada");
    assert!(
        handler
            .update_if(&mut TxContext::new(), "customers", &old, &new)
            .unwrap()
    );

    assert_eq!(
        source.state().statements(),
        vec!["UPDATE customers SET name = ? WHERE id = ? AND name = ?"]
    );
}

// ----------------------------------------------------------------------
// Relational transactions
// ----------------------------------------------------------------------

#[test]
fn transaction_pins_one_connection_until_commit() {
    let source = shop("MySQL");
    let handler = rdbms(&source);
    let mut tx = TxContext::new();

    handler.open_transaction(&mut tx).unwrap();
    handler
        .insert(&mut tx, "customers", &Record::new().with("name", "Ada"))
        .unwrap();
    handler
        .update(&mut tx, "customers", &customer("1").with("name", "Grace"))
        .unwrap();
    assert_eq!(source.state().open_connections, 1);

    handler.commit_transaction(&mut tx).unwrap();

    let state = source.state();
    assert_eq!(state.acquired, 2);
    assert_eq!(state.open_connections, 0);
    assert_eq!(state.log.iter().filter(|l| *l == "@commit").count(), 1);
    assert_eq!(state.log.last().map(String::as_str), Some("@auto_commit=true"));
    assert!(!tx.is_open());
}

#[test]
fn rollback_releases_the_pinned_connection() {
    let source = shop("MySQL");
    let handler = rdbms(&source);
    let mut tx = TxContext::new();

    handler.open_transaction(&mut tx).unwrap();
    handler.delete(&mut tx, "customers", &customer("1")).unwrap();
    handler.rollback_transaction(&mut tx).unwrap();

    let state = source.state();
    assert!(state.log.contains(&"@rollback".to_string()));
    assert!(!state.log.contains(&"@commit".to_string()));
    assert_eq!(state.open_connections, 0);
}

#[test]
fn commit_without_a_transaction_is_rejected() {
    let handler = rdbms(&shop("MySQL"));

    let err = handler.commit_transaction(&mut TxContext::new()).unwrap_err();
    assert_eq!(err.class, ErrorClass::InvariantViolation);
}

// ----------------------------------------------------------------------
// References
// ----------------------------------------------------------------------

#[test]
fn update_reference_accepts_either_side_first() {
    let source = shop("MySQL");
    let handler = rdbms(&source);
    let mut tx = TxContext::new();

    source.push_rows(&["id"], vec![vec![NativeValue::Int32(3)]]);
    handler
        .update_reference(&mut tx, "orders", &customer("7"), "customers", &customer("3"))
        .unwrap();

    source.push_rows(&["id"], vec![vec![NativeValue::Int32(3)]]);
    handler
        .update_reference(&mut tx, "customers", &customer("3"), "orders", &customer("7"))
        .unwrap();

    let state = source.state();
    let expected = [
        "SELECT id FROM customers WHERE id = ?",
        "UPDATE orders SET customer_id = ? WHERE id = ?",
    ];
    assert_eq!(state.statements(), [expected, expected].concat());
    assert_eq!(
        state.params.last().unwrap(),
        &vec![NativeValue::Int32(3), NativeValue::Int32(7)]
    );
}

#[test]
fn update_reference_requires_the_exporting_row() {
    let source = shop("MySQL");
    let handler = rdbms(&source);

    let err = handler
        .update_reference(
            &mut TxContext::new(),
            "customers",
            &customer("404"),
            "orders",
            &customer("7"),
        )
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::NotFound);
    assert_eq!(source.state().statements().len(), 1);
}

#[test]
fn delete_reference_nulls_only_the_foreign_key() {
    let source = shop("MySQL");
    let handler = rdbms(&source);

    handler
        .delete_reference(
            &mut TxContext::new(),
            "customers",
            &customer("3"),
            "orders",
            &customer("7"),
        )
        .unwrap();

    let state = source.state();
    assert_eq!(
        state.statements(),
        vec!["UPDATE orders SET customer_id = ? WHERE id = ?"]
    );
    assert_eq!(
        state.params.last().unwrap(),
        &vec![NativeValue::Null, NativeValue::Int32(7)]
    );
}

#[test]
fn unrelated_tables_have_no_reference() {
    let handler = rdbms(&shop("MySQL"));

    let err = handler
        .delete_reference(
            &mut TxContext::new(),
            "customers",
            &customer("3"),
            "audit",
            &Record::new().with("line", "x"),
        )
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::NotFound);
}

#[test]
fn reference_updates_join_an_open_transaction() {
    let source = shop("MySQL");
    let handler = rdbms(&source);
    let mut tx = TxContext::new();

    handler.open_transaction(&mut tx).unwrap();
    source.push_rows(&["id"], vec![vec![NativeValue::Int32(3)]]);
    handler
        .update_reference(&mut tx, "customers", &customer("3"), "orders", &customer("7"))
        .unwrap();
    handler.commit_transaction(&mut tx).unwrap();

    assert_eq!(source.state().acquired, 2);
}

// ----------------------------------------------------------------------
// Metrics
// ----------------------------------------------------------------------

#[test]
fn executions_are_reported_to_the_sink() {
    let source = shop("MySQL");
    let sink = Arc::new(RecordingSink::default());
    let handler = rdbms(&source).with_sink(sink.clone());
    source.push_rows(
        &["id", "name"],
        vec![
            vec![NativeValue::Int32(1), NativeValue::Text("a".into())],
            vec![NativeValue::Int32(2), NativeValue::Text("b".into())],
        ],
    );

    handler
        .read(&mut TxContext::new(), "customers", &QueryOptions::new())
        .unwrap();

    assert_eq!(
        sink.events(),
        vec![
            Recorded::Start(ExecKind::Read, "customers".into()),
            Recorded::Finish(ExecKind::Read, "customers".into(), 2),
        ]
    );
}

// ----------------------------------------------------------------------
// Column family
// ----------------------------------------------------------------------

#[test]
fn column_family_requires_a_keyspace() {
    let err = DataHandler::column_family(HandlerConfig::new("cf"), users())
        .err()
        .unwrap();

    assert_eq!(err.class, ErrorClass::InvariantViolation);
}

#[test]
fn column_family_metadata_has_no_navigation() {
    let handler = column_family(&users());

    assert_eq!(handler.table_list(), vec!["users"]);
    assert!(handler.navigation_properties().is_empty());
    assert_eq!(handler.primary_keys().keys_of("users"), ["id".to_string()]);
}

#[test]
fn prepared_statements_are_reused() {
    let session = users();
    let sink = Arc::new(RecordingSink::default());
    let handler = column_family(&session).with_sink(sink.clone());
    let mut tx = TxContext::new();
    let keys = Record::new().with("id", USER_ID);

    session.push_rows(&USER_COLUMNS, vec![user_row(USER_ID, "ann")]);
    let first = handler.read_by_key(&mut tx, "users", &keys).unwrap();
    handler.read_by_key(&mut tx, "users", &keys).unwrap();

    assert_eq!(session.prepares.load(Ordering::Relaxed), 1);
    assert_eq!(session.statements().len(), 2);
    assert_eq!(first[0].value("id"), Some(USER_ID));
    assert_eq!(first[0].value("name"), Some("ann"));
    assert_eq!(
        sink.events(),
        vec![
            Recorded::Start(ExecKind::ReadByKey, "users".into()),
            Recorded::CacheMiss,
            Recorded::Finish(ExecKind::ReadByKey, "users".into(), 1),
            Recorded::Start(ExecKind::ReadByKey, "users".into()),
            Recorded::CacheHit,
            Recorded::Finish(ExecKind::ReadByKey, "users".into(), 0),
        ]
    );
}

#[test]
fn skipped_rows_are_dropped_locally() {
    let session = users();
    let handler = column_family(&session);
    let other = "00000000-0000-0000-0000-000000000002";
    let third = "00000000-0000-0000-0000-000000000003";
    session.push_rows(
        &USER_COLUMNS,
        vec![
            user_row(USER_ID, "ann"),
            user_row(other, "bo"),
            user_row(third, "cy"),
        ],
    );

    let records = handler
        .read(&mut TxContext::new(), "users", &QueryOptions::new().top(2).skip(1))
        .unwrap();

    assert_eq!(
        session.statements(),
        vec![r#"SELECT "id", "name", "age" FROM ks."users" LIMIT 3"#]
    );
    let names: Vec<_> = records.iter().filter_map(|r| r.value("name")).collect();
    assert_eq!(names, ["bo", "cy"]);
}

#[test]
fn unsupported_reads_never_reach_the_session() {
    let session = users();
    let handler = column_family(&session);
    let mut tx = TxContext::new();

    let ordered = QueryOptions::new().top(2).order_by(OrderItem::asc("name"));
    let err = handler.read(&mut tx, "users", &ordered).unwrap_err();
    assert!(err.is_unsupported());

    let expanded = QueryOptions::new().expand("orders");
    let err = handler.read(&mut tx, "users", &expanded).unwrap_err();
    assert!(err.is_unsupported());

    assert!(session.statements().is_empty());
}

#[test]
fn column_family_count() {
    let session = users();
    let handler = column_family(&session);
    session.push_rows(&[("count", CqlType::BigInt)], vec![vec![NativeValue::Int64(4)]]);

    let total = handler
        .count(
            &mut TxContext::new(),
            "users",
            &QueryOptions::new().count(true),
        )
        .unwrap();

    assert_eq!(total, 4);
    assert_eq!(session.statements(), vec![r#"SELECT COUNT(*) FROM ks."users""#]);
}

#[test]
fn insert_fills_missing_guid_keys() {
    let session = users();
    let handler = column_family(&session);

    let inserted = handler
        .insert(
            &mut TxContext::new(),
            "users",
            &Record::new().with("name", "ann"),
        )
        .unwrap();

    let id = Uuid::parse_str(inserted.value("id").unwrap()).unwrap();
    assert_eq!(
        session.last_values(),
        vec![NativeValue::Guid(id), NativeValue::Text("ann".into())]
    );
    assert!(session.statements()[0].starts_with(r#"INSERT INTO ks."users""#));
    assert!(inserted.etag().is_some());
}

#[test]
fn supplied_guid_keys_are_kept() {
    let session = users();
    let handler = column_family(&session);

    let inserted = handler
        .insert(&mut TxContext::new(), "users", &Record::new().with("id", USER_ID))
        .unwrap();

    assert_eq!(inserted.value("id"), Some(USER_ID));
}

#[test]
fn conditional_update_reports_not_applied() {
    let session = users();
    let handler = column_family(&session);
    session.push_applied(false);

    let old = Record::new().with("id", USER_ID).with("name", "ann");
    let new = Record::new().with("id", USER_ID).with("name", "bo");
    let applied = handler
        .update_if(&mut TxContext::new(), "users", &old, &new)
        .unwrap();

    assert!(!applied);
    assert_eq!(
        session.statements(),
        vec![r#"UPDATE ks."users" SET "name" = ? WHERE "id" = ? IF "name" = ?"#]
    );
}

#[test]
fn delete_is_conditional_inside_a_transaction() {
    let session = users();
    let handler = column_family(&session);
    let record = Record::new().with("id", USER_ID).with("name", "ann");
    let mut tx = TxContext::new();

    handler.delete(&mut tx, "users", &record).unwrap();
    handler.open_transaction(&mut tx).unwrap();
    handler.delete(&mut tx, "users", &record).unwrap();
    handler.commit_transaction(&mut tx).unwrap();

    assert_eq!(
        session.statements(),
        vec![
            r#"DELETE FROM ks."users" WHERE "id" = ?"#,
            r#"DELETE FROM ks."users" WHERE "id" = ? IF "name" = ?"#,
        ]
    );
    assert!(!tx.is_open());
}

#[test]
fn column_family_has_no_references() {
    let handler = column_family(&users());
    let keys = Record::new().with("id", USER_ID);

    let err = handler
        .update_reference(&mut TxContext::new(), "users", &keys, "users", &keys)
        .unwrap_err();
    assert!(err.is_unsupported());

    let err = handler
        .delete_reference(&mut TxContext::new(), "users", &keys, "users", &keys)
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::Unsupported);
}

#[test]
fn one_context_cannot_span_both_families() {
    let source = shop("MySQL");
    let relational = rdbms(&source);
    let cf = column_family(&users());
    let mut tx = TxContext::new();

    relational.open_transaction(&mut tx).unwrap();
    let err = cf
        .read(&mut tx, "users", &QueryOptions::new())
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::InvariantViolation);
    assert!(cf.commit_transaction(&mut tx).is_err());

    relational.rollback_transaction(&mut tx).unwrap();
    assert_eq!(source.state().open_connections, 0);
}
