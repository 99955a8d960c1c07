//! Tests for the Database registry and table lifecycle
//!
//! These tests verify:
//! - Table creation, naming rules and the table-count ceiling
//! - Timed CREATING/UPDATING/DELETING transitions
//! - Provisioned throughput change rules
//! - Independent registries and reset
//! - Registry and lifecycle changes under concurrent callers

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ddbmem::{
    AttributeValue, Config, Database, DbError, Item, Key, KeySchema, ScalarType, TableSpec,
    TableStatus, Throughput,
};

// =============================================================================
// Helper Functions
// =============================================================================

const DELAY: Duration = Duration::from_millis(50);

fn setup_db() -> Database {
    let config = Config::builder().lifecycle_delays(DELAY).build();
    Database::new(config).unwrap()
}

fn orders_spec(name: &str, read: u64, write: u64) -> TableSpec {
    TableSpec::new(
        name,
        KeySchema::hash(Key::new("id", ScalarType::S)),
        Throughput::new(read, write),
    )
}

/// Poll until `check` holds, for at most five seconds
fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    check()
}

fn wait_for_status(db: &Database, name: &str, status: TableStatus) {
    let reached = wait_until(|| {
        db.describe_table(name)
            .map(|d| d.table_status == status)
            .unwrap_or(false)
    });
    assert!(reached, "table {} never reached {}", name, status);
}

/// Create a table and wait for it to become ACTIVE
fn create_active(db: &Database, name: &str, read: u64, write: u64) {
    db.create_table(orders_spec(name, read, write)).unwrap();
    wait_for_status(db, name, TableStatus::Active);
}

// =============================================================================
// Creation Tests
// =============================================================================

#[test]
fn test_create_starts_in_creating() {
    let db = Database::new(Config::builder().lifecycle_delays(Duration::from_secs(60)).build()).unwrap();

    let description = db.create_table(orders_spec("Orders", 5, 5)).unwrap();

    assert_eq!(description.table_status, TableStatus::Creating);
    assert_eq!(description.table_name, "Orders");
    assert_eq!(description.provisioned_throughput.throughput(), Throughput::new(5, 5));
    assert_eq!(db.list_tables(), vec!["Orders".to_string()]);
}

#[test]
fn test_creating_becomes_active() {
    let db = setup_db();
    db.create_table(orders_spec("Orders", 5, 5)).unwrap();
    wait_for_status(&db, "Orders", TableStatus::Active);
}

#[test]
fn test_duplicate_name_rejected() {
    let db = setup_db();
    db.create_table(orders_spec("Orders", 5, 5)).unwrap();

    let err = db.create_table(orders_spec("Orders", 5, 5)).unwrap_err();
    assert!(matches!(err, DbError::ResourceInUse(_)));
    assert_eq!(db.table_count(), 1);
}

#[test]
fn test_table_ceiling() {
    let db = Database::new(Config::builder().max_tables(2).build()).unwrap();
    db.create_table(orders_spec("t-1", 1, 1)).unwrap();
    db.create_table(orders_spec("t-2", 1, 1)).unwrap();

    let err = db.create_table(orders_spec("t-3", 1, 1)).unwrap_err();
    assert!(matches!(err, DbError::LimitExceeded(_)));
    assert_eq!(err.code(), "LimitExceededException");
}

#[test]
fn test_table_name_rules() {
    let db = setup_db();
    let too_long = "x".repeat(256);
    for bad in ["ab", "has space", "semi;colon", too_long.as_str()] {
        let err = db.create_table(orders_spec(bad, 1, 1)).unwrap_err();
        assert!(matches!(err, DbError::Validation(_)), "{} accepted", bad);
    }
    db.create_table(orders_spec("my-table_1.v2", 1, 1)).unwrap();
}

#[test]
fn test_throughput_bounds() {
    let db = setup_db();
    assert!(matches!(
        db.create_table(orders_spec("zero", 0, 1)),
        Err(DbError::Validation(_))
    ));
    assert!(matches!(
        db.create_table(orders_spec("huge", 1, 10_001)),
        Err(DbError::Validation(_))
    ));
}

#[test]
fn test_unknown_table() {
    let db = setup_db();
    assert!(matches!(db.get_table("ghost"), Err(DbError::ResourceNotFound(_))));
    assert!(matches!(db.describe_table("ghost"), Err(DbError::ResourceNotFound(_))));
    assert!(matches!(db.delete_table("ghost"), Err(DbError::ResourceNotFound(_))));
}

#[test]
fn test_list_tables_sorted() {
    let db = setup_db();
    for name in ["gamma", "alpha", "beta"] {
        db.create_table(orders_spec(name, 1, 1)).unwrap();
    }
    assert_eq!(db.list_tables(), vec!["alpha", "beta", "gamma"]);
}

// =============================================================================
// Throughput Update Tests
// =============================================================================

#[test]
fn test_update_requires_active() {
    let db = Database::new(Config::builder().lifecycle_delays(Duration::from_secs(60)).build()).unwrap();
    db.create_table(orders_spec("Orders", 100, 100)).unwrap();

    let err = db.update_table("Orders", Throughput::new(200, 100)).unwrap_err();
    assert!(matches!(err, DbError::ResourceInUse(_)));
}

#[test]
fn test_update_minimum_change() {
    let db = setup_db();
    create_active(&db, "Orders", 100, 100);

    let err = db.update_table("Orders", Throughput::new(105, 100)).unwrap_err();
    assert!(matches!(err, DbError::LimitExceeded(_)));

    let description = db.update_table("Orders", Throughput::new(110, 100)).unwrap();
    assert_eq!(description.table_status, TableStatus::Updating);
    assert_eq!(description.provisioned_throughput.read_capacity_units, 110);
    assert!(description.provisioned_throughput.last_increase_date_time.is_some());

    wait_for_status(&db, "Orders", TableStatus::Active);
}

#[test]
fn test_update_maximum_increase() {
    let db = setup_db();
    create_active(&db, "Orders", 100, 100);

    let err = db.update_table("Orders", Throughput::new(201, 100)).unwrap_err();
    assert!(matches!(err, DbError::LimitExceeded(_)));

    db.update_table("Orders", Throughput::new(200, 100)).unwrap();
}

#[test]
fn test_second_decrease_rejected() {
    let db = setup_db();
    create_active(&db, "Orders", 100, 100);

    let description = db.update_table("Orders", Throughput::new(90, 100)).unwrap();
    assert!(description.provisioned_throughput.last_decrease_date_time.is_some());
    wait_for_status(&db, "Orders", TableStatus::Active);

    let err = db.update_table("Orders", Throughput::new(80, 100)).unwrap_err();
    assert!(matches!(err, DbError::LimitExceeded(_)));
    assert_eq!(db.get_table("Orders").unwrap().throughput(), Throughput::new(90, 100));
}

#[test]
fn test_decrease_allowed_after_interval() {
    let config = Config::builder()
        .lifecycle_delays(DELAY)
        .min_decrease_interval(Duration::from_millis(100))
        .build();
    let db = Database::new(config).unwrap();
    create_active(&db, "Orders", 100, 100);

    db.update_table("Orders", Throughput::new(90, 100)).unwrap();
    wait_for_status(&db, "Orders", TableStatus::Active);
    thread::sleep(Duration::from_millis(150));

    db.update_table("Orders", Throughput::new(80, 100)).unwrap();
}

#[test]
fn test_update_while_updating_rejected() {
    let config = Config::builder()
        .delay_creating(Duration::ZERO)
        .delay_updating(Duration::from_secs(60))
        .build();
    let db = Database::new(config).unwrap();
    create_active(&db, "Orders", 100, 100);

    db.update_table("Orders", Throughput::new(150, 100)).unwrap();
    let err = db.update_table("Orders", Throughput::new(200, 100)).unwrap_err();
    assert!(matches!(err, DbError::ResourceInUse(_)));
}

// =============================================================================
// Deletion Tests
// =============================================================================

#[test]
fn test_delete_lifecycle() {
    let db = setup_db();
    create_active(&db, "Orders", 5, 5);

    let description = db.delete_table("Orders").unwrap();
    assert_eq!(description.table_status, TableStatus::Deleting);

    // Still listed until the deletion delay elapses
    assert!(wait_until(|| db.list_tables().is_empty()));
    assert!(matches!(db.describe_table("Orders"), Err(DbError::ResourceNotFound(_))));
}

#[test]
fn test_delete_requires_active() {
    let db = Database::new(Config::builder().lifecycle_delays(Duration::from_secs(60)).build()).unwrap();
    db.create_table(orders_spec("Orders", 5, 5)).unwrap();

    let err = db.delete_table("Orders").unwrap_err();
    assert!(matches!(err, DbError::ResourceInUse(_)));
}

#[test]
fn test_name_reusable_after_delete() {
    let db = setup_db();
    create_active(&db, "Orders", 5, 5);
    db.delete_table("Orders").unwrap();
    assert!(wait_until(|| db.table_count() == 0));

    db.create_table(orders_spec("Orders", 5, 5)).unwrap();
    wait_for_status(&db, "Orders", TableStatus::Active);
    assert_eq!(db.table_count(), 1);
}

// =============================================================================
// Registry Tests
// =============================================================================

#[test]
fn test_describe_counts_items() {
    let db = setup_db();
    db.create_table(orders_spec("Orders", 5, 5)).unwrap();
    let table = db.get_table("Orders").unwrap();

    let item = Item::new()
        .with("id", AttributeValue::s("A1"))
        .with("total", AttributeValue::n(42));
    table.put(item.clone(), None).unwrap();

    let description = db.describe_table("Orders").unwrap();
    assert_eq!(description.item_count, Some(1));
    assert_eq!(description.table_size_bytes, Some(item.size().bytes() + 100));
}

#[test]
fn test_registries_are_independent() {
    let first = setup_db();
    let second = setup_db();

    first.create_table(orders_spec("Orders", 5, 5)).unwrap();

    assert_eq!(first.table_count(), 1);
    assert_eq!(second.table_count(), 0);
    second.create_table(orders_spec("Orders", 5, 5)).unwrap();
}

#[test]
fn test_reset_drops_everything() {
    let db = setup_db();
    db.create_table(orders_spec("Orders", 5, 5)).unwrap();
    db.create_table(orders_spec("Events", 5, 5)).unwrap();

    db.reset();

    assert_eq!(db.table_count(), 0);
    db.create_table(orders_spec("Orders", 5, 5)).unwrap();
}

#[test]
fn test_invalid_config_rejected() {
    let err = Database::new(Config::builder().max_tables(0).build()).err().unwrap();
    assert!(matches!(err, DbError::Config(_)));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_creates_of_same_name() {
    let db = Arc::new(setup_db());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = Arc::clone(&db);
            thread::spawn(move || db.create_table(orders_spec("Same", 5, 5)))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|err| matches!(err, DbError::ResourceInUse(_))));
    assert_eq!(db.table_count(), 1);
}

#[test]
fn test_delete_while_items_are_written() {
    let db = Arc::new(setup_db());
    create_active(&db, "Orders", 5, 5);
    let table = db.get_table("Orders").unwrap();

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for i in 0..50 {
                    let item = Item::new().with("id", AttributeValue::s(format!("t{}-{}", t, i)));
                    table.put(item, None).unwrap();
                }
            })
        })
        .collect();

    let description = db.delete_table("Orders").unwrap();
    assert_eq!(description.table_status, TableStatus::Deleting);

    for writer in writers {
        writer.join().unwrap();
    }

    assert_eq!(table.item_count(), 200);
    assert!(wait_until(|| db.table_count() == 0));
    assert!(matches!(db.get_table("Orders"), Err(DbError::ResourceNotFound(_))));
}
