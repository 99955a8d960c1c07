//! Integration tests for ddbmem
//!
//! Full request sequences through `Database::execute`, the same path the
//! console takes.

use std::thread;
use std::time::{Duration, Instant};

use ddbmem::{Config, Database, Request, Response, TableStatus};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_db() -> Database {
    let config = Config::builder()
        .lifecycle_delays(Duration::from_millis(30))
        .build();
    Database::new(config).unwrap()
}

/// Execute a JSON request and return the JSON response body
fn call(db: &Database, request: Value) -> Value {
    let request: Request = serde_json::from_value(request).unwrap();
    let response: Response = db.execute(request).unwrap();
    serde_json::to_value(response).unwrap()
}

fn status(db: &Database, table: &str) -> Option<TableStatus> {
    db.describe_table(table).ok().map(|d| d.table_status)
}

fn wait_for(db: &Database, table: &str, expected: Option<TableStatus>) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while status(db, table) != expected {
        assert!(Instant::now() < deadline, "{} never reached {:?}", table, expected);
        thread::sleep(Duration::from_millis(5));
    }
}

// =============================================================================
// Scenario Tests
// =============================================================================

#[test]
fn test_orders_lifecycle() {
    let db = setup_db();

    let created = call(
        &db,
        json!({
            "Operation": "CreateTable",
            "TableName": "Orders",
            "KeySchema": [{"AttributeName": "id", "KeyType": "HASH"}],
            "AttributeDefinitions": [{"AttributeName": "id", "AttributeType": "S"}],
            "ProvisionedThroughput": {"ReadCapacityUnits": 5, "WriteCapacityUnits": 5}
        }),
    );
    assert_eq!(created["TableDescription"]["TableStatus"], "CREATING");
    wait_for(&db, "Orders", Some(TableStatus::Active));

    let put = call(
        &db,
        json!({
            "Operation": "PutItem",
            "TableName": "Orders",
            "Item": {"id": {"S": "A1"}, "total": {"N": "42"}},
            "Expected": {}
        }),
    );
    assert_eq!(put["ConsumedCapacityUnits"], 1.0);

    let got = call(
        &db,
        json!({"Operation": "GetItem", "TableName": "Orders", "Key": {"id": {"S": "A1"}}}),
    );
    assert_eq!(got["Item"], json!({"id": {"S": "A1"}, "total": {"N": "42"}}));
    assert_eq!(got["ConsumedCapacityUnits"], 0.5);

    let deleted = call(&db, json!({"Operation": "DeleteTable", "TableName": "Orders"}));
    assert_eq!(deleted["TableDescription"]["TableStatus"], "DELETING");

    wait_for(&db, "Orders", None);
    let listed = call(&db, json!({"Operation": "ListTables"}));
    assert_eq!(listed["TableNames"], json!([]));
}

#[test]
fn test_counter_with_optimistic_locking() {
    let db = setup_db();
    call(
        &db,
        json!({
            "Operation": "CreateTable",
            "TableName": "Counters",
            "KeySchema": [{"AttributeName": "name", "KeyType": "HASH"}],
            "AttributeDefinitions": [{"AttributeName": "name", "AttributeType": "S"}],
            "ProvisionedThroughput": {"ReadCapacityUnits": 1, "WriteCapacityUnits": 1}
        }),
    );

    // Created on first use
    let first = call(
        &db,
        json!({
            "Operation": "UpdateItem",
            "TableName": "Counters",
            "Key": {"name": {"S": "hits"}},
            "AttributeUpdates": {"value": {"Action": "ADD", "Value": {"N": "1"}}},
            "ReturnValues": "ALL_NEW"
        }),
    );
    assert_eq!(first["Attributes"], json!({"name": {"S": "hits"}, "value": {"N": "1"}}));

    // Compare-and-set on the current value
    let request = json!({
        "Operation": "UpdateItem",
        "TableName": "Counters",
        "Key": {"name": {"S": "hits"}},
        "AttributeUpdates": {"value": {"Value": {"N": "10"}}},
        "Expected": {"value": {"Value": {"N": "1"}}}
    });
    call(&db, request.clone());

    let stale: Request = serde_json::from_value(request).unwrap();
    let err = db.execute(stale).unwrap_err();
    assert_eq!(err.code(), "ConditionalCheckFailedException");
}

#[test]
fn test_scan_reports_scanned_and_matched() {
    let db = setup_db();
    call(
        &db,
        json!({
            "Operation": "CreateTable",
            "TableName": "Products",
            "KeySchema": [{"AttributeName": "sku", "KeyType": "HASH"}],
            "AttributeDefinitions": [{"AttributeName": "sku", "AttributeType": "S"}],
            "ProvisionedThroughput": {"ReadCapacityUnits": 1, "WriteCapacityUnits": 1}
        }),
    );
    for (sku, color) in [("p1", "red"), ("p2", "blue"), ("p3", "red")] {
        call(
            &db,
            json!({
                "Operation": "PutItem",
                "TableName": "Products",
                "Item": {"sku": {"S": sku}, "color": {"S": color}, "price": {"N": "10"}}
            }),
        );
    }

    let scanned = call(
        &db,
        json!({
            "Operation": "Scan",
            "TableName": "Products",
            "ScanFilter": {"color": {"ComparisonOperator": "EQ", "AttributeValueList": [{"S": "red"}]}},
            "AttributesToGet": ["sku"]
        }),
    );

    assert_eq!(scanned["ScannedCount"], 3);
    assert_eq!(scanned["Count"], 2);

    let mut skus: Vec<String> = scanned["Items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["sku"]["S"].as_str().unwrap().to_string())
        .collect();
    skus.sort();
    assert_eq!(skus, vec!["p1", "p3"]);
}
