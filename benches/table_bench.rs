//! Benchmarks for ddbmem table operations

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ddbmem::{
    AttributeValue, ComparisonOperator, Condition, Conditions, Config, Database, Item, Key,
    KeySchema, ScalarType, Table, TableSpec, Throughput,
};

fn setup_table() -> (Database, Arc<Table>) {
    let config = Config::builder().lifecycle_delays(Duration::ZERO).build();
    let db = Database::new(config).unwrap();
    let schema = KeySchema::hash_range(Key::new("user", ScalarType::S), Key::new("seq", ScalarType::N));
    db.create_table(TableSpec::new("bench", schema, Throughput::new(100, 100)))
        .unwrap();
    let table = db.get_table("bench").unwrap();
    (db, table)
}

fn item(user: u64, seq: u64) -> Item {
    Item::new()
        .with("user", AttributeValue::s(format!("user-{}", user)))
        .with("seq", AttributeValue::n(seq))
        .with("payload", AttributeValue::s("x".repeat(64)))
}

fn table_benchmarks(c: &mut Criterion) {
    let (_db, table) = setup_table();
    for user in 0..100 {
        for seq in 0..10 {
            table.put(item(user, seq), None).unwrap();
        }
    }

    c.bench_function("put_overwrite", |b| {
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            table.put(black_box(item(n % 100, n % 10)), None).unwrap();
        })
    });

    let key = Item::new()
        .with("user", AttributeValue::s("user-42"))
        .with("seq", AttributeValue::n(7));
    c.bench_function("get", |b| {
        b.iter(|| table.get(black_box(&key), &[]).unwrap())
    });

    let hash = AttributeValue::s("user-42");
    let range = Condition::new(ComparisonOperator::Ge, vec![AttributeValue::n(5)]).unwrap();
    c.bench_function("query_range", |b| {
        b.iter(|| table.query(black_box(&hash), Some(&range), &[], None, false).unwrap())
    });

    let mut filter = Conditions::new();
    filter.insert(
        "seq".to_string(),
        Condition::new(ComparisonOperator::Eq, vec![AttributeValue::n(3)]).unwrap(),
    );
    c.bench_function("scan_filtered", |b| {
        b.iter(|| table.scan(black_box(Some(&filter)), &[], None).unwrap())
    });
}

criterion_group!(benches, table_benchmarks);
criterion_main!(benches);
