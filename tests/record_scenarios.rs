//! Record Manager scenarios: primary-key uniqueness and scan-with-predicate
//! over a mix of live and tombstoned tuples.

mod common;

use dbcore::record::{BinOp, Expr, Record, Rid, Schema, Table, Value};
use dbcore::types::{DataType, PageId, ReplacementPolicy};
use tempfile::tempdir;

fn schema() -> Schema {
    Schema::new(
        vec!["id".into(), "name".into(), "age".into()],
        vec![DataType::Int, DataType::String, DataType::Int],
        vec![0, 8, 0],
        vec![0],
    )
    .unwrap()
}

fn row(schema: &Schema, id: i32, name: &str, age: i32) -> Record {
    let mut rec = Record::new(schema, Rid::new(PageId::new(0), 0));
    rec.set_attr(schema, 0, Some(&Value::Int(id))).unwrap();
    rec.set_attr(schema, 1, Some(&Value::String(name.into()))).unwrap();
    rec.set_attr(schema, 2, Some(&Value::Int(age))).unwrap();
    rec
}

#[test]
fn duplicate_primary_key_is_rejected_across_reopen() {
    common::init_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("people");
    {
        let mut table = Table::create(&path, "people", schema(), 8, ReplacementPolicy::Lru).unwrap();
        table.insert(row(table.schema(), 1, "alice", 30)).unwrap();
        table.close().unwrap();
    }

    let mut table = Table::open(&path, 8, ReplacementPolicy::Lru).unwrap();
    let err = table.insert(row(table.schema(), 1, "bob", 40)).unwrap_err();
    assert!(matches!(err, dbcore::StorageError::DuplicateKey));
}

#[test]
fn scan_skips_deleted_tuples_and_applies_predicate() {
    common::init_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("people");
    let mut table = Table::create(&path, "people", schema(), 8, ReplacementPolicy::Lru).unwrap();

    let mut rids = Vec::new();
    for i in 0..10 {
        rids.push(table.insert(row(table.schema(), i, "n", i * 2)).unwrap());
    }
    // Delete every id divisible by 5; scan should never see these again.
    table.delete(rids[0]).unwrap();
    table.delete(rids[5]).unwrap();

    let cond = Expr::Binary(
        BinOp::Eq,
        Box::new(Expr::Const(Value::Int(0))),
        Box::new(Expr::Const(Value::Int(0))),
    );
    let all_live = table.scan(&cond).unwrap();
    assert_eq!(all_live.len(), 8);
    for rec in &all_live {
        let id = rec.get_attr(table.schema(), 0).unwrap().unwrap();
        assert!(!matches!(id, Value::Int(0) | Value::Int(5)));
    }
}
