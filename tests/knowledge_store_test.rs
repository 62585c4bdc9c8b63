// ==========================================
// 知识库集成测试
// ==========================================
// 测试目标: SQLite 持久化、强化、成功率、导出/导入
// ==========================================


use product_import::{FieldType, KnowledgeEntry, KnowledgeStore, SqliteKnowledgeRepository};
use std::sync::Arc;
use test_helpers::create_test_store;

#[test]
fn test_entries_persist_across_connections() {
    let (temp_file, store) = create_test_store().unwrap();
    store
        .add_entry(FieldType::Brand, "Acqua di Parma", "BRAND-ADP", 0.8, "operator")
        .unwrap();
    drop(store);

    let db_path = temp_file.path().to_str().unwrap();
    let reopened = KnowledgeStore::new(Arc::new(SqliteKnowledgeRepository::new(db_path).unwrap()));

    let entry = reopened
        .best_match(FieldType::Brand, "acqua  di parma")
        .unwrap()
        .unwrap();
    assert_eq!(entry.action, "BRAND-ADP");
    assert_eq!(entry.pattern, "acqua di parma");
}

#[test]
fn test_reinforcement_and_success_rate() {
    let (_temp_file, store) = create_test_store().unwrap();
    let created = store
        .add_entry(FieldType::Concentration, "extraforte", "PARFUM", 0.5, "operator")
        .unwrap();
    let reinforced = store
        .add_entry(FieldType::Concentration, "EXTRAFORTE", "PARFUM", 0.5, "operator")
        .unwrap();

    assert_eq!(reinforced.entry_id, created.entry_id);
    assert!((reinforced.confidence - 0.6).abs() < 1e-9);
    assert_eq!(reinforced.usage_count, 1);

    // 1 次成功（强化计入的使用）+ 1 次失败
    let updated = store
        .update_success_rate(&created.entry_id, false)
        .unwrap();
    assert_eq!(updated.usage_count, 2);
    assert!((updated.success_rate - 0.5).abs() < 1e-9);
    assert!(updated.last_used_at.is_some());
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn test_fuzzy_lookup_orders_by_weight() {
    let (_temp_file, store) = create_test_store().unwrap();
    store
        .add_entry(FieldType::Concentration, "extrafort", "EAU_DE_PARFUM", 0.4, "a")
        .unwrap();
    store
        .add_entry(FieldType::Concentration, "extraforte", "PARFUM", 0.9, "b")
        .unwrap();

    let matches = store
        .find_applicable_rules(FieldType::Concentration, "extraforti")
        .unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].action, "PARFUM");
    assert!(store
        .find_applicable_rules(FieldType::Brand, "extraforte")
        .unwrap()
        .is_empty());
}

#[test]
fn test_export_and_import_json() {
    let (_source_file, source) = create_test_store().unwrap();
    source
        .add_entry(FieldType::Form, "vaporisat", "SPRAY", 0.7, "operator")
        .unwrap();
    source
        .add_entry(FieldType::Audience, "lui", "MEN", 0.6, "operator")
        .unwrap();
    let json = source.export_json().unwrap();

    let target = KnowledgeStore::in_memory();
    assert_eq!(target.import_json(&json).unwrap(), 2);
    // 再次导入: 权重不高于现有条目,不覆盖
    assert_eq!(target.import_json(&json).unwrap(), 0);

    let entry = target.best_match(FieldType::Form, "vaporisat").unwrap().unwrap();
    assert_eq!(entry.action, "SPRAY");
}

#[test]
fn test_import_rejects_malformed_json() {
    let store = KnowledgeStore::in_memory();
    assert!(store.import_json("{ not json").is_err());
    assert!(store.is_empty().unwrap());
}

#[test]
fn test_import_with_invalid_entry_writes_nothing() {
    let (_temp_file, store) = create_test_store().unwrap();
    let entries = vec![
        KnowledgeEntry::new(FieldType::Form, "vapo", "SPRAY", 0.8, "operator"),
        KnowledgeEntry::new(FieldType::Form, "stik", "  ", 0.8, "operator"),
    ];

    assert!(store.import_entries(entries).is_err());
    assert!(store.is_empty().unwrap());
}
