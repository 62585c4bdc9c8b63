// ==========================================
// 转换管道端到端测试
// ==========================================
// 测试目标: 文件 → 网格 → 记录 的完整流程,含歧义处理与知识学习
// ==========================================


use product_import::domain::ParsingRule;
use product_import::engine::{AutoDefaultResolver, InteractiveResolver};
use product_import::importer::{Grid, UniversalFileParser};
use product_import::{
    logging, Concentration, ConversionOrchestrator, ConversionProfile, FieldType, ImportError,
    KnowledgeStore, ProductForm, UnitOfMeasure, ValidationState,
};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use test_helpers::{
    create_csv, create_test_store, default_profile, three_column_config, SharedBuffer,
    ADP_DESCRIPTION,
};

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

#[test]
fn test_adp_description_from_csv() {
    logging::init_test();

    let csv = create_csv(&format!(
        "CODICE;DESCRIZIONE;PREZZO\nadp-001;{};45,00\n",
        ADP_DESCRIPTION
    ))
    .unwrap();
    let orchestrator = ConversionOrchestrator::new(default_profile(), None).unwrap();

    let result = orchestrator
        .convert_file(&UniversalFileParser, csv.path())
        .unwrap();

    assert_eq!(result.total_processed, 1);
    assert_eq!(result.valid_count, 1, "errors: {:?}", result.errors);
    let record = &result.valid_records[0];
    assert_eq!(record.code.as_deref(), Some("ADP-001"));
    assert_eq!(record.name.as_deref(), Some(ADP_DESCRIPTION));
    assert_eq!(record.concentration, Some(Concentration::Parfum));
    assert_eq!(record.size_value, Some(30.0));
    assert_eq!(record.size_unit, Some(UnitOfMeasure::Milliliter));
    assert_eq!(record.form, Some(ProductForm::Spray));
    assert_eq!(record.price, Some(45.0));
    assert_eq!(record.validation_state, Some(ValidationState::Valid));
}

#[test]
fn test_nine_columns_against_eleven_minimum() {
    let csv = create_csv(
        "C1;C2;C3;C4;C5;C6;C7;C8;C9\nA1;ROSA EDT 50ML;10;x;x;x;x;x;x\n",
    )
    .unwrap();
    let profile = ConversionProfile::with_defaults(three_column_config().with_min_columns(11));
    let orchestrator = ConversionOrchestrator::new(profile, None).unwrap();

    let result = orchestrator
        .convert_file(&UniversalFileParser, csv.path())
        .unwrap();

    assert_eq!(result.total_processed, 1);
    assert_eq!(result.valid_count, 0);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.errors[0].row, 2);
    assert_eq!(result.errors[0].field, "row");
    assert!(result.errors[0].raw_line.starts_with("A1;ROSA EDT 50ML"));
}

#[test]
fn test_blank_line_keeps_physical_row_number_in_errors() {
    let csv = create_csv("CODE;NAME;PRICE\nA1;ROSA EDT 50ML;1\n\nA2\n").unwrap();
    let profile = ConversionProfile::with_defaults(three_column_config().with_min_columns(3));
    let orchestrator = ConversionOrchestrator::new(profile, None).unwrap();

    let result = orchestrator
        .convert_file(&UniversalFileParser, csv.path())
        .unwrap();

    assert_eq!(result.valid_count, 1);
    assert_eq!(result.skipped_count, 1);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.errors[0].row, 4);
    assert_eq!(result.errors[0].raw_line, "A2");
}

#[test]
fn test_xlsx_fixture_converts() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/products.xlsx");
    let orchestrator = ConversionOrchestrator::new(default_profile(), None).unwrap();

    let result = orchestrator
        .convert_file(&UniversalFileParser, &path)
        .unwrap();

    assert_eq!(result.total_processed, 2);
    assert_eq!(result.valid_count, 2, "errors: {:?}", result.errors);

    let first = &result.valid_records[0];
    assert_eq!(first.row_number, 2);
    assert_eq!(first.code.as_deref(), Some("ADP-001"));
    assert_eq!(first.concentration, Some(Concentration::Parfum));
    assert_eq!(first.size_value, Some(30.0));
    assert_eq!(first.price, Some(45.5));

    let second = &result.valid_records[1];
    assert_eq!(second.code.as_deref(), Some("A-002"));
    assert_eq!(second.concentration, Some(Concentration::EauDeParfum));
    assert_eq!(second.size_value, Some(100.0));
    assert_eq!(second.price, Some(30.0));
}

#[test]
fn test_json_dictionary_keys_match_any_case() {
    let json = r#"{
        "file": {
            "header_row": 0,
            "data_start_row": 1,
            "column_mapping": { "0": "code", "1": "name" },
            "description_columns": [1]
        },
        "dictionaries": [
            { "field": "concentration", "entries": { "EDT": "EAU_DE_TOILETTE" } }
        ]
    }"#;
    let profile = ConversionProfile::from_json_str(json).unwrap();
    let orchestrator = ConversionOrchestrator::new(profile, None).unwrap();

    let record = orchestrator.parse_description("ROSA EDT 50ML", 1).unwrap();

    assert_eq!(record.concentration, Some(Concentration::EauDeToilette));
}

#[test]
fn test_lone_decimal_size_is_kept() {
    let orchestrator = ConversionOrchestrator::new(default_profile(), None).unwrap();

    let record = orchestrator
        .parse_description("ROSA MINIATURE EDT 7.5ml", 1)
        .unwrap();

    assert_eq!(record.size_value, Some(7.5));
    assert_eq!(record.size_unit, Some(UnitOfMeasure::Milliliter));
    assert_eq!(record.concentration, Some(Concentration::EauDeToilette));
}

#[test]
fn test_profile_settings_reach_knowledge_store() {
    let store = Arc::new(KnowledgeStore::in_memory());
    let mut profile = default_profile();
    profile.settings.reinforcement_delta = 0.3;
    profile.settings.fuzzy_max_distance = 0;

    let orchestrator = ConversionOrchestrator::new(profile, Some(Arc::clone(&store))).unwrap();
    let view = orchestrator.knowledge().unwrap();
    assert_eq!(view.max_edit_distance(), 0);
    assert_eq!(view.reinforcement_delta(), 0.3);

    // 视图与调用方共享数据: 强化按方案步长
    view.add_entry(FieldType::Form, "vapo", "SPRAY", 0.5, "operator")
        .unwrap();
    view.add_entry(FieldType::Form, "vapo", "SPRAY", 0.5, "operator")
        .unwrap();
    let entry = store.best_match(FieldType::Form, "vapo").unwrap().unwrap();
    assert!((entry.confidence - 0.8).abs() < 1e-9);
    assert_eq!(entry.usage_count, 1);

    // 距离 0: 只认包含关系
    assert!(view.best_match(FieldType::Form, "vapi").unwrap().is_none());
    assert!(store.best_match(FieldType::Form, "vapi").unwrap().is_some());
}

#[test]
fn test_invalid_configuration_processes_nothing() {
    // 缺少编码列
    let file = product_import::FileConfiguration::from_pairs(&[(1, FieldType::Name)]);
    let result = ConversionOrchestrator::new(ConversionProfile::with_defaults(file), None);
    assert!(matches!(result, Err(ImportError::ConfigurationError(_))));

    // 非法正则
    let mut profile = default_profile();
    profile.add_rule(ParsingRule::new("broken", "(unclosed", FieldType::Brand, 1));
    let result = ConversionOrchestrator::new(profile, None);
    assert!(matches!(result, Err(ImportError::InvalidPattern { .. })));
}

#[test]
fn test_missing_file_is_fatal() {
    let orchestrator = ConversionOrchestrator::new(default_profile(), None).unwrap();
    let result = orchestrator.convert_file(
        &UniversalFileParser,
        std::path::Path::new("/no/such/listino.csv"),
    );
    assert!(matches!(result, Err(ImportError::FileNotFound(_))));
}

#[test]
fn test_priority_one_beats_priority_two() {
    let mut profile = default_profile();
    profile.replace_rules(vec![
        ParsingRule::new("second", r"\b(edp)\b", FieldType::Concentration, 2).with_groups(&[1]),
        ParsingRule::new("first", r"\b(edt)\b", FieldType::Concentration, 1).with_groups(&[1]),
    ]);
    let orchestrator = ConversionOrchestrator::new(profile, None).unwrap();

    let record = orchestrator
        .parse_description("ROSA EDP EDT 50ML", 1)
        .unwrap();

    assert_eq!(record.concentration, Some(Concentration::EauDeToilette));
}

#[test]
fn test_unresolved_fields_get_defaults_and_remarks() {
    let grid = Grid::new(vec![
        row(&["CODE", "NAME", "PRICE"]),
        row(&["A1", "SAPONE ALLA ROSA", "3"]),
    ]);
    let orchestrator = ConversionOrchestrator::new(default_profile(), None)
        .unwrap()
        .with_resolver(Arc::new(AutoDefaultResolver));

    let result = orchestrator.convert_grid(&grid);

    let record = &result.valid_records[0];
    assert_eq!(record.validation_state, Some(ValidationState::NeedsReview));
    assert_eq!(record.concentration, Some(Concentration::Unknown));
    assert_eq!(record.size_value, Some(0.0));
    assert!(record.remarks.iter().any(|r| r.contains("concentration")));
}

#[test]
fn test_learning_round_trip_with_interactive_resolver() {
    logging::init_test();

    let (_db, store) = create_test_store().unwrap();
    let store = Arc::new(store);
    let output = SharedBuffer::default();
    let resolver = InteractiveResolver::new(Cursor::new(b"PARFUM\n".to_vec()), output.clone());

    let orchestrator = ConversionOrchestrator::new(default_profile(), Some(Arc::clone(&store)))
        .unwrap()
        .with_resolver(Arc::new(resolver));

    // 第一行由人工确认并学习,第二行直接命中知识库
    let grid = Grid::new(vec![
        row(&["CODE", "NAME", "PRICE"]),
        row(&["A1", "ROSA EXTRAFORTE 50ML", "10"]),
        row(&["A2", "ROSA EXTRAFORTE 50ML", "10"]),
    ]);
    let result = orchestrator.convert_grid(&grid);

    assert_eq!(result.valid_count, 2, "errors: {:?}", result.errors);
    assert!(output.contents().contains("[行 2]"));
    assert!(!output.contents().contains("[行 3]"));

    for record in &result.valid_records {
        assert_eq!(record.concentration, Some(Concentration::Parfum));
        assert_eq!(record.validation_state, Some(ValidationState::Valid));
    }

    let entry = store
        .best_match(FieldType::Concentration, "rosa extraforte 50ml")
        .unwrap()
        .unwrap();
    assert_eq!(entry.action, "PARFUM");
    assert_eq!(entry.usage_count, 1);
    assert_eq!(entry.success_rate, 1.0);
}

#[test]
fn test_learned_entry_survives_new_orchestrator() {
    let store = Arc::new(KnowledgeStore::in_memory());
    store
        .add_entry(FieldType::Concentration, "extraforte", "PARFUM", 0.9, "operator")
        .unwrap();

    let orchestrator =
        ConversionOrchestrator::new(default_profile(), Some(Arc::clone(&store))).unwrap();
    let record = orchestrator
        .parse_description("VIOLA EXTRAFORTE 100ML", 1)
        .unwrap();

    assert_eq!(record.concentration, Some(Concentration::Parfum));
    assert_eq!(record.validation_state, Some(ValidationState::Valid));
}

#[test]
fn test_cancelled_conversion_returns_partial_result() {
    let orchestrator = ConversionOrchestrator::new(default_profile(), None).unwrap();
    let flag = orchestrator.cancellation_flag();
    flag.cancel();

    let grid = Grid::new(vec![
        row(&["CODE", "NAME", "PRICE"]),
        row(&["A1", "ROSA EDT 50ML", "1"]),
    ]);
    let result = orchestrator.convert_grid(&grid);

    assert!(result.cancelled);
    assert_eq!(result.valid_count, 0);
    assert!(result.summary().contains("已取消"));
}
