// ==========================================
// ProductImporter 集成测试
// ==========================================
// 测试目标: 异步门面的单文件导入与批量导入
// ==========================================


use product_import::engine::AutoDefaultResolver;
use product_import::importer::CsvReader;
use product_import::{
    logging, ConversionOrchestrator, ImportError, KnowledgeStore, ProductImporter,
    ProductImporterImpl, ValidationState,
};
use std::sync::Arc;
use test_helpers::{create_csv, default_profile, ADP_DESCRIPTION};

fn create_test_importer() -> ProductImporterImpl {
    ProductImporterImpl::from_profile(
        default_profile(),
        Some(Arc::new(KnowledgeStore::in_memory())),
        Some(Arc::new(AutoDefaultResolver)),
    )
    .expect("Failed to create importer")
}

#[tokio::test]
async fn test_import_csv_basic() {
    // 初始化日志系统
    logging::init_test();

    let csv = create_csv(&format!(
        "CODICE;DESCRIZIONE;PREZZO\nA001;{};45,00\n\nA002;VIOLA EDP 100ML VAPO;60,50\n",
        ADP_DESCRIPTION
    ))
    .unwrap();
    let importer = create_test_importer();

    let result = importer.import_file(csv.path()).await;
    assert!(result.is_ok(), "Import should succeed: {:?}", result.err());

    let result = result.unwrap();
    assert_eq!(result.valid_count, 2);
    assert_eq!(result.skipped_count, 1, "空行计入跳过");
    assert_eq!(result.error_count, 0);

    // 空行保留在网格中,行号与源文件一致
    let second = &result.valid_records[1];
    assert_eq!(second.row_number, 4);
    assert_eq!(second.price, Some(60.5));
    assert_eq!(second.validation_state, Some(ValidationState::Valid));
}

#[tokio::test]
async fn test_import_unsupported_format() {
    let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    let importer = create_test_importer();

    let result = importer.import_file(file.path()).await;

    assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
}

#[tokio::test]
async fn test_batch_import_isolates_failures() {
    let good = create_csv("CODE,NAME,PRICE\nA1,ROSA EDT 50ML,10\n").unwrap();
    let empty = create_csv("").unwrap();
    let importer = create_test_importer();

    let results = importer
        .batch_import(vec![
            good.path().to_path_buf(),
            empty.path().to_path_buf(),
            std::path::PathBuf::from("/no/such/file.csv"),
        ])
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().map(|r| r.valid_count), Ok(1));
    assert!(results[1].is_err());
    assert!(results[2].as_ref().unwrap_err().contains("/no/such/file.csv"));
}

#[tokio::test]
async fn test_explicit_reader_delimiter() {
    // 显式指定分隔符时不做嗅探
    let csv = create_csv("CODE|NAME|PRICE\nA1|ROSA, EDT 50ML|10\n").unwrap();
    let orchestrator = ConversionOrchestrator::new(default_profile(), None).unwrap();
    let importer = ProductImporterImpl::new(orchestrator, Arc::new(CsvReader::with_delimiter(b'|')));

    let result = importer.import_file(csv.path()).await.unwrap();

    assert_eq!(result.valid_count, 1);
    assert_eq!(result.valid_records[0].name.as_deref(), Some("ROSA, EDT 50ML"));
}

#[tokio::test]
async fn test_cancellation_flag_is_shared() {
    let csv = create_csv("CODE,NAME,PRICE\nA1,ROSA EDT 50ML,10\n").unwrap();
    let importer = create_test_importer();
    importer.cancellation_flag().cancel();

    let result = importer.import_file(csv.path()).await.unwrap();

    assert!(result.cancelled);
    assert!(importer.orchestrator().cancellation_flag().is_cancelled());
}
