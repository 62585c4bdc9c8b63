// ==========================================
// 商品导入系统 - 导入层
// ==========================================
// 职责: 外部文件读取、列映射、字段标准化、异步导入门面
// 支持: CSV / TXT / TSV, XLSX / XLS / ODS
// ==========================================

// 模块声明
pub mod column_mapper;
pub mod error;
pub mod field_normalizer;
pub mod file_parser;
pub mod product_importer_impl;
pub mod product_importer_trait;

// 重导出核心类型
pub use column_mapper::ColumnMapper;
pub use error::{ImportError, ImportResult};
pub use field_normalizer::FieldNormalizer;
pub use file_parser::{CsvReader, ExcelReader, Grid, UniversalFileParser};
pub use product_importer_impl::ProductImporterImpl;

// 重导出 Trait 接口
pub use product_importer_trait::{ProductImporter, TabularReader};
