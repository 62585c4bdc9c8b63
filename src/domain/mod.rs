// ==========================================
// 商品导入系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod ambiguity;
pub mod knowledge;
pub mod product;
pub mod rule;
pub mod types;

// 重导出核心类型
pub use ambiguity::{AmbiguityContext, Candidate, Resolution};
pub use knowledge::{normalize_pattern, KnowledgeEntry};
pub use product::{ConversionResult, ProductRecord, RowError};
pub use rule::{Dictionary, DictionarySet, IgnorePattern, ParsingRule};
pub use types::{
    Audience, CanonicalValue, Concentration, ConfidenceLevel, FieldType, ProductForm,
    UnitOfMeasure, ValidationState,
};
