// ==========================================
// 商品导入系统 - 引擎层
// ==========================================
// 职责: 文本抽取、歧义处理、模糊匹配、逐行编排
// 红线: 引擎不拼 SQL; 知识持久化只经 KnowledgeStore
// ==========================================

pub mod ambiguity;
pub mod extraction;
pub mod fuzzy;
pub mod orchestrator;

// 重导出核心引擎
pub use ambiguity::{AmbiguityResolver, AutoDefaultResolver, InteractiveResolver};
pub use extraction::{ExtractedField, ExtractionEngine, ExtractionOutcome, ExtractionSource};
pub use orchestrator::{CancellationFlag, ConversionOrchestrator};
