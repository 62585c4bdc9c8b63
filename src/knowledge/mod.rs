// ==========================================
// 商品导入系统 - 知识/学习层
// ==========================================
// 职责: 人工修正沉淀为可复用的 模式 → 动作 条目,
//       在静态字典之前参与文本抽取
// 存储: 内存 / SQLite（knowledge_entry 表）
// ==========================================

pub mod error;
pub mod repository;
pub mod sqlite_repo;
pub mod store;

pub use error::{KnowledgeError, KnowledgeResult};
pub use repository::{InMemoryKnowledgeRepository, KnowledgeRepository};
pub use sqlite_repo::SqliteKnowledgeRepository;
pub use store::{KnowledgeStore, DEFAULT_MAX_EDIT_DISTANCE, DEFAULT_REINFORCEMENT_DELTA};
