// ==========================================
// 商品导入系统 - 知识库错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 知识库错误类型
#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("知识库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    #[error("序列化失败: {0}")]
    SerializationError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for KnowledgeError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    KnowledgeError::UniqueConstraintViolation(msg)
                } else {
                    KnowledgeError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => KnowledgeError::NotFound {
                entity: "KnowledgeEntry".to_string(),
                id: "Unknown".to_string(),
            },
            _ => KnowledgeError::DatabaseQueryError(err.to_string()),
        }
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for KnowledgeError {
    fn from(err: serde_json::Error) -> Self {
        KnowledgeError::SerializationError(err.to_string())
    }
}

/// Result 类型别名
pub type KnowledgeResult<T> = Result<T, KnowledgeError>;
