// ==========================================
// 商品导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 传播策略: 配置错误/读取错误立即上抛; 行级错误就地收敛
// ==========================================

use crate::knowledge::KnowledgeError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 配置错误（致命,处理任何行之前抛出）=====
    #[error("配置错误: {0}")]
    ConfigurationError(String),

    #[error("规则正则无效 (规则 {rule}): {message}")]
    InvalidPattern { rule: String, message: String },

    // ===== 文件相关错误（致命）=====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.xlsm/.ods/.csv/.txt）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("文件无数据: {0}")]
    EmptySource(String),

    // ===== 行级错误（可恢复）=====
    #[error("行解析失败 (行 {row}, 字段 {field}): {message}")]
    RowParseError {
        row: usize,
        field: String,
        value: String,
        message: String,
    },

    #[error("字段标准化失败 (字段 {field}, 值 {value}): {message}")]
    FieldNormalizationError {
        field: String,
        value: String,
        message: String,
    },

    #[error("歧义未解决 (行 {row}, 字段 {field})")]
    AmbiguityUnresolved { row: usize, field: String },

    // ===== 知识库错误 =====
    #[error("知识库操作失败: {0}")]
    Knowledge(#[from] KnowledgeError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否为致命错误（中止整个转换）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ImportError::ConfigurationError(_)
                | ImportError::InvalidPattern { .. }
                | ImportError::FileNotFound(_)
                | ImportError::UnsupportedFormat(_)
                | ImportError::FileReadError(_)
                | ImportError::ExcelParseError(_)
                | ImportError::CsvParseError(_)
                | ImportError::EmptySource(_)
        )
    }

    /// 错误关联字段（行级诊断用）
    pub fn field(&self) -> &str {
        match self {
            ImportError::RowParseError { field, .. }
            | ImportError::FieldNormalizationError { field, .. }
            | ImportError::AmbiguityUnresolved { field, .. } => field,
            _ => "row",
        }
    }

    /// 错误关联原始值
    pub fn value(&self) -> &str {
        match self {
            ImportError::RowParseError { value, .. }
            | ImportError::FieldNormalizationError { value, .. } => value,
            _ => "",
        }
    }

    /// 不带位置前缀的描述
    pub fn detail(&self) -> String {
        match self {
            ImportError::RowParseError { message, .. }
            | ImportError::FieldNormalizationError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<regex::Error>（规则名未知时的兜底）
impl From<regex::Error> for ImportError {
    fn from(err: regex::Error) -> Self {
        ImportError::InvalidPattern {
            rule: "<unnamed>".to_string(),
            message: err.to_string(),
        }
    }
}

// 实现 From<serde_json::Error>（配置来源格式错误）
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::ConfigurationError(format!("配置 JSON 格式错误: {}", err))
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ImportError::ConfigurationError("x".into()).is_fatal());
        assert!(ImportError::EmptySource("a.csv".into()).is_fatal());
        assert!(!ImportError::RowParseError {
            row: 3,
            field: "row".into(),
            value: String::new(),
            message: "列数不足".into(),
        }
        .is_fatal());
        assert!(!ImportError::AmbiguityUnresolved {
            row: 3,
            field: "brand".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_row_error_accessors() {
        let err = ImportError::RowParseError {
            row: 7,
            field: "code".into(),
            value: "  ".into(),
            message: "编码为空".into(),
        };
        assert_eq!(err.field(), "code");
        assert_eq!(err.value(), "  ");
        assert_eq!(err.detail(), "编码为空");
        assert!(err.to_string().contains("行 7"));
    }

    #[test]
    fn test_json_error_is_configuration_error() {
        let err: ImportError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, ImportError::ConfigurationError(_)));
    }
}
