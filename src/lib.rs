// ==========================================
// 商品导入系统 - 核心库
// ==========================================
// 用途: 供应商商品文件 → 规范化商品记录
// 技术栈: Rust + SQLite（知识库）
// 管道: 读取 → 列映射 → 字段标准化 → 规则/字典抽取 → 歧义处理 → 知识学习
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 配置层 - 文件布局、规则、字典
pub mod config;

// 导入层 - 外部数据
pub mod importer;

// 引擎层 - 抽取与编排
pub mod engine;

// 知识库 - 学习到的修正
pub mod knowledge;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    Audience, Concentration, ConfidenceLevel, FieldType, ProductForm, UnitOfMeasure,
    ValidationState,
};

// 领域实体
pub use domain::{ConversionResult, KnowledgeEntry, ProductRecord, RowError};

// 配置
pub use config::{ConversionProfile, ConversionSettings, FileConfiguration};

// 引擎
pub use engine::{
    AmbiguityResolver, AutoDefaultResolver, CancellationFlag, ConversionOrchestrator,
    ExtractionEngine, InteractiveResolver,
};

// 导入
pub use importer::{ImportError, ImportResult, ProductImporter, ProductImporterImpl};

// 知识库
pub use knowledge::{KnowledgeError, KnowledgeStore, SqliteKnowledgeRepository};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "商品导入系统";
