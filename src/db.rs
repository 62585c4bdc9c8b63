// ==========================================
// 商品导入系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 知识库表结构按需创建（幂等）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 知识库建表语句
const KNOWLEDGE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS knowledge_entry (
    entry_id      TEXT PRIMARY KEY,
    rule_type     TEXT NOT NULL,
    pattern       TEXT NOT NULL,
    action        TEXT NOT NULL,
    confidence    REAL NOT NULL,
    usage_count   INTEGER NOT NULL DEFAULT 0,
    success_rate  REAL NOT NULL DEFAULT 1.0,
    created_at    TEXT NOT NULL,
    last_used_at  TEXT,
    author        TEXT NOT NULL,
    UNIQUE (rule_type, pattern)
);

CREATE INDEX IF NOT EXISTS idx_knowledge_entry_rule_type ON knowledge_entry (rule_type);
"#;

/// 知识库路径环境变量
pub const KNOWLEDGE_DB_ENV: &str = "PRODUCT_IMPORT_DB_PATH";

/// 默认知识库路径
///
/// 优先级: 环境变量 → 用户数据目录/product-import/knowledge.db → ./knowledge.db
pub fn default_knowledge_db_path() -> String {
    if let Ok(path) = std::env::var(KNOWLEDGE_DB_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./knowledge.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("product-import");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("knowledge.db");
        }
    }
    path.to_string_lossy().to_string()
}

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 创建知识库表结构并写入 schema_version（幂等）
pub fn ensure_knowledge_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(KNOWLEDGE_SCHEMA)?;
    if read_schema_version(conn)?.is_none() {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [CURRENT_SCHEMA_VERSION],
        )?;
    }
    Ok(())
}

/// 读取 schema_version（若表不存在或为空则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        ensure_knowledge_schema(&conn).unwrap();
        ensure_knowledge_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }
}
