// ==========================================
// 商品导入系统 - 知识库 SQLite 仓储
// ==========================================
// 对齐: db.rs knowledge_entry 表
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::db::{configure_sqlite_connection, ensure_knowledge_schema, open_sqlite_connection};
use crate::domain::knowledge::KnowledgeEntry;
use crate::domain::types::FieldType;
use crate::knowledge::error::{KnowledgeError, KnowledgeResult};
use crate::knowledge::repository::KnowledgeRepository;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = "entry_id, rule_type, pattern, action, confidence, usage_count, \
     success_rate, created_at, last_used_at, author";

// ==========================================
// SqliteKnowledgeRepository
// ==========================================
pub struct SqliteKnowledgeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKnowledgeRepository {
    /// 打开（或创建）知识库文件
    pub fn new(db_path: &str) -> KnowledgeResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| KnowledgeError::DatabaseConnectionError(e.to_string()))?;
        ensure_knowledge_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（会再次应用 PRAGMA 与建表,幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> KnowledgeResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| KnowledgeError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            ensure_knowledge_schema(&guard)?;
        }

        Ok(Self { conn })
    }

    /// 内存库（测试/一次性批处理）
    pub fn in_memory() -> KnowledgeResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn get_conn(&self) -> KnowledgeResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| KnowledgeError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<KnowledgeEntry> {
        let rule_type_raw: String = row.get(1)?;
        let rule_type = rule_type_raw.parse::<FieldType>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, e.into())
        })?;

        Ok(KnowledgeEntry {
            entry_id: row.get(0)?,
            rule_type,
            pattern: row.get(2)?,
            action: row.get(3)?,
            confidence: row.get(4)?,
            usage_count: row.get(5)?,
            success_rate: row.get(6)?,
            created_at: row.get(7)?,
            last_used_at: row.get(8)?,
            author: row.get(9)?,
        })
    }

    fn query_entries(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> KnowledgeResult<Vec<KnowledgeEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::map_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

impl KnowledgeRepository for SqliteKnowledgeRepository {
    fn find_by_pattern(
        &self,
        rule_type: FieldType,
        pattern: &str,
    ) -> KnowledgeResult<Option<KnowledgeEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM knowledge_entry WHERE rule_type = ?1 AND pattern = ?2",
            SELECT_COLUMNS
        );
        let entry = conn
            .query_row(&sql, params![rule_type.as_str(), pattern], Self::map_row)
            .optional()?;
        Ok(entry)
    }

    fn find_by_id(&self, entry_id: &str) -> KnowledgeResult<Option<KnowledgeEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM knowledge_entry WHERE entry_id = ?1",
            SELECT_COLUMNS
        );
        let entry = conn
            .query_row(&sql, params![entry_id], Self::map_row)
            .optional()?;
        Ok(entry)
    }

    fn list_by_type(&self, rule_type: FieldType) -> KnowledgeResult<Vec<KnowledgeEntry>> {
        let sql = format!(
            "SELECT {} FROM knowledge_entry WHERE rule_type = ?1 ORDER BY created_at",
            SELECT_COLUMNS
        );
        self.query_entries(&sql, &[&rule_type.as_str()])
    }

    fn list_all(&self) -> KnowledgeResult<Vec<KnowledgeEntry>> {
        let sql = format!(
            "SELECT {} FROM knowledge_entry ORDER BY rule_type, pattern",
            SELECT_COLUMNS
        );
        self.query_entries(&sql, &[])
    }

    fn insert(&self, entry: &KnowledgeEntry) -> KnowledgeResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO knowledge_entry (
                entry_id, rule_type, pattern, action, confidence, usage_count,
                success_rate, created_at, last_used_at, author
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                entry.entry_id,
                entry.rule_type.as_str(),
                entry.pattern,
                entry.action,
                entry.confidence,
                entry.usage_count,
                entry.success_rate,
                entry.created_at,
                entry.last_used_at,
                entry.author,
            ],
        )?;
        Ok(())
    }

    fn update(&self, entry: &KnowledgeEntry) -> KnowledgeResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE knowledge_entry
               SET action = ?2, confidence = ?3, usage_count = ?4,
                   success_rate = ?5, last_used_at = ?6, author = ?7
             WHERE entry_id = ?1
            "#,
            params![
                entry.entry_id,
                entry.action,
                entry.confidence,
                entry.usage_count,
                entry.success_rate,
                entry.last_used_at,
                entry.author,
            ],
        )?;

        if rows == 0 {
            return Err(KnowledgeError::NotFound {
                entity: "KnowledgeEntry".to_string(),
                id: entry.entry_id.clone(),
            });
        }
        Ok(())
    }
}
