// ==========================================
// 商品导入系统 - 知识库仓储接口
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 强化/成功率计算在 KnowledgeStore 中完成
// ==========================================

use crate::domain::knowledge::KnowledgeEntry;
use crate::domain::types::FieldType;
use crate::knowledge::error::{KnowledgeError, KnowledgeResult};
use std::collections::HashMap;
use std::sync::RwLock;

// ==========================================
// KnowledgeRepository Trait
// ==========================================
// 实现者: InMemoryKnowledgeRepository, SqliteKnowledgeRepository
pub trait KnowledgeRepository: Send + Sync {
    /// 按 (字段类型, 规范化模式) 精确查找
    fn find_by_pattern(
        &self,
        rule_type: FieldType,
        pattern: &str,
    ) -> KnowledgeResult<Option<KnowledgeEntry>>;

    /// 按 ID 查找
    fn find_by_id(&self, entry_id: &str) -> KnowledgeResult<Option<KnowledgeEntry>>;

    /// 列出某字段类型的全部条目
    fn list_by_type(&self, rule_type: FieldType) -> KnowledgeResult<Vec<KnowledgeEntry>>;

    /// 列出全部条目（导出用）
    fn list_all(&self) -> KnowledgeResult<Vec<KnowledgeEntry>>;

    /// 插入新条目
    fn insert(&self, entry: &KnowledgeEntry) -> KnowledgeResult<()>;

    /// 更新已有条目（按 entry_id）
    fn update(&self, entry: &KnowledgeEntry) -> KnowledgeResult<()>;
}

// ==========================================
// InMemoryKnowledgeRepository - 内存实现
// ==========================================
// 读多写少: RwLock
#[derive(Default)]
pub struct InMemoryKnowledgeRepository {
    entries: RwLock<HashMap<String, KnowledgeEntry>>,
}

impl InMemoryKnowledgeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(
        &self,
    ) -> KnowledgeResult<std::sync::RwLockReadGuard<'_, HashMap<String, KnowledgeEntry>>> {
        self.entries
            .read()
            .map_err(|e| KnowledgeError::LockError(e.to_string()))
    }

    fn write(
        &self,
    ) -> KnowledgeResult<std::sync::RwLockWriteGuard<'_, HashMap<String, KnowledgeEntry>>> {
        self.entries
            .write()
            .map_err(|e| KnowledgeError::LockError(e.to_string()))
    }
}

impl KnowledgeRepository for InMemoryKnowledgeRepository {
    fn find_by_pattern(
        &self,
        rule_type: FieldType,
        pattern: &str,
    ) -> KnowledgeResult<Option<KnowledgeEntry>> {
        Ok(self
            .read()?
            .values()
            .find(|e| e.rule_type == rule_type && e.pattern == pattern)
            .cloned())
    }

    fn find_by_id(&self, entry_id: &str) -> KnowledgeResult<Option<KnowledgeEntry>> {
        Ok(self.read()?.get(entry_id).cloned())
    }

    fn list_by_type(&self, rule_type: FieldType) -> KnowledgeResult<Vec<KnowledgeEntry>> {
        let mut entries: Vec<KnowledgeEntry> = self
            .read()?
            .values()
            .filter(|e| e.rule_type == rule_type)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(entries)
    }

    fn list_all(&self) -> KnowledgeResult<Vec<KnowledgeEntry>> {
        let mut entries: Vec<KnowledgeEntry> = self.read()?.values().cloned().collect();
        entries.sort_by(|a, b| {
            a.rule_type
                .cmp(&b.rule_type)
                .then_with(|| a.pattern.cmp(&b.pattern))
        });
        Ok(entries)
    }

    fn insert(&self, entry: &KnowledgeEntry) -> KnowledgeResult<()> {
        let mut entries = self.write()?;
        if entries.contains_key(&entry.entry_id)
            || entries
                .values()
                .any(|e| e.rule_type == entry.rule_type && e.pattern == entry.pattern)
        {
            return Err(KnowledgeError::UniqueConstraintViolation(format!(
                "knowledge_entry({}, {})",
                entry.rule_type, entry.pattern
            )));
        }
        entries.insert(entry.entry_id.clone(), entry.clone());
        Ok(())
    }

    fn update(&self, entry: &KnowledgeEntry) -> KnowledgeResult<()> {
        let mut entries = self.write()?;
        match entries.get_mut(&entry.entry_id) {
            Some(existing) => {
                *existing = entry.clone();
                Ok(())
            }
            None => Err(KnowledgeError::NotFound {
                entity: "KnowledgeEntry".to_string(),
                id: entry.entry_id.clone(),
            }),
        }
    }
}
