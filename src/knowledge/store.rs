// ==========================================
// 商品导入系统 - 知识/学习库
// ==========================================
// 职责: 人工修正 → 强化条目; 应用结果 → 成功率; 模糊检索
// 并发: 读可并发; 写（add_entry / update_success_rate）经单写锁串行化,
//       避免使用计数与置信度的丢失更新
// ==========================================

use crate::domain::knowledge::{normalize_pattern, KnowledgeEntry};
use crate::domain::types::FieldType;
use crate::engine::fuzzy;
use crate::knowledge::error::{KnowledgeError, KnowledgeResult};
use crate::knowledge::repository::{InMemoryKnowledgeRepository, KnowledgeRepository};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// 默认强化步长
pub const DEFAULT_REINFORCEMENT_DELTA: f64 = 0.1;

/// 默认模糊匹配最大编辑距离
pub const DEFAULT_MAX_EDIT_DISTANCE: usize = 2;

// ==========================================
// KnowledgeStore
// ==========================================
pub struct KnowledgeStore {
    repo: Arc<dyn KnowledgeRepository>,
    write_lock: Arc<Mutex<()>>, // 同一仓储的各视图共用
    reinforcement_delta: f64,
    max_edit_distance: usize,
}

impl KnowledgeStore {
    pub fn new(repo: Arc<dyn KnowledgeRepository>) -> Self {
        Self {
            repo,
            write_lock: Arc::new(Mutex::new(())),
            reinforcement_delta: DEFAULT_REINFORCEMENT_DELTA,
            max_edit_distance: DEFAULT_MAX_EDIT_DISTANCE,
        }
    }

    /// 纯内存知识库
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryKnowledgeRepository::new()))
    }

    /// 同一仓储、同一写锁,参数不同的视图
    pub fn configured(&self, reinforcement_delta: f64, max_edit_distance: usize) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            write_lock: Arc::clone(&self.write_lock),
            reinforcement_delta,
            max_edit_distance,
        }
    }

    pub fn reinforcement_delta(&self) -> f64 {
        self.reinforcement_delta
    }

    pub fn max_edit_distance(&self) -> usize {
        self.max_edit_distance
    }

    fn lock_writer(&self) -> KnowledgeResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| KnowledgeError::LockError(e.to_string()))
    }

    /// 登记一条修正
    ///
    /// # 规则
    /// - (rule_type, 规范化 pattern) 已存在: 置信度 += delta（封顶 1.0）, usage_count + 1;
    ///   若动作不同,则替换动作并以新置信度重新计
    /// - 否则新建条目（usage_count = 0）
    pub fn add_entry(
        &self,
        rule_type: FieldType,
        pattern: &str,
        action: &str,
        confidence: f64,
        author: &str,
    ) -> KnowledgeResult<KnowledgeEntry> {
        let normalized = normalize_pattern(pattern);
        let action = action.trim();
        if normalized.is_empty() {
            return Err(KnowledgeError::FieldValueError {
                field: "pattern".to_string(),
                message: "模式不能为空".to_string(),
            });
        }
        if action.is_empty() {
            return Err(KnowledgeError::FieldValueError {
                field: "action".to_string(),
                message: "动作不能为空".to_string(),
            });
        }

        let _guard = self.lock_writer()?;

        match self.repo.find_by_pattern(rule_type, &normalized)? {
            Some(mut entry) => {
                if entry.action == action {
                    entry.confidence = fuzzy::reinforce(entry.confidence, self.reinforcement_delta);
                } else {
                    debug!(
                        entry_id = %entry.entry_id,
                        old_action = %entry.action,
                        new_action = %action,
                        "知识条目动作被修正"
                    );
                    entry.action = action.to_string();
                    entry.confidence = confidence.clamp(0.0, fuzzy::MAX_CONFIDENCE);
                }
                entry.usage_count += 1;
                entry.author = author.to_string();
                self.repo.update(&entry)?;

                debug!(
                    entry_id = %entry.entry_id,
                    confidence = entry.confidence,
                    usage_count = entry.usage_count,
                    "知识条目已强化"
                );
                Ok(entry)
            }
            None => {
                let entry = KnowledgeEntry::new(rule_type, normalized, action, confidence, author);
                self.repo.insert(&entry)?;

                info!(
                    entry_id = %entry.entry_id,
                    rule_type = %rule_type,
                    pattern = %entry.pattern,
                    action = %entry.action,
                    "新增知识条目"
                );
                Ok(entry)
            }
        }
    }

    /// 记录一次应用结果
    ///
    /// usage_count + 1, 刷新 last_used_at,
    /// success_rate = ((usage_count - 1) * success_rate + outcome) / usage_count
    pub fn update_success_rate(
        &self,
        entry_id: &str,
        was_successful: bool,
    ) -> KnowledgeResult<KnowledgeEntry> {
        let _guard = self.lock_writer()?;

        let mut entry = self
            .repo
            .find_by_id(entry_id)?
            .ok_or_else(|| KnowledgeError::NotFound {
                entity: "KnowledgeEntry".to_string(),
                id: entry_id.to_string(),
            })?;

        entry.usage_count += 1;
        entry.last_used_at = Some(Utc::now());
        entry.success_rate =
            fuzzy::weighted_success_rate(entry.success_rate, entry.usage_count, was_successful);
        self.repo.update(&entry)?;

        debug!(
            entry_id = %entry.entry_id,
            was_successful,
            success_rate = entry.success_rate,
            usage_count = entry.usage_count,
            "知识条目应用结果已记录"
        );
        Ok(entry)
    }

    /// 检索适用条目
    ///
    /// 模式与上下文双向包含,或编辑距离 ≤ max_edit_distance;
    /// 按 confidence × success_rate 降序
    pub fn find_applicable_rules(
        &self,
        rule_type: FieldType,
        context: &str,
    ) -> KnowledgeResult<Vec<KnowledgeEntry>> {
        let context = normalize_pattern(context);
        if context.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches: Vec<KnowledgeEntry> = self
            .repo
            .list_by_type(rule_type)?
            .into_iter()
            .filter(|e| fuzzy::is_fuzzy_match(&e.pattern, &context, self.max_edit_distance))
            .collect();

        matches.sort_by(|a, b| {
            b.weight()
                .partial_cmp(&a.weight())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(matches)
    }

    /// 最优适用条目
    pub fn best_match(
        &self,
        rule_type: FieldType,
        context: &str,
    ) -> KnowledgeResult<Option<KnowledgeEntry>> {
        Ok(self
            .find_applicable_rules(rule_type, context)?
            .into_iter()
            .next())
    }

    /// 导出全部条目
    pub fn export_entries(&self) -> KnowledgeResult<Vec<KnowledgeEntry>> {
        self.repo.list_all()
    }

    /// 导出为 JSON（离线检查 / 跨环境迁移）
    pub fn export_json(&self) -> KnowledgeResult<String> {
        Ok(serde_json::to_string_pretty(&self.export_entries()?)?)
    }

    /// 导入条目
    ///
    /// 先校验全部条目,任一无效则整批不写入;
    /// 同 (rule_type, pattern) 已存在时,仅当导入条目权重更高才覆盖（保留本地 ID）
    ///
    /// # 返回
    /// - 新增或覆盖的条目数
    pub fn import_entries(&self, entries: Vec<KnowledgeEntry>) -> KnowledgeResult<usize> {
        let mut validated = Vec::with_capacity(entries.len());
        for mut incoming in entries {
            incoming.pattern = normalize_pattern(&incoming.pattern);
            incoming.action = incoming.action.trim().to_string();
            if incoming.pattern.is_empty() || incoming.action.is_empty() {
                return Err(KnowledgeError::ValidationError(format!(
                    "导入条目缺少模式或动作: {}",
                    incoming.entry_id
                )));
            }
            validated.push(incoming);
        }

        let _guard = self.lock_writer()?;

        let mut applied = 0;
        for mut incoming in validated {
            match self
                .repo
                .find_by_pattern(incoming.rule_type, &incoming.pattern)?
            {
                Some(existing) => {
                    if incoming.weight() > existing.weight() {
                        incoming.entry_id = existing.entry_id;
                        self.repo.update(&incoming)?;
                        applied += 1;
                    }
                }
                None => {
                    if self.repo.find_by_id(&incoming.entry_id)?.is_some() {
                        incoming.entry_id = uuid::Uuid::new_v4().to_string();
                    }
                    self.repo.insert(&incoming)?;
                    applied += 1;
                }
            }
        }

        info!(applied, "知识条目导入完成");
        Ok(applied)
    }

    /// 从 JSON 导入
    pub fn import_json(&self, json: &str) -> KnowledgeResult<usize> {
        let entries: Vec<KnowledgeEntry> = serde_json::from_str(json)?;
        self.import_entries(entries)
    }

    /// 条目总数
    pub fn len(&self) -> KnowledgeResult<usize> {
        Ok(self.repo.list_all()?.len())
    }

    pub fn is_empty(&self) -> KnowledgeResult<bool> {
        Ok(self.len()? == 0)
    }
}
