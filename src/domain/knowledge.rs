// ==========================================
// 商品导入系统 - 知识条目模型
// ==========================================
// 用途: 人工确认的修正 → 可复用的 模式 → 动作 映射
// 对齐: knowledge_entry 表
// ==========================================

use crate::domain::types::FieldType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// KnowledgeEntry - 知识条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub entry_id: String,          // 条目 ID（UUID）
    pub rule_type: FieldType,      // 适用字段类型
    pub pattern: String,           // 规范化后的模式文本
    pub action: String,            // 解析动作（规范值）
    pub confidence: f64,           // 置信度 0..=1
    pub usage_count: i64,          // 应用次数
    pub success_rate: f64,         // 成功率 0..=1（滑动加权平均）
    pub created_at: DateTime<Utc>, // 创建时间
    pub last_used_at: Option<DateTime<Utc>>, // 最后应用时间
    pub author: String,            // 录入人
}

impl KnowledgeEntry {
    /// 新建条目（usage_count = 0, success_rate = 1.0）
    pub fn new(
        rule_type: FieldType,
        pattern: impl Into<String>,
        action: impl Into<String>,
        confidence: f64,
        author: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4().to_string(),
            rule_type,
            pattern: pattern.into(),
            action: action.into(),
            confidence: confidence.clamp(0.0, 1.0),
            usage_count: 0,
            success_rate: 1.0,
            created_at: Utc::now(),
            last_used_at: None,
            author: author.into(),
        }
    }

    /// 排序权重: confidence × success_rate
    pub fn weight(&self) -> f64 {
        self.confidence * self.success_rate
    }
}

/// 模式规范化: 小写 + 去首尾空白 + 空白折叠
pub fn normalize_pattern(pattern: &str) -> String {
    pattern
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
