// ==========================================
// 商品导入系统 - 歧义上下文模型
// ==========================================
// 用途: 低置信度字段交由歧义处理器决策时的输入/输出
// 红线: 上下文只读,处理器不得修改部分记录
// ==========================================

use crate::domain::product::ProductRecord;
use crate::domain::types::FieldType;
use serde::{Deserialize, Serialize};

// ==========================================
// AmbiguityContext - 歧义上下文
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct AmbiguityContext<'a> {
    pub row_number: usize,
    pub original_text: &'a str,
    pub field: FieldType,
    pub token: Option<&'a str>, // 未能解析的原始片段（字段缺失时为 None）
    pub partial_record: &'a ProductRecord,
    pub confidence: f64,
}

// ==========================================
// Candidate - 候选值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub value: String,  // 规范值
    pub score: f64,     // 匹配得分 0..=1
    pub reason: String, // 候选来源说明
}

impl Candidate {
    pub fn new(value: impl Into<String>, score: f64, reason: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            score,
            reason: reason.into(),
        }
    }
}

// ==========================================
// Resolution - 决策结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Selected(Candidate), // 选定候选
    Skip,                // 跳过（使用默认值）
}
