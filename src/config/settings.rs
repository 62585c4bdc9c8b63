// ==========================================
// 商品导入系统 - 转换运行参数
// ==========================================
// 所有字段可在配置 JSON 中省略,缺省值见 Default 实现
// ==========================================

use crate::config::defaults;
use crate::domain::types::FieldType;
use crate::knowledge::{DEFAULT_MAX_EDIT_DISTANCE, DEFAULT_REINFORCEMENT_DELTA};
use serde::{Deserialize, Serialize};

// ==========================================
// ConversionSettings
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    /// 内嵌标题行判定: 命中表头关键字的最少个数
    pub inner_title_threshold: usize,

    /// 表头关键字（小写）
    pub header_keywords: Vec<String>,

    /// 知识库模糊匹配最大编辑距离
    pub fuzzy_max_distance: usize,

    /// 知识条目强化步长
    pub reinforcement_delta: f64,

    /// 抽取后仍缺失即视为低置信度的字段
    pub expected_fields: Vec<FieldType>,

    /// 写入知识库时的缺省作者
    pub default_author: String,

    /// 交给歧义处理器的候选上限
    pub max_candidates: usize,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            inner_title_threshold: 3,
            header_keywords: defaults::default_header_keywords(),
            fuzzy_max_distance: DEFAULT_MAX_EDIT_DISTANCE,
            reinforcement_delta: DEFAULT_REINFORCEMENT_DELTA,
            expected_fields: vec![FieldType::Concentration, FieldType::Size],
            default_author: "system".to_string(),
            max_candidates: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: ConversionSettings =
            serde_json::from_str(r#"{ "inner_title_threshold": 4 }"#).unwrap();
        assert_eq!(settings.inner_title_threshold, 4);
        assert_eq!(settings.fuzzy_max_distance, 2);
        assert_eq!(
            settings.expected_fields,
            vec![FieldType::Concentration, FieldType::Size]
        );
        assert!(!settings.header_keywords.is_empty());
    }
}
