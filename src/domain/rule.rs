// ==========================================
// 商品导入系统 - 解析规则与字典模型
// ==========================================
// 职责: 解析规则、关键字字典、忽略模式（纯数据,可 JSON 配置）
// ==========================================

use crate::domain::types::FieldType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// ParsingRule - 解析规则
// ==========================================
// priority 升序 = 优先级降序（1 优先于 2）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingRule {
    pub name: String,
    pub pattern: String,
    pub target_field: FieldType,
    pub priority: i32,

    /// 需要提取的捕获组序号（空 = 整体匹配）
    #[serde(default)]
    pub capture_groups: Vec<usize>,

    #[serde(default)]
    pub case_sensitive: bool,

    /// 命中后不再评估该字段的后续规则
    #[serde(default)]
    pub stop_on_match: bool,

    /// 允许覆盖已赋值字段（缺省: 首次命中为准）
    #[serde(default)]
    pub allow_override: bool,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ParsingRule {
    pub fn new(
        name: impl Into<String>,
        pattern: impl Into<String>,
        target_field: FieldType,
        priority: i32,
    ) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            target_field,
            priority,
            capture_groups: Vec::new(),
            case_sensitive: false,
            stop_on_match: false,
            allow_override: false,
            enabled: true,
        }
    }

    pub fn with_groups(mut self, groups: &[usize]) -> Self {
        self.capture_groups = groups.to_vec();
        self
    }

    pub fn stop_on_match(mut self) -> Self {
        self.stop_on_match = true;
        self
    }

    pub fn allow_override(mut self) -> Self {
        self.allow_override = true;
        self
    }
}

// ==========================================
// Dictionary - 关键字字典
// ==========================================
// 关键字 → 规范值,按字段类型划分
// 反序列化经 DictionaryDef 重新登记,配置中的关键字与 insert 同样规范化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DictionaryDef")]
pub struct Dictionary {
    pub field: FieldType,

    #[serde(default)]
    pub case_sensitive: bool,

    pub entries: HashMap<String, String>,
}

#[derive(Deserialize)]
struct DictionaryDef {
    field: FieldType,

    #[serde(default)]
    case_sensitive: bool,

    #[serde(default)]
    entries: HashMap<String, String>,
}

impl From<DictionaryDef> for Dictionary {
    fn from(def: DictionaryDef) -> Self {
        let mut dict = Dictionary::new(def.field);
        dict.case_sensitive = def.case_sensitive;
        for (keyword, canonical) in &def.entries {
            dict.insert(keyword, canonical);
        }
        dict
    }
}

impl Dictionary {
    pub fn new(field: FieldType) -> Self {
        Self {
            field,
            case_sensitive: false,
            entries: HashMap::new(),
        }
    }

    /// 批量登记同义词 → 同一规范值
    pub fn with_synonyms(mut self, canonical: &str, keywords: &[&str]) -> Self {
        for keyword in keywords {
            self.insert(keyword, canonical);
        }
        self
    }

    pub fn insert(&mut self, keyword: &str, canonical: &str) {
        let key = self.key_of(keyword);
        self.entries.insert(key, canonical.to_string());
    }

    /// 精确查找（空白折叠,默认大小写不敏感）
    pub fn lookup(&self, keyword: &str) -> Option<&str> {
        self.entries.get(&self.key_of(keyword)).map(|s| s.as_str())
    }

    /// 去重后的规范值列表
    pub fn canonical_values(&self) -> Vec<&str> {
        let mut values: Vec<&str> = self.entries.values().map(|s| s.as_str()).collect();
        values.sort_unstable();
        values.dedup();
        values
    }

    /// 按当前大小写设置重新登记全部关键字
    pub fn rekeyed(&self) -> Self {
        let mut dict = Dictionary::new(self.field);
        dict.case_sensitive = self.case_sensitive;
        for (keyword, canonical) in &self.entries {
            dict.insert(keyword, canonical);
        }
        dict
    }

    fn key_of(&self, keyword: &str) -> String {
        let collapsed = keyword.split_whitespace().collect::<Vec<_>>().join(" ");
        if self.case_sensitive {
            collapsed
        } else {
            collapsed.to_lowercase()
        }
    }
}

// ==========================================
// DictionarySet - 按字段汇总的字典集
// ==========================================
// 同一字段的多本字典合并; 后登记的同名关键字覆盖先登记的
#[derive(Debug, Clone, Default)]
pub struct DictionarySet {
    by_field: HashMap<FieldType, Dictionary>,
}

impl DictionarySet {
    pub fn from_dictionaries(dictionaries: &[Dictionary]) -> Self {
        let mut by_field: HashMap<FieldType, Dictionary> = HashMap::new();
        for dict in dictionaries {
            match by_field.get_mut(&dict.field) {
                Some(existing) => {
                    for (keyword, canonical) in &dict.entries {
                        existing.insert(keyword, canonical);
                    }
                }
                None => {
                    by_field.insert(dict.field, dict.rekeyed());
                }
            }
        }
        Self { by_field }
    }

    pub fn get(&self, field: FieldType) -> Option<&Dictionary> {
        self.by_field.get(&field)
    }

    /// 精确查找
    pub fn lookup(&self, field: FieldType, keyword: &str) -> Option<&str> {
        self.get(field).and_then(|d| d.lookup(keyword))
    }

    /// 按词边界在文本中查找关键字,最长关键字优先
    ///
    /// "EDT Spray 100" → edt; "roll-on" 与 "roll on" 等价
    pub fn find_contained(&self, field: FieldType, text: &str) -> Option<&str> {
        let dict = self.get(field)?;
        let haystack = format!(" {} ", word_normalize(text));

        dict.entries
            .iter()
            .map(|(keyword, canonical)| (word_normalize(keyword), canonical))
            .filter(|(keyword, _)| !keyword.is_empty())
            .filter(|(keyword, _)| haystack.contains(&format!(" {} ", keyword)))
            .max_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| b.0.cmp(&a.0)))
            .map(|(_, canonical)| canonical.as_str())
    }
}

/// 小写 + 非字母数字替换为空格 + 空白折叠
fn word_normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ==========================================
// IgnorePattern - 忽略模式
// ==========================================
// 命中片段在规则抽取前从工作文本中剔除
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnorePattern {
    pub name: String,
    pub pattern: String,
}

impl IgnorePattern {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}
