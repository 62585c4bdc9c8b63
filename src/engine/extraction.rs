// ==========================================
// 商品导入系统 - 规则/字典抽取引擎
// ==========================================
// 职责: 从非结构化描述文本中抽取类型化属性
// 流程: 剔除忽略模式 → 按优先级评估规则 → 知识库优先、字典其次 → 置信度定级
// 红线: 不覆盖已赋值字段（除非规则 allow_override）; 不调用歧义处理器
// ==========================================

use crate::config::profile::ConversionProfile;
use crate::domain::product::ProductRecord;
use crate::domain::rule::{DictionarySet, ParsingRule};
use crate::domain::types::{ConfidenceLevel, FieldType};
use crate::importer::error::{ImportError, ImportResult};
use crate::knowledge::KnowledgeStore;
use regex::{Captures, Regex, RegexBuilder};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// 规则未命中时仍可通过知识库以整段文本补全的字段
const LEARNABLE_FIELDS: [FieldType; 7] = [
    FieldType::Brand,
    FieldType::Concentration,
    FieldType::Form,
    FieldType::Audience,
    FieldType::Size,
    FieldType::Unit,
    FieldType::Origin,
];

// ==========================================
// 抽取结果
// ==========================================

/// 字段值来源
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionSource {
    Knowledge { entry_id: String }, // 知识库条目
    Dictionary,                     // 静态字典
    RawToken,                       // 正则原始片段
    Unresolved,                     // 未能解析
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedField {
    pub field: FieldType,
    pub token: Option<String>, // 命中片段（字段缺失时为 None）
    pub rule: Option<String>,  // 命中规则名
    pub confidence: ConfidenceLevel,
    pub source: ExtractionSource,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    pub working_text: String, // 剔除忽略模式后的文本
    pub fields: Vec<ExtractedField>,
}

impl ExtractionOutcome {
    pub fn confidence_of(&self, field: FieldType) -> Option<ConfidenceLevel> {
        self.fields
            .iter()
            .filter(|f| f.field == field)
            .map(|f| f.confidence)
            .max()
    }

    /// 需交给歧义处理器的字段
    pub fn low_confidence(&self) -> impl Iterator<Item = &ExtractedField> {
        self.fields
            .iter()
            .filter(|f| f.confidence == ConfidenceLevel::Low)
    }

    /// 本次应用的知识条目 ID
    pub fn applied_entries(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter_map(|f| match &f.source {
                ExtractionSource::Knowledge { entry_id } => Some(entry_id.as_str()),
                _ => None,
            })
            .collect()
    }
}

// ==========================================
// ExtractionEngine
// ==========================================

struct CompiledRule {
    rule: ParsingRule,
    regex: Regex,
}

pub struct ExtractionEngine {
    rules: Vec<CompiledRule>, // priority 升序,同优先级保持声明顺序
    ignore_patterns: Vec<(String, Regex)>,
    dictionaries: Arc<DictionarySet>,
    knowledge: Option<Arc<KnowledgeStore>>,
    expected_fields: Vec<FieldType>,
}

impl ExtractionEngine {
    /// 编译规则与忽略模式
    ///
    /// # 返回
    /// - Err(InvalidPattern): 任一正则无法编译（配置错误,致命）
    pub fn new(
        profile: &ConversionProfile,
        dictionaries: Arc<DictionarySet>,
        knowledge: Option<Arc<KnowledgeStore>>,
    ) -> ImportResult<Self> {
        let mut rules = profile
            .rules
            .iter()
            .map(|rule| {
                let regex = RegexBuilder::new(&rule.pattern)
                    .case_insensitive(!rule.case_sensitive)
                    .build()
                    .map_err(|e| ImportError::InvalidPattern {
                        rule: rule.name.clone(),
                        message: e.to_string(),
                    })?;
                Ok(CompiledRule {
                    rule: rule.clone(),
                    regex,
                })
            })
            .collect::<ImportResult<Vec<_>>>()?;

        // 稳定排序: 同优先级按声明顺序
        rules.sort_by_key(|c| c.rule.priority);

        let ignore_patterns = profile
            .ignore_patterns
            .iter()
            .map(|p| {
                Regex::new(&p.pattern)
                    .map(|regex| (p.name.clone(), regex))
                    .map_err(|e| ImportError::InvalidPattern {
                        rule: p.name.clone(),
                        message: e.to_string(),
                    })
            })
            .collect::<ImportResult<Vec<_>>>()?;

        debug!(
            rules = rules.len(),
            ignore_patterns = ignore_patterns.len(),
            knowledge = knowledge.is_some(),
            "抽取引擎已初始化"
        );

        Ok(Self {
            rules,
            ignore_patterns,
            dictionaries,
            knowledge,
            expected_fields: profile.settings.expected_fields.clone(),
        })
    }

    pub fn dictionaries(&self) -> &Arc<DictionarySet> {
        &self.dictionaries
    }

    /// 剔除忽略模式命中片段
    ///
    /// 模式含捕获组 1 时只剔除组 1,其余部分保留
    pub fn strip_ignored(&self, text: &str) -> String {
        let mut working = text.to_string();
        for (name, regex) in &self.ignore_patterns {
            let stripped = regex.replace_all(&working, |caps: &Captures<'_>| {
                let whole = &caps[0];
                match (caps.get(0), caps.get(1)) {
                    (Some(m), Some(group)) => format!(
                        "{} {}",
                        &whole[..group.start() - m.start()],
                        &whole[group.end() - m.start()..]
                    ),
                    _ => " ".to_string(),
                }
            });
            // 未命中时 replace_all 返回借用
            if let Cow::Owned(replaced) = stripped {
                debug!(pattern = %name, "忽略模式命中");
                working = replaced;
            }
        }
        working.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// 抽取文本属性并合并到记录
    pub fn extract(&self, text: &str, record: &mut ProductRecord) -> ExtractionOutcome {
        let working = self.strip_ignored(text);
        let mut outcome = ExtractionOutcome {
            working_text: working.clone(),
            fields: Vec::new(),
        };
        let mut stopped: HashSet<FieldType> = HashSet::new();

        for compiled in &self.rules {
            let rule = &compiled.rule;
            let field = rule.target_field;

            if !rule.enabled || field.is_ignore() || stopped.contains(&field) {
                continue;
            }
            if record.is_set(field) && !rule.allow_override {
                continue;
            }

            let Some(caps) = compiled.regex.captures(&working) else {
                continue;
            };

            let tokens: Vec<&str> = if rule.capture_groups.is_empty() {
                caps.get(0).map(|m| m.as_str()).into_iter().collect()
            } else {
                rule.capture_groups
                    .iter()
                    .filter_map(|g| caps.get(*g))
                    .map(|m| m.as_str().trim())
                    .filter(|t| !t.is_empty())
                    .collect()
            };
            if tokens.is_empty() {
                continue;
            }

            let extracted = self.assign_first(field, &tokens, record, rule);
            debug!(
                row_number = record.row_number,
                rule = %rule.name,
                field = %field,
                token = ?extracted.token,
                confidence = ?extracted.confidence,
                "规则命中"
            );
            outcome.fields.push(extracted);

            if rule.stop_on_match {
                stopped.insert(field);
            }
        }

        // 规则未覆盖的字段: 以整段文本查询知识库
        for field in LEARNABLE_FIELDS {
            if record.is_set(field) || stopped.contains(&field) {
                continue;
            }
            if let Some(extracted) = self.assign_learned(field, &working, None, record) {
                outcome.fields.push(extracted);
            }
        }

        // 期望字段仍缺失 → 低置信度
        for &field in &self.expected_fields {
            if !record.is_set(field) && outcome.confidence_of(field).is_none() {
                outcome.fields.push(ExtractedField {
                    field,
                    token: None,
                    rule: None,
                    confidence: ConfidenceLevel::Low,
                    source: ExtractionSource::Unresolved,
                });
            }
        }

        outcome
    }

    /// 依次尝试各片段,取第一个可赋值者
    fn assign_first(
        &self,
        field: FieldType,
        tokens: &[&str],
        record: &mut ProductRecord,
        rule: &ParsingRule,
    ) -> ExtractedField {
        let mut fallback: Option<ExtractedField> = None;

        for token in tokens {
            let extracted = self.assign_token(field, token, record, rule);
            if extracted.confidence != ConfidenceLevel::Low {
                return extracted;
            }
            fallback.get_or_insert(extracted);
        }

        fallback.unwrap_or(ExtractedField {
            field,
            token: None,
            rule: Some(rule.name.clone()),
            confidence: ConfidenceLevel::Low,
            source: ExtractionSource::Unresolved,
        })
    }

    /// 单个片段: 知识库 → 字典 → 原始片段
    fn assign_token(
        &self,
        field: FieldType,
        token: &str,
        record: &mut ProductRecord,
        rule: &ParsingRule,
    ) -> ExtractedField {
        if let Some(mut learned) = self.assign_learned(field, token, Some(token), record) {
            learned.rule = Some(rule.name.clone());
            return learned;
        }

        let dictionary_hit = self
            .dictionaries
            .lookup(field, token)
            .map_or(false, |canonical| record.apply_canonical(field, canonical));

        let (confidence, source) = if dictionary_hit {
            (ConfidenceLevel::High, ExtractionSource::Dictionary)
        } else if record.apply_canonical(field, token) {
            (ConfidenceLevel::Medium, ExtractionSource::RawToken)
        } else {
            (ConfidenceLevel::Low, ExtractionSource::Unresolved)
        };

        ExtractedField {
            field,
            token: Some(token.to_string()),
            rule: Some(rule.name.clone()),
            confidence,
            source,
        }
    }

    /// 知识库最优条目（读失败只记日志）
    fn assign_learned(
        &self,
        field: FieldType,
        context: &str,
        token: Option<&str>,
        record: &mut ProductRecord,
    ) -> Option<ExtractedField> {
        let store = self.knowledge.as_ref()?;

        let entry = match store.best_match(field, context) {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(field = %field, error = %e, "知识库查询失败,跳过");
                return None;
            }
        };

        if !record.apply_canonical(field, &entry.action) {
            warn!(
                entry_id = %entry.entry_id,
                field = %field,
                action = %entry.action,
                "知识条目动作无法应用到字段"
            );
            return None;
        }

        Some(ExtractedField {
            field,
            token: token.map(|t| t.to_string()),
            rule: None,
            confidence: ConfidenceLevel::High,
            source: ExtractionSource::Knowledge {
                entry_id: entry.entry_id,
            },
        })
    }
}
