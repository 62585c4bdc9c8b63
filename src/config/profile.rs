// ==========================================
// 商品导入系统 - 转换方案（配置来源）
// ==========================================
// 职责: 文件布局 + 规则 + 字典 + 忽略模式 + 运行参数 的统一载体
// 红线: 由管道实例持有,按引用传入各引擎; 修改只经显式方法
// 来源: JSON; 格式错误统一报 ConfigurationError
// ==========================================

use crate::config::defaults;
use crate::config::file_configuration::FileConfiguration;
use crate::config::settings::ConversionSettings;
use crate::domain::rule::{Dictionary, IgnorePattern, ParsingRule};
use crate::domain::types::FieldType;
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

// ==========================================
// ConversionProfile
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionProfile {
    pub file: FileConfiguration,

    #[serde(default = "defaults::default_rules")]
    pub rules: Vec<ParsingRule>,

    #[serde(default = "defaults::default_dictionaries")]
    pub dictionaries: Vec<Dictionary>,

    #[serde(default = "defaults::default_ignore_patterns")]
    pub ignore_patterns: Vec<IgnorePattern>,

    #[serde(default)]
    pub settings: ConversionSettings,
}

impl ConversionProfile {
    /// 文件布局 + 内置规则/字典/忽略模式
    pub fn with_defaults(file: FileConfiguration) -> Self {
        Self {
            file,
            rules: defaults::default_rules(),
            dictionaries: defaults::default_dictionaries(),
            ignore_patterns: defaults::default_ignore_patterns(),
            settings: ConversionSettings::default(),
        }
    }

    /// 从 JSON 文本加载
    pub fn from_json_str(json: &str) -> ImportResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 从 JSON 文件加载
    pub fn from_file<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ImportError::ConfigurationError(format!(
                "配置文件读取失败 ({}): {}",
                path.display(),
                e
            ))
        })?;
        let profile = Self::from_json_str(&raw)?;

        info!(
            path = %path.display(),
            rules = profile.rules.len(),
            dictionaries = profile.dictionaries.len(),
            "转换方案已加载"
        );
        Ok(profile)
    }

    pub fn to_json(&self) -> ImportResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ImportError::InternalError(format!("配置序列化失败: {}", e)))
    }

    // ==========================================
    // 显式修改方法
    // ==========================================

    pub fn add_rule(&mut self, rule: ParsingRule) {
        self.rules.push(rule);
    }

    pub fn add_ignore_pattern(&mut self, pattern: IgnorePattern) {
        self.ignore_patterns.push(pattern);
    }

    /// 登记字典项（该字段无字典时新建）
    pub fn add_dictionary_entry(&mut self, field: FieldType, keyword: &str, canonical: &str) {
        match self.dictionaries.iter_mut().find(|d| d.field == field) {
            Some(dict) => dict.insert(keyword, canonical),
            None => {
                let mut dict = Dictionary::new(field);
                dict.insert(keyword, canonical);
                self.dictionaries.push(dict);
            }
        }
    }

    /// 替换全部规则
    pub fn replace_rules(&mut self, rules: Vec<ParsingRule>) {
        self.rules = rules;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"{
        "file": {
            "header_row": 0,
            "data_start_row": 1,
            "column_mapping": { "0": "code", "1": "name" }
        }
    }"#;

    #[test]
    fn test_minimal_json_gets_default_sections() {
        let profile = ConversionProfile::from_json_str(MINIMAL).unwrap();
        assert_eq!(profile.rules, defaults::default_rules());
        assert_eq!(profile.ignore_patterns.len(), defaults::default_ignore_patterns().len());
        assert_eq!(profile.settings, ConversionSettings::default());
    }

    #[test]
    fn test_explicit_empty_rules_are_kept() {
        let json = r#"{
            "file": { "header_row": 0, "data_start_row": 1, "column_mapping": { "0": "code" } },
            "rules": []
        }"#;
        let profile = ConversionProfile::from_json_str(json).unwrap();
        assert!(profile.rules.is_empty());
    }

    #[test]
    fn test_malformed_json_is_configuration_error() {
        let result = ConversionProfile::from_json_str(r#"{ "file": 3 }"#);
        assert!(matches!(result, Err(ImportError::ConfigurationError(_))));
    }

    #[test]
    fn test_from_file_missing_is_configuration_error() {
        let result = ConversionProfile::from_file("/definitely/not/here.json");
        assert!(matches!(result, Err(ImportError::ConfigurationError(_))));
    }

    #[test]
    fn test_from_file_and_json_round_trip() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", MINIMAL).unwrap();

        let profile = ConversionProfile::from_file(temp_file.path()).unwrap();
        let again = ConversionProfile::from_json_str(&profile.to_json().unwrap()).unwrap();
        assert_eq!(profile, again);
    }

    #[test]
    fn test_add_dictionary_entry_creates_dictionary() {
        let mut profile = ConversionProfile::from_json_str(MINIMAL).unwrap();
        profile.add_dictionary_entry(FieldType::Brand, "Acqua di Parma", "BRAND-ADP");
        let brand = profile
            .dictionaries
            .iter()
            .find(|d| d.field == FieldType::Brand)
            .unwrap();
        assert_eq!(brand.lookup("acqua di parma"), Some("BRAND-ADP"));
    }
}
