// ==========================================
// 商品导入系统 - 字段标准化器
// ==========================================
// 职责: 单元格原始字符串 → 类型化字段值
// 红线: 确定性、无副作用; 无法识别时回退默认值并留备注,绝不失败
// 单位推断优先级: 盎司 → 毫升 → 克,缺省毫升
// ==========================================

use crate::domain::product::ProductRecord;
use crate::domain::rule::DictionarySet;
use crate::domain::types::{
    Audience, CanonicalValue, Concentration, FieldType, ProductForm, UnitOfMeasure,
};
use crate::importer::error::{ImportError, ImportResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

// 单位标记: 前面不能紧跟字母（"30ML" 可匹配, "GIFT" 中的 g 不可）
static OUNCE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^\p{L}])(?:fl\.?\s*oz|floz|oz|ounces?|once)\b").expect("ounce regex")
});
static MILLILITER_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^\p{L}])(?:ml|mls|millilitri|milliliters?|millilitres?)\b")
        .expect("milliliter regex")
});
static GRAM_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^\p{L}])(?:g|gr|grs|grammi|grams?)\b").expect("gram regex")
});
static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+(?:[.,]\d+)?)").expect("leading number regex"));

// ==========================================
// 纯函数
// ==========================================

/// 去首尾空白 + 折叠内部空白; 空串 → None
pub fn normalize_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// 编码: TRIM + UPPER
pub fn normalize_code(raw: &str) -> Option<String> {
    normalize_text(raw).map(|s| s.to_uppercase())
}

/// 容量数值: 前导数字（逗号或点为小数点）,否则 0
pub fn parse_size(raw: &str) -> f64 {
    LEADING_NUMBER
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// 显式单位标记（按优先级）
pub fn detect_unit(raw: &str) -> Option<UnitOfMeasure> {
    if OUNCE_MARKER.is_match(raw) {
        Some(UnitOfMeasure::FluidOunce)
    } else if MILLILITER_MARKER.is_match(raw) {
        Some(UnitOfMeasure::Milliliter)
    } else if GRAM_MARKER.is_match(raw) {
        Some(UnitOfMeasure::Gram)
    } else {
        None
    }
}

/// 单位推断,无标记时为毫升
pub fn infer_unit(raw: &str) -> UnitOfMeasure {
    detect_unit(raw).unwrap_or_default()
}

/// 布尔标记: 1/Y/YES/S/SI/SÌ/TRUE/X/VERO → true,其余 false
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_uppercase().as_str(),
        "1" | "Y" | "YES" | "S" | "SI" | "SÌ" | "TRUE" | "X" | "VERO"
    )
}

/// 价格: 去除货币符号,兼容 "1.234,56" / "1,234.56" / "29,90"
pub fn parse_price(raw: &str) -> ImportResult<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) if cleaned.matches(',').count() > 1 => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        (None, Some(_)) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    normalized
        .parse::<f64>()
        .map_err(|_| normalization_error(FieldType::Price, raw, "无法解析为金额"))
}

/// 数量: 整数; 表格导出的 "12.0" 视为 12
pub fn parse_quantity(raw: &str) -> ImportResult<i64> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }
    match trimmed.replace(',', ".").parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v.is_finite() => Ok(v as i64),
        _ => Err(normalization_error(FieldType::Quantity, raw, "无法解析为整数")),
    }
}

fn normalization_error(field: FieldType, raw: &str, message: &str) -> ImportError {
    ImportError::FieldNormalizationError {
        field: field.to_string(),
        value: raw.to_string(),
        message: message.to_string(),
    }
}

// ==========================================
// FieldNormalizer - 带字典的标准化器
// ==========================================
pub struct FieldNormalizer {
    dictionaries: Arc<DictionarySet>,
}

impl FieldNormalizer {
    pub fn new(dictionaries: Arc<DictionarySet>) -> Self {
        Self { dictionaries }
    }

    pub fn normalize_concentration(&self, raw: &str) -> Concentration {
        self.resolve_keyword(FieldType::Concentration, raw)
            .and_then(Concentration::from_canonical)
            .or_else(|| Concentration::from_canonical(raw))
            .unwrap_or(Concentration::Unknown)
    }

    pub fn normalize_form(&self, raw: &str) -> ProductForm {
        self.resolve_keyword(FieldType::Form, raw)
            .and_then(ProductForm::from_canonical)
            .or_else(|| ProductForm::from_canonical(raw))
            .unwrap_or(ProductForm::Unknown)
    }

    pub fn normalize_audience(&self, raw: &str) -> Audience {
        self.resolve_keyword(FieldType::Audience, raw)
            .and_then(Audience::from_canonical)
            .or_else(|| Audience::from_canonical(raw))
            .unwrap_or(Audience::Unknown)
    }

    /// 单元格写入记录
    ///
    /// 空白单元格不赋值（留给文本抽取补全）;
    /// 无法识别的值写入默认值并在 remarks 中记录
    pub fn normalize_into(&self, field: FieldType, raw: &str, record: &mut ProductRecord) {
        if raw.trim().is_empty() {
            return;
        }

        match field {
            FieldType::Code => record.code = normalize_code(raw),
            FieldType::Name => record.name = normalize_text(raw),
            FieldType::Brand => {
                record.brand = self
                    .dictionaries
                    .lookup(FieldType::Brand, raw)
                    .map(|id| id.to_string())
                    .or_else(|| normalize_text(raw))
            }
            FieldType::Description => record.description = normalize_text(raw),
            FieldType::Origin => record.origin = normalize_text(raw),
            FieldType::Concentration => {
                let value = self.normalize_concentration(raw);
                if value.is_unknown() {
                    self.fallback_remark(record, field, raw, "浓度关键字未识别");
                }
                record.concentration = Some(value);
            }
            FieldType::Form => {
                let value = self.normalize_form(raw);
                if value.is_unknown() {
                    self.fallback_remark(record, field, raw, "形态关键字未识别");
                }
                record.form = Some(value);
            }
            FieldType::Audience => {
                let value = self.normalize_audience(raw);
                if value.is_unknown() {
                    self.fallback_remark(record, field, raw, "适用人群关键字未识别");
                }
                record.audience = Some(value);
            }
            FieldType::Size => {
                let value = parse_size(raw);
                if value <= 0.0 {
                    self.fallback_remark(record, field, raw, "容量无前导数字,按 0 处理");
                }
                record.size_value = Some(value);
                if record.size_unit.is_none() {
                    record.size_unit = detect_unit(raw);
                }
            }
            FieldType::Unit => {
                let unit = self
                    .dictionaries
                    .lookup(FieldType::Unit, raw)
                    .and_then(UnitOfMeasure::from_canonical)
                    .unwrap_or_else(|| infer_unit(raw));
                record.size_unit = Some(unit);
            }
            FieldType::Tester => record.is_tester |= parse_flag(raw),
            FieldType::GiftSet => record.is_gift_set |= parse_flag(raw),
            FieldType::Price => {
                let price = parse_price(raw).unwrap_or_else(|e| {
                    self.fallback_error(record, &e);
                    0.0
                });
                record.price = Some(price);
            }
            FieldType::Quantity => {
                let quantity = parse_quantity(raw).unwrap_or_else(|e| {
                    self.fallback_error(record, &e);
                    0
                });
                record.quantity = Some(quantity);
            }
            FieldType::Ignore => {}
        }
    }

    /// 精确查字典,否则按词边界包含查找
    fn resolve_keyword(&self, field: FieldType, raw: &str) -> Option<&str> {
        self.dictionaries
            .lookup(field, raw)
            .or_else(|| self.dictionaries.find_contained(field, raw))
    }

    fn fallback_remark(
        &self,
        record: &mut ProductRecord,
        field: FieldType,
        raw: &str,
        message: &str,
    ) {
        self.fallback_error(record, &normalization_error(field, raw, message));
    }

    fn fallback_error(&self, record: &mut ProductRecord, error: &ImportError) {
        debug!(
            row_number = record.row_number,
            field = %error.field(),
            value = %error.value(),
            "字段标准化回退默认值"
        );
        record.add_remark(error.to_string());
    }
}
