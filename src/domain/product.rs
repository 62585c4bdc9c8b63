// ==========================================
// 商品导入系统 - 商品领域模型
// ==========================================
// 职责: 商品记录、行级错误、转换结果
// 生命周期: 记录按源文件行构造,组装完成后不再修改
// ==========================================

use crate::domain::types::{
    Audience, CanonicalValue, Concentration, FieldType, ProductForm, UnitOfMeasure,
    ValidationState,
};
use serde::{Deserialize, Serialize};

// ==========================================
// ProductRecord - 商品记录
// ==========================================
// 用途: 导入管道最终产物（列映射 + 文本抽取合并）
// 红线: code / name 任一为空的记录不会进入结果集
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    // ===== 标识 =====
    pub code: Option<String>, // 商品编码（唯一标识）
    pub name: Option<String>, // 商品名称（自由文本）
    pub brand: Option<String>, // 品牌（字典命中时为品牌 ID）
    pub description: Option<String>, // 描述原文

    // ===== 类型化属性 =====
    pub concentration: Option<Concentration>,
    pub form: Option<ProductForm>,
    pub audience: Option<Audience>,
    pub size_value: Option<f64>,
    pub size_unit: Option<UnitOfMeasure>,
    pub origin: Option<String>,

    // ===== 标记 =====
    pub is_tester: bool,
    pub is_gift_set: bool,

    // ===== 商业字段 =====
    pub price: Option<f64>,
    pub quantity: Option<i64>,

    // ===== 审计 =====
    pub remarks: Vec<String>, // 原始备注（标准化回退、低置信度说明）
    pub validation_state: Option<ValidationState>,

    // 元信息
    pub row_number: usize, // 原始文件行号（1 起）
}

impl ProductRecord {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            ..Default::default()
        }
    }

    /// 字段是否已赋值
    ///
    /// Unknown 变体视为未赋值,允许文本抽取补全
    pub fn is_set(&self, field: FieldType) -> bool {
        match field {
            FieldType::Code => self.code.is_some(),
            FieldType::Name => self.name.is_some(),
            FieldType::Brand => self.brand.is_some(),
            FieldType::Description => self.description.is_some(),
            FieldType::Concentration => self.concentration.map_or(false, |c| !c.is_unknown()),
            FieldType::Form => self.form.map_or(false, |f| !f.is_unknown()),
            FieldType::Audience => self.audience.map_or(false, |a| !a.is_unknown()),
            FieldType::Size => self.size_value.map_or(false, |v| v > 0.0),
            FieldType::Unit => self.size_unit.is_some(),
            FieldType::Origin => self.origin.is_some(),
            FieldType::Tester => self.is_tester,
            FieldType::GiftSet => self.is_gift_set,
            FieldType::Price => self.price.is_some(),
            FieldType::Quantity => self.quantity.is_some(),
            FieldType::Ignore => false,
        }
    }

    /// 以规范值赋值
    ///
    /// # 返回
    /// - true: 值可被该字段接受
    /// - false: 值无法转换（调用方按低置信度处理）
    pub fn apply_canonical(&mut self, field: FieldType, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }

        match field {
            FieldType::Code => {
                self.code = Some(value.to_uppercase());
                true
            }
            FieldType::Name => {
                self.name = Some(value.to_string());
                true
            }
            FieldType::Brand => {
                self.brand = Some(value.to_string());
                true
            }
            FieldType::Description => {
                self.description = Some(value.to_string());
                true
            }
            FieldType::Origin => {
                self.origin = Some(value.to_string());
                true
            }
            FieldType::Concentration => Concentration::from_canonical(value)
                .map(|c| self.concentration = Some(c))
                .is_some(),
            FieldType::Form => ProductForm::from_canonical(value)
                .map(|f| self.form = Some(f))
                .is_some(),
            FieldType::Audience => Audience::from_canonical(value)
                .map(|a| self.audience = Some(a))
                .is_some(),
            FieldType::Unit => UnitOfMeasure::from_canonical(value)
                .map(|u| self.size_unit = Some(u))
                .is_some(),
            FieldType::Size => match value.replace(',', ".").parse::<f64>() {
                Ok(v) if v > 0.0 => {
                    self.size_value = Some(v);
                    true
                }
                _ => false,
            },
            FieldType::Tester => {
                self.is_tester = true;
                true
            }
            FieldType::GiftSet => {
                self.is_gift_set = true;
                true
            }
            FieldType::Price => match value.replace(',', ".").parse::<f64>() {
                Ok(v) => {
                    self.price = Some(v);
                    true
                }
                Err(_) => false,
            },
            FieldType::Quantity => match value.parse::<i64>() {
                Ok(v) => {
                    self.quantity = Some(v);
                    true
                }
                Err(_) => false,
            },
            FieldType::Ignore => false,
        }
    }

    /// 写入低置信度默认值
    pub fn apply_default(&mut self, field: FieldType) {
        match field {
            FieldType::Concentration if !self.is_set(field) => {
                self.concentration = Some(Concentration::Unknown)
            }
            FieldType::Form if !self.is_set(field) => self.form = Some(ProductForm::Unknown),
            FieldType::Audience if !self.is_set(field) => {
                self.audience = Some(Audience::Unknown)
            }
            FieldType::Size if self.size_value.is_none() => self.size_value = Some(0.0),
            FieldType::Unit if self.size_unit.is_none() => {
                self.size_unit = Some(UnitOfMeasure::default())
            }
            _ => {}
        }
    }

    /// 字段当前值（用于歧义上下文与备注）
    pub fn display_value(&self, field: FieldType) -> Option<String> {
        match field {
            FieldType::Code => self.code.clone(),
            FieldType::Name => self.name.clone(),
            FieldType::Brand => self.brand.clone(),
            FieldType::Description => self.description.clone(),
            FieldType::Concentration => self.concentration.map(|c| c.to_string()),
            FieldType::Form => self.form.map(|f| f.to_string()),
            FieldType::Audience => self.audience.map(|a| a.to_string()),
            FieldType::Size => self.size_value.map(|v| v.to_string()),
            FieldType::Unit => self.size_unit.map(|u| u.to_string()),
            FieldType::Origin => self.origin.clone(),
            FieldType::Tester => Some(self.is_tester.to_string()),
            FieldType::GiftSet => Some(self.is_gift_set.to_string()),
            FieldType::Price => self.price.map(|v| v.to_string()),
            FieldType::Quantity => self.quantity.map(|v| v.to_string()),
            FieldType::Ignore => None,
        }
    }

    pub fn add_remark(&mut self, remark: impl Into<String>) {
        self.remarks.push(remark.into());
    }

    /// 是否具备入库所需字段（编码 + 名称）
    pub fn has_required_fields(&self) -> bool {
        self.code.as_deref().map_or(false, |c| !c.is_empty())
            && self.name.as_deref().map_or(false, |n| !n.is_empty())
    }
}

// ==========================================
// RowError - 行级错误
// ==========================================
// 用途: 诊断信息,不作为记录持久化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,        // 原始文件行号
    pub field: String,     // 出错字段
    pub value: String,     // 原始值
    pub message: String,   // 错误描述
    pub raw_line: String,  // 原始行文本
}

// ==========================================
// ConversionResult - 转换结果
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionResult {
    pub batch_id: String,
    pub valid_records: Vec<ProductRecord>,
    pub errors: Vec<RowError>,
    pub total_processed: usize, // 进入处理的行数（不含空行、内嵌标题行）
    pub valid_count: usize,
    pub error_count: usize,
    pub dropped_count: usize, // 缺编码/名称被静默丢弃的行
    pub skipped_count: usize, // 空行 + 内嵌标题行
    pub cancelled: bool,      // 是否被取消（结果为部分结果）
    pub elapsed_ms: u128,
}

impl ConversionResult {
    pub fn new(batch_id: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            ..Default::default()
        }
    }

    pub fn push_record(&mut self, record: ProductRecord) {
        self.valid_records.push(record);
        self.valid_count = self.valid_records.len();
    }

    pub fn push_error(&mut self, error: RowError) {
        self.errors.push(error);
        self.error_count = self.errors.len();
    }

    /// 汇总文本（用于日志与命令行输出）
    pub fn summary(&self) -> String {
        format!(
            "共处理 {} 行: 有效 {} 行, 错误 {} 行, 丢弃 {} 行, 跳过 {} 行{}",
            self.total_processed,
            self.valid_count,
            self.error_count,
            self.dropped_count,
            self.skipped_count,
            if self.cancelled { "（已取消,部分结果）" } else { "" }
        )
    }
}
