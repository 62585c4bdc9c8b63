// ==========================================
// 商品导入系统 - 领域类型定义
// ==========================================
// 职责: 字段类型、属性取值域（封闭枚举 + Unknown）、置信度
// 红线: 字典查找返回 Option,不抛错
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 字段类型 (Field Type)
// ==========================================
// 列映射、解析规则、字典、知识条目共用的语义字段
// Ignore 为列映射的"忽略"哨兵
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Code,          // 商品编码（主键）
    Name,          // 商品名称
    Brand,         // 品牌
    Description,   // 描述原文
    Concentration, // 浓度（EDP/EDT...）
    Form,          // 形态（喷雾/乳液...）
    Audience,      // 适用人群
    Size,          // 容量数值
    Unit,          // 容量单位
    Origin,        // 产地
    Tester,        // 试用装标记
    GiftSet,       // 礼盒标记
    Price,         // 价格
    Quantity,      // 库存数量
    Ignore,        // 忽略列
}

impl FieldType {
    pub const ALL: [FieldType; 15] = [
        FieldType::Code,
        FieldType::Name,
        FieldType::Brand,
        FieldType::Description,
        FieldType::Concentration,
        FieldType::Form,
        FieldType::Audience,
        FieldType::Size,
        FieldType::Unit,
        FieldType::Origin,
        FieldType::Tester,
        FieldType::GiftSet,
        FieldType::Price,
        FieldType::Quantity,
        FieldType::Ignore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Code => "code",
            FieldType::Name => "name",
            FieldType::Brand => "brand",
            FieldType::Description => "description",
            FieldType::Concentration => "concentration",
            FieldType::Form => "form",
            FieldType::Audience => "audience",
            FieldType::Size => "size",
            FieldType::Unit => "unit",
            FieldType::Origin => "origin",
            FieldType::Tester => "tester",
            FieldType::GiftSet => "gift_set",
            FieldType::Price => "price",
            FieldType::Quantity => "quantity",
            FieldType::Ignore => "ignore",
        }
    }

    pub fn is_ignore(&self) -> bool {
        matches!(self, FieldType::Ignore)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        FieldType::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == key)
            .ok_or_else(|| format!("未知字段类型: {}", s))
    }
}

// ==========================================
// 规范值枚举
// ==========================================
// 字典与知识库以规范码（SCREAMING_SNAKE_CASE）存放取值,
// 由 from_canonical 转回类型化变体
pub trait CanonicalValue: Sized + Copy + 'static {
    /// 规范码
    fn canonical(&self) -> &'static str;

    /// 所有已知变体（不含 Unknown）
    fn known() -> &'static [Self];

    /// 规范码 → 变体（大小写不敏感）
    fn from_canonical(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::known()
            .iter()
            .copied()
            .find(|v| v.canonical().eq_ignore_ascii_case(code))
    }
}

macro_rules! canonical_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $code:literal),+ $(,)? }
        $(unknown: $unknown:ident)?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant,)+
            $($unknown,)?
        }

        impl CanonicalValue for $name {
            fn canonical(&self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                    $($name::$unknown => "UNKNOWN",)?
                }
            }

            fn known() -> &'static [Self] {
                &[$($name::$variant),+]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.canonical())
            }
        }
    };
}

canonical_enum! {
    /// 浓度
    Concentration {
        Parfum => "PARFUM",
        EauDeParfum => "EAU_DE_PARFUM",
        EauDeToilette => "EAU_DE_TOILETTE",
        EauDeCologne => "EAU_DE_COLOGNE",
        EauFraiche => "EAU_FRAICHE",
    }
    unknown: Unknown
}

canonical_enum! {
    /// 物理形态
    ProductForm {
        Spray => "SPRAY",
        Splash => "SPLASH",
        RollOn => "ROLL_ON",
        Stick => "STICK",
        Cream => "CREAM",
        Lotion => "LOTION",
        Gel => "GEL",
        Oil => "OIL",
        Soap => "SOAP",
    }
    unknown: Unknown
}

canonical_enum! {
    /// 适用人群
    Audience {
        Men => "MEN",
        Women => "WOMEN",
        Unisex => "UNISEX",
        Kids => "KIDS",
    }
    unknown: Unknown
}

canonical_enum! {
    /// 容量单位（无 Unknown,缺省为毫升）
    UnitOfMeasure {
        Milliliter => "ML",
        FluidOunce => "FL_OZ",
        Gram => "G",
    }
}

impl Default for UnitOfMeasure {
    fn default() -> Self {
        UnitOfMeasure::Milliliter
    }
}

impl Concentration {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Concentration::Unknown)
    }
}

impl ProductForm {
    pub fn is_unknown(&self) -> bool {
        matches!(self, ProductForm::Unknown)
    }
}

impl Audience {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Audience::Unknown)
    }
}

// ==========================================
// 置信度等级 (Confidence Level)
// ==========================================
// 字典/知识库命中 → High; 正则原始 token → Medium; 未解析默认值 → Low
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// 数值化置信度（传入歧义上下文）
    pub fn score(&self) -> f64 {
        match self {
            ConfidenceLevel::Low => 0.3,
            ConfidenceLevel::Medium => 0.6,
            ConfidenceLevel::High => 0.95,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::Low => write!(f, "LOW"),
            ConfidenceLevel::Medium => write!(f, "MEDIUM"),
            ConfidenceLevel::High => write!(f, "HIGH"),
        }
    }
}

// ==========================================
// 记录校验状态 (Validation State)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationState {
    Valid,       // 全部字段可信
    NeedsReview, // 存在未解决的低置信度字段
}

impl fmt::Display for ValidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationState::Valid => write!(f, "VALID"),
            ValidationState::NeedsReview => write!(f, "NEEDS_REVIEW"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_round_trip_str() {
        for field in FieldType::ALL {
            assert_eq!(field.as_str().parse::<FieldType>().unwrap(), field);
        }
        assert!("colour".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_field_type_serde_snake_case() {
        let json = serde_json::to_string(&FieldType::GiftSet).unwrap();
        assert_eq!(json, "\"gift_set\"");
        let parsed: FieldType = serde_json::from_str("\"ignore\"").unwrap();
        assert!(parsed.is_ignore());
    }

    #[test]
    fn test_from_canonical_case_insensitive() {
        assert_eq!(
            Concentration::from_canonical("eau_de_toilette"),
            Some(Concentration::EauDeToilette)
        );
        assert_eq!(UnitOfMeasure::from_canonical("ml"), Some(UnitOfMeasure::Milliliter));
        // Unknown 不是可解析的规范值
        assert_eq!(Concentration::from_canonical("UNKNOWN"), None);
        assert_eq!(Audience::from_canonical("ALIENS"), None);
    }

    fn round_trips<T: CanonicalValue + PartialEq + std::fmt::Debug>() {
        for value in T::known() {
            assert_eq!(T::from_canonical(value.canonical()), Some(*value));
        }
    }

    #[test]
    fn test_every_known_value_round_trips() {
        round_trips::<Concentration>();
        round_trips::<ProductForm>();
        round_trips::<Audience>();
        round_trips::<UnitOfMeasure>();
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(ConfidenceLevel::Low < ConfidenceLevel::Medium);
        assert!(ConfidenceLevel::Medium < ConfidenceLevel::High);
        assert!(ConfidenceLevel::High.score() > ConfidenceLevel::Low.score());
    }
}
