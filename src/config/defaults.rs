// ==========================================
// 商品导入系统 - 内置字典 / 规则 / 忽略模式
// ==========================================
// 用途: 配置 JSON 未提供对应段落时的缺省值
// 领域: 香水与个护（意/英/法三语关键字）
// ==========================================

use crate::domain::rule::{Dictionary, IgnorePattern, ParsingRule};
use crate::domain::types::FieldType;

/// 容量 + 单位（组 1 = 数值, 组 2 = 单位）
const SIZE_PATTERN: &str = r"\b(\d+(?:[.,]\d+)?)\s*(ml|fl\.?\s*oz|oz|gr|g)\b";

/// 缺省表头关键字（内嵌标题行识别）
pub fn default_header_keywords() -> Vec<String> {
    [
        "codice", "code", "sku", "ean", "articolo", "descrizione", "description", "prezzo",
        "price", "marca", "brand", "quantità", "quantity", "qty", "formato", "categoria",
        "category",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// 缺省字典
pub fn default_dictionaries() -> Vec<Dictionary> {
    vec![
        Dictionary::new(FieldType::Concentration)
            .with_synonyms(
                "PARFUM",
                &["parfum", "extrait", "extrait de parfum", "profumo", "adp"],
            )
            .with_synonyms("EAU_DE_PARFUM", &["edp", "eau de parfum"])
            .with_synonyms("EAU_DE_TOILETTE", &["edt", "eau de toilette"])
            .with_synonyms("EAU_DE_COLOGNE", &["edc", "eau de cologne", "cologne", "colonia"])
            .with_synonyms("EAU_FRAICHE", &["eau fraiche"]),
        Dictionary::new(FieldType::Form)
            .with_synonyms(
                "SPRAY",
                &["spray", "natural spray", "vapo", "vaporisateur", "vaporizzatore"],
            )
            .with_synonyms("SPLASH", &["splash"])
            .with_synonyms("ROLL_ON", &["roll on", "roll-on", "rollon"])
            .with_synonyms("STICK", &["stick"])
            .with_synonyms("CREAM", &["cream", "crema"])
            .with_synonyms("LOTION", &["lotion", "lozione"])
            .with_synonyms("GEL", &["gel"])
            .with_synonyms("OIL", &["oil", "olio"])
            .with_synonyms("SOAP", &["soap", "sapone"]),
        Dictionary::new(FieldType::Audience)
            .with_synonyms("MEN", &["uomo", "men", "man", "homme", "pour homme"])
            .with_synonyms("WOMEN", &["donna", "women", "woman", "femme", "pour femme"])
            .with_synonyms("UNISEX", &["unisex"])
            .with_synonyms("KIDS", &["kids", "bambini", "enfant"]),
        Dictionary::new(FieldType::Unit)
            .with_synonyms("ML", &["ml", "mls", "millilitri"])
            .with_synonyms("FL_OZ", &["oz", "fl oz", "fl.oz", "fl. oz", "floz"])
            .with_synonyms("G", &["g", "gr", "grammi"]),
    ]
}

/// 缺省解析规则（priority 升序评估）
pub fn default_rules() -> Vec<ParsingRule> {
    vec![
        ParsingRule::new(
            "concentration_keyword",
            r"\b(extrait\s+de\s+parfum|eau\s+de\s+parfum|eau\s+de\s+toilette|eau\s+de\s+cologne|eau\s+fraiche|parfum|extrait|profumo|adp|edp|edt|edc|cologne|colonia)\b",
            FieldType::Concentration,
            10,
        )
        .with_groups(&[1])
        .stop_on_match(),
        ParsingRule::new("size_value", SIZE_PATTERN, FieldType::Size, 20)
            .with_groups(&[1])
            .stop_on_match(),
        ParsingRule::new("size_unit", SIZE_PATTERN, FieldType::Unit, 21)
            .with_groups(&[2])
            .stop_on_match(),
        ParsingRule::new(
            "form_keyword",
            r"\b(natural\s+spray|vaporisateur|vaporizzatore|spray|vapo|splash|roll[\s-]?on|stick|cream|crema|lotion|lozione|gel|oil|olio|soap|sapone)\b",
            FieldType::Form,
            30,
        )
        .with_groups(&[1]),
        ParsingRule::new(
            "audience_keyword",
            r"\b(pour\s+homme|pour\s+femme|uomo|donna|men|women|man|woman|homme|femme|unisex|kids|bambini|enfant)\b",
            FieldType::Audience,
            40,
        )
        .with_groups(&[1]),
        ParsingRule::new("tester_flag", r"\b(tester|tst)\b", FieldType::Tester, 50).with_groups(&[1]),
        ParsingRule::new(
            "gift_set_flag",
            r"\b(gift\s+set|coffret|cofanetto|set)\b",
            FieldType::GiftSet,
            60,
        )
        .with_groups(&[1]),
    ]
}

/// 缺省忽略模式
pub fn default_ignore_patterns() -> Vec<IgnorePattern> {
    vec![
        // "30ML ... 29.6ml": 前面已有容量时,尾部的换算容量（仅剔除组 1）
        IgnorePattern::new(
            "trailing_alternate_ml",
            r"(?i)\d+(?:[.,]\d+)?\s*ml\b.*?(\s\d+[.,]\d+\s*ml)\s*$",
        ),
        // "100ml/3.4oz": 斜杠后的盎司换算
        IgnorePattern::new(
            "slash_alternate_oz",
            r"(?i)/\s*\d+(?:[.,]\d+)?\s*(?:fl\.?\s*)?oz\b",
        ),
        // 描述中夹带的条码
        IgnorePattern::new("barcode", r"\b\d{12,14}\b"),
    ]
}
