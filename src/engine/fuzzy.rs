// ==========================================
// 商品导入系统 - 模糊匹配与置信度计算
// ==========================================
// 纯函数模块: 编辑距离、相似度（strsim）、置信度强化、成功率滑动平均
// 知识库与抽取引擎共用
// ==========================================

/// 置信度上限
pub const MAX_CONFIDENCE: f64 = 1.0;

/// 编辑距离（Levenshtein,按字符计）
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// 相似度 0..=1（1 - 编辑距离 / 较长串长度; 两空串为 1）
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// 模糊命中: 任一方向包含,或编辑距离 ≤ max_distance
///
/// 两个参数都应已规范化（小写 + 空白折叠）
pub fn is_fuzzy_match(pattern: &str, context: &str, max_distance: usize) -> bool {
    if pattern.is_empty() || context.is_empty() {
        return false;
    }
    context.contains(pattern)
        || pattern.contains(context)
        || edit_distance(pattern, context) <= max_distance
}

/// 强化置信度: confidence + delta,封顶 1.0
pub fn reinforce(confidence: f64, delta: f64) -> f64 {
    (confidence + delta).clamp(0.0, MAX_CONFIDENCE)
}

/// 成功率滑动加权平均
///
/// `usage_count` 为本次应用计入之后的次数:
/// rate' = ((usage_count - 1) * rate + outcome) / usage_count
pub fn weighted_success_rate(previous_rate: f64, usage_count: i64, was_successful: bool) -> f64 {
    if usage_count <= 0 {
        return previous_rate;
    }
    let outcome = if was_successful { 1.0 } else { 0.0 };
    let n = usage_count as f64;
    ((n - 1.0) * previous_rate + outcome) / n
}
