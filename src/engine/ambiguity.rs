// ==========================================
// 商品导入系统 - 歧义处理器
// ==========================================
// 职责: 低置信度字段的决策边界（可注入策略）
// 实现: AutoDefaultResolver（生产/批量,永不阻塞）
//       InteractiveResolver（人工问答,显式阻塞点）
// 红线: 处理器不持有记录间状态; 学习写入由调用方执行
// ==========================================

use crate::domain::ambiguity::{AmbiguityContext, Candidate, Resolution};
use crate::domain::knowledge::normalize_pattern;
use crate::domain::rule::DictionarySet;
use crate::domain::types::FieldType;
use crate::engine::fuzzy;
use crate::knowledge::KnowledgeStore;
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::sync::Mutex;
use tracing::warn;

// ==========================================
// AmbiguityResolver Trait
// ==========================================
pub trait AmbiguityResolver: Send + Sync {
    fn resolve_brand(&self, ctx: &AmbiguityContext<'_>, candidates: &[Candidate]) -> Resolution;

    fn resolve_concentration(
        &self,
        ctx: &AmbiguityContext<'_>,
        candidates: &[Candidate],
    ) -> Resolution;

    /// 容量数值与单位
    fn resolve_size(&self, ctx: &AmbiguityContext<'_>, candidates: &[Candidate]) -> Resolution;

    fn resolve_general(&self, ctx: &AmbiguityContext<'_>, candidates: &[Candidate])
        -> Resolution;

    /// 选定结果是否写入知识库
    fn should_learn(&self, ctx: &AmbiguityContext<'_>, selected: &Candidate) -> bool;
}

/// 按字段分派到对应能力
pub fn dispatch(
    resolver: &dyn AmbiguityResolver,
    ctx: &AmbiguityContext<'_>,
    candidates: &[Candidate],
) -> Resolution {
    match ctx.field {
        FieldType::Brand => resolver.resolve_brand(ctx, candidates),
        FieldType::Concentration => resolver.resolve_concentration(ctx, candidates),
        FieldType::Size | FieldType::Unit => resolver.resolve_size(ctx, candidates),
        _ => resolver.resolve_general(ctx, candidates),
    }
}

// ==========================================
// 候选排序
// ==========================================

/// 候选值: 字典关键字相似度 + 知识库适用条目,同值取最高分
///
/// 字段缺失（无片段）时以工作文本中的单词逐一比较
pub fn rank_candidates(
    field: FieldType,
    token: Option<&str>,
    working_text: &str,
    dictionaries: &DictionarySet,
    knowledge: Option<&KnowledgeStore>,
    max_candidates: usize,
) -> Vec<Candidate> {
    let mut best: HashMap<String, Candidate> = HashMap::new();
    let mut offer = |candidate: Candidate| {
        let keep = best
            .get(&candidate.value)
            .map_or(true, |existing| candidate.score > existing.score);
        if keep {
            best.insert(candidate.value.clone(), candidate);
        }
    };

    let probes: Vec<String> = match token {
        Some(t) => vec![normalize_pattern(t)],
        None => working_text
            .split_whitespace()
            .map(normalize_pattern)
            .filter(|w| w.chars().count() > 1)
            .collect(),
    };

    if let Some(dict) = dictionaries.get(field) {
        for (keyword, canonical) in &dict.entries {
            let score = probes
                .iter()
                .map(|p| fuzzy::similarity(keyword, p))
                .fold(0.0_f64, f64::max);
            if score > 0.0 {
                offer(Candidate::new(
                    canonical.clone(),
                    score,
                    format!("字典相似: {}", keyword),
                ));
            }
        }
    }

    if let Some(store) = knowledge {
        let context = token.unwrap_or(working_text);
        match store.find_applicable_rules(field, context) {
            Ok(entries) => {
                for entry in entries {
                    offer(Candidate::new(
                        entry.action.clone(),
                        entry.weight(),
                        format!("知识库: {}", entry.pattern),
                    ));
                }
            }
            Err(e) => warn!(field = %field, error = %e, "候选检索知识库失败"),
        }
    }

    let mut ranked: Vec<Candidate> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.value.cmp(&b.value))
    });
    ranked.truncate(max_candidates);
    ranked
}

// ==========================================
// AutoDefaultResolver - 自动默认
// ==========================================
// 始终跳过,由调用方写入默认值并标记待复核
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoDefaultResolver;

impl AmbiguityResolver for AutoDefaultResolver {
    fn resolve_brand(&self, _ctx: &AmbiguityContext<'_>, _candidates: &[Candidate]) -> Resolution {
        Resolution::Skip
    }

    fn resolve_concentration(
        &self,
        _ctx: &AmbiguityContext<'_>,
        _candidates: &[Candidate],
    ) -> Resolution {
        Resolution::Skip
    }

    fn resolve_size(&self, _ctx: &AmbiguityContext<'_>, _candidates: &[Candidate]) -> Resolution {
        Resolution::Skip
    }

    fn resolve_general(
        &self,
        _ctx: &AmbiguityContext<'_>,
        _candidates: &[Candidate],
    ) -> Resolution {
        Resolution::Skip
    }

    fn should_learn(&self, _ctx: &AmbiguityContext<'_>, _selected: &Candidate) -> bool {
        false
    }
}

// ==========================================
// InteractiveResolver - 人工问答
// ==========================================
// 输入约定:
// - 数字 n (1..): 选第 n 个候选
// - 空行 / 0 / EOF: 跳过
// - 其他文本: 作为人工输入的规范值
pub struct InteractiveResolver<R, W> {
    io: Mutex<(R, W)>,
    learn: bool,
}

impl<R, W> InteractiveResolver<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new((input, output)),
            learn: true,
        }
    }

    /// 关闭学习（只决策,不写知识库）
    pub fn without_learning(mut self) -> Self {
        self.learn = false;
        self
    }

    /// 取回底层读写端
    pub fn into_inner(self) -> (R, W) {
        match self.io.into_inner() {
            Ok(io) => io,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn ask(&self, topic: &str, ctx: &AmbiguityContext<'_>, candidates: &[Candidate]) -> Resolution {
        let mut guard = match self.io.lock() {
            Ok(guard) => guard,
            Err(e) => {
                warn!(error = %e, "交互锁获取失败,跳过");
                return Resolution::Skip;
            }
        };
        let (input, output) = &mut *guard;

        match Self::prompt(output, topic, ctx, candidates) {
            Ok(()) => {}
            Err(e) => {
                warn!(error = %e, "交互输出失败,跳过");
                return Resolution::Skip;
            }
        }

        let mut answer = String::new();
        if let Err(e) = input.read_line(&mut answer) {
            warn!(error = %e, "交互输入失败,跳过");
            return Resolution::Skip;
        }

        Self::interpret(answer.trim(), candidates)
    }

    fn prompt(
        output: &mut W,
        topic: &str,
        ctx: &AmbiguityContext<'_>,
        candidates: &[Candidate],
    ) -> std::io::Result<()> {
        writeln!(
            output,
            "[行 {}] {}歧义 ({}): \"{}\"",
            ctx.row_number, topic, ctx.field, ctx.original_text
        )?;
        if let Some(token) = ctx.token {
            writeln!(output, "  片段: {}", token)?;
        }
        for (i, candidate) in candidates.iter().enumerate() {
            writeln!(
                output,
                "  [{}] {} (得分 {:.2}, {})",
                i + 1,
                candidate.value,
                candidate.score,
                candidate.reason
            )?;
        }
        writeln!(output, "  [0] 跳过（使用默认值）")?;
        write!(output, "> ")?;
        output.flush()
    }

    fn interpret(answer: &str, candidates: &[Candidate]) -> Resolution {
        if answer.is_empty() || answer == "0" {
            return Resolution::Skip;
        }
        match answer.parse::<usize>() {
            Ok(n) => n
                .checked_sub(1)
                .and_then(|i| candidates.get(i))
                .cloned()
                .map_or(Resolution::Skip, Resolution::Selected),
            Err(_) => Resolution::Selected(Candidate::new(answer, 1.0, "人工输入")),
        }
    }
}

impl<R, W> AmbiguityResolver for InteractiveResolver<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn resolve_brand(&self, ctx: &AmbiguityContext<'_>, candidates: &[Candidate]) -> Resolution {
        self.ask("品牌", ctx, candidates)
    }

    fn resolve_concentration(
        &self,
        ctx: &AmbiguityContext<'_>,
        candidates: &[Candidate],
    ) -> Resolution {
        self.ask("浓度", ctx, candidates)
    }

    fn resolve_size(&self, ctx: &AmbiguityContext<'_>, candidates: &[Candidate]) -> Resolution {
        self.ask("容量", ctx, candidates)
    }

    fn resolve_general(
        &self,
        ctx: &AmbiguityContext<'_>,
        candidates: &[Candidate],
    ) -> Resolution {
        self.ask("字段", ctx, candidates)
    }

    fn should_learn(&self, _ctx: &AmbiguityContext<'_>, _selected: &Candidate) -> bool {
        self.learn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::default_dictionaries;
    use crate::domain::product::ProductRecord;
    use std::io::Cursor;

    fn ctx<'a>(record: &'a ProductRecord, field: FieldType) -> AmbiguityContext<'a> {
        AmbiguityContext {
            row_number: 3,
            original_text: "ROSA EXTRAFORTE 50ML",
            field,
            token: Some("EXTRAFORTE"),
            partial_record: record,
            confidence: 0.3,
        }
    }

    #[test]
    fn test_auto_default_always_skips() {
        let record = ProductRecord::new(3);
        let ctx = ctx(&record, FieldType::Concentration);
        let candidates = vec![Candidate::new("PARFUM", 0.9, "x")];

        assert_eq!(dispatch(&AutoDefaultResolver, &ctx, &candidates), Resolution::Skip);
        assert!(!AutoDefaultResolver.should_learn(&ctx, &candidates[0]));
    }

    #[test]
    fn test_interactive_selects_by_number() {
        let resolver = InteractiveResolver::new(Cursor::new("2\n"), Vec::new());
        let record = ProductRecord::new(3);
        let ctx = ctx(&record, FieldType::Concentration);
        let candidates = vec![
            Candidate::new("PARFUM", 0.9, "a"),
            Candidate::new("EAU_DE_PARFUM", 0.5, "b"),
        ];

        let resolution = dispatch(&resolver, &ctx, &candidates);

        assert_eq!(resolution, Resolution::Selected(candidates[1].clone()));
        let (_, output) = resolver.into_inner();
        let prompt = String::from_utf8(output).unwrap();
        assert!(prompt.contains("[行 3] 浓度歧义"));
        assert!(prompt.contains("[2] EAU_DE_PARFUM"));
    }

    #[test]
    fn test_interactive_free_text_skip_and_eof() {
        let resolver = InteractiveResolver::new(Cursor::new("PARFUM\n\n9\n"), Vec::new());
        let record = ProductRecord::new(3);
        let ctx = ctx(&record, FieldType::Brand);
        let candidates = vec![Candidate::new("BRAND-1", 0.4, "a")];

        assert_eq!(
            dispatch(&resolver, &ctx, &candidates),
            Resolution::Selected(Candidate::new("PARFUM", 1.0, "人工输入"))
        );
        assert_eq!(dispatch(&resolver, &ctx, &candidates), Resolution::Skip);
        assert_eq!(dispatch(&resolver, &ctx, &candidates), Resolution::Skip); // 越界
        assert_eq!(dispatch(&resolver, &ctx, &candidates), Resolution::Skip); // EOF
        assert!(resolver.should_learn(&ctx, &candidates[0]));
    }

    #[test]
    fn test_rank_candidates_from_dictionary_and_knowledge() {
        let dictionaries = DictionarySet::from_dictionaries(&default_dictionaries());
        let store = KnowledgeStore::in_memory();
        store
            .add_entry(FieldType::Concentration, "extraforte", "PARFUM", 0.8, "tester")
            .unwrap();

        let ranked = rank_candidates(
            FieldType::Concentration,
            Some("EXTRAFORTE"),
            "ROSA EXTRAFORTE 50ML",
            &dictionaries,
            Some(&store),
            3,
        );

        assert!(ranked.len() <= 3);
        assert_eq!(ranked[0].value, "PARFUM");
        assert!(ranked[0].reason.starts_with("知识库"));
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_rank_candidates_without_token_uses_words() {
        let dictionaries = DictionarySet::from_dictionaries(&default_dictionaries());

        let ranked = rank_candidates(
            FieldType::Concentration,
            None,
            "ROSA EDTT 50ML",
            &dictionaries,
            None,
            5,
        );

        assert_eq!(ranked[0].value, "EAU_DE_TOILETTE");
    }
}
