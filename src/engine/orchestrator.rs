// ==========================================
// 商品导入系统 - 转换编排器
// ==========================================
// 用途: 逐行驱动 列映射 → 字段标准化 → 文本抽取 → 歧义处理 → 结果组装
// 红线: 配置错误在处理任何行之前抛出; 单行失败只产生 RowError,不中断批次
// 红线: 缺编码/名称的记录静默丢弃（仅计入 dropped_count,不算错误）
// ==========================================

use crate::config::profile::ConversionProfile;
use crate::domain::ambiguity::{AmbiguityContext, Candidate, Resolution};
use crate::domain::product::{ConversionResult, ProductRecord, RowError};
use crate::domain::rule::DictionarySet;
use crate::domain::types::{ConfidenceLevel, FieldType, ValidationState};
use crate::engine::ambiguity::{self, AmbiguityResolver};
use crate::engine::extraction::{ExtractedField, ExtractionEngine};
use crate::importer::column_mapper::ColumnMapper;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_normalizer::{normalize_text, FieldNormalizer};
use crate::importer::file_parser::Grid;
use crate::importer::product_importer_trait::TabularReader;
use crate::knowledge::KnowledgeStore;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ==========================================
// CancellationFlag - 协作式取消
// ==========================================
// 行与行之间检查; 取消后返回已累积的部分结果
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ==========================================
// RowOutcome - 单行处理结果
// ==========================================
struct RowOutcome {
    record: ProductRecord,
    applied_entries: Vec<String>, // 本行应用过的知识条目
}

// ==========================================
// ConversionOrchestrator - 转换编排器
// ==========================================
pub struct ConversionOrchestrator {
    profile: ConversionProfile,
    normalizer: FieldNormalizer,
    extraction: ExtractionEngine,
    knowledge: Option<Arc<KnowledgeStore>>,
    resolver: Option<Arc<dyn AmbiguityResolver>>,
    cancellation: CancellationFlag,
}

impl ConversionOrchestrator {
    /// 创建编排器
    ///
    /// 知识库按方案的强化步长与模糊距离使用（与传入的知识库共享数据与写锁）
    ///
    /// # 返回
    /// - Err(ConfigurationError / InvalidPattern): 配置无效,不处理任何行
    pub fn new(
        profile: ConversionProfile,
        knowledge: Option<Arc<KnowledgeStore>>,
    ) -> ImportResult<Self> {
        ColumnMapper::new(&profile.file).validate()?;

        let knowledge = knowledge.map(|store| {
            Arc::new(store.configured(
                profile.settings.reinforcement_delta,
                profile.settings.fuzzy_max_distance,
            ))
        });

        let dictionaries = Arc::new(DictionarySet::from_dictionaries(&profile.dictionaries));
        let extraction = ExtractionEngine::new(&profile, dictionaries.clone(), knowledge.clone())?;

        info!(
            layout = %profile.file.name,
            columns = profile.file.column_mapping.len(),
            description_columns = profile.file.description_columns.len(),
            rules = profile.rules.len(),
            "转换编排器已创建"
        );

        Ok(Self {
            normalizer: FieldNormalizer::new(dictionaries),
            extraction,
            knowledge,
            resolver: None,
            cancellation: CancellationFlag::new(),
            profile,
        })
    }

    /// 注入歧义处理器（缺省: 无处理器,低置信度直接取默认值）
    pub fn with_resolver(mut self, resolver: Arc<dyn AmbiguityResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    pub fn profile(&self) -> &ConversionProfile {
        &self.profile
    }

    pub fn knowledge(&self) -> Option<&Arc<KnowledgeStore>> {
        self.knowledge.as_ref()
    }

    // ==========================================
    // 转换入口
    // ==========================================

    /// 读取文件并转换（读取失败为致命错误）
    pub fn convert_file(
        &self,
        reader: &dyn TabularReader,
        file_path: &Path,
    ) -> ImportResult<ConversionResult> {
        info!(file = %file_path.display(), "开始读取源文件");
        let grid = reader.read(file_path)?;
        Ok(self.convert_grid(&grid))
    }

    /// 逐行转换网格
    pub fn convert_grid(&self, grid: &Grid) -> ConversionResult {
        let started = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        let mut result = ConversionResult::new(&batch_id);
        let mapper = ColumnMapper::new(&self.profile.file);
        let min_columns = self.profile.file.min_columns;

        info!(
            batch_id = %batch_id,
            rows = grid.row_count(),
            columns = grid.column_count(),
            "开始转换"
        );

        let range = match mapper.row_range(grid.row_count()) {
            Some(range) => range,
            None => {
                warn!(batch_id = %batch_id, "数据行范围为空");
                result.elapsed_ms = started.elapsed().as_millis();
                return result;
            }
        };

        for index in range {
            if self.cancellation.is_cancelled() {
                warn!(batch_id = %batch_id, row_number = index + 1, "转换已取消,返回部分结果");
                result.cancelled = true;
                break;
            }

            let row_number = index + 1;
            let cells = grid.row(index).unwrap_or(&[]);

            if grid.is_blank_row(index) {
                result.skipped_count += 1;
                continue;
            }
            if self.profile.file.has_inner_titles && self.is_inner_title(cells) {
                debug!(row_number, "跳过内嵌标题行");
                result.skipped_count += 1;
                continue;
            }

            result.total_processed += 1;

            let populated = grid.populated_columns(index);
            if populated < min_columns {
                let e = ImportError::RowParseError {
                    row: row_number,
                    field: "row".to_string(),
                    value: populated.to_string(),
                    message: format!("有效列数 {} 少于要求的 {}", populated, min_columns),
                };
                warn!(row_number, error = %e, "行列数不足");
                result.push_error(row_error(row_number, &e, grid.raw_line(index)));
                continue;
            }

            match self.process_row(cells, row_number, &mapper) {
                Ok(outcome) => {
                    let kept = outcome.record.has_required_fields();
                    self.record_knowledge_outcome(&outcome.applied_entries, kept);
                    if kept {
                        result.push_record(outcome.record);
                    } else {
                        debug!(row_number, "缺少编码或名称,记录丢弃");
                        result.dropped_count += 1;
                    }
                }
                Err(e) => {
                    warn!(row_number, error = %e, "行处理失败");
                    result.push_error(row_error(row_number, &e, grid.raw_line(index)));
                }
            }
        }

        result.elapsed_ms = started.elapsed().as_millis();
        info!(
            batch_id = %batch_id,
            total = result.total_processed,
            valid = result.valid_count,
            errors = result.error_count,
            dropped = result.dropped_count,
            skipped = result.skipped_count,
            cancelled = result.cancelled,
            elapsed_ms = result.elapsed_ms as u64,
            "转换完成"
        );
        result
    }

    /// 单条自由文本描述 → 记录（仅抽取 + 歧义处理）
    pub fn parse_description(&self, text: &str, row_number: usize) -> ImportResult<ProductRecord> {
        let mut record = ProductRecord::new(row_number);
        record.description = normalize_text(text);

        let (_, needs_review) = self.extract_and_resolve(text, &mut record)?;
        record.validation_state = Some(validation_state(needs_review));
        Ok(record)
    }

    // ==========================================
    // 行处理
    // ==========================================

    fn process_row(
        &self,
        cells: &[String],
        row_number: usize,
        mapper: &ColumnMapper<'_>,
    ) -> ImportResult<RowOutcome> {
        let mut record = ProductRecord::new(row_number);

        for (col, field) in mapper.mapped_columns() {
            if let Some(raw) = cells.get(col) {
                self.normalizer.normalize_into(field, raw, &mut record);
            }
        }

        let mut applied_entries = Vec::new();
        let mut needs_review = false;

        for col in mapper.description_columns() {
            let text = match cells.get(col) {
                Some(text) if !text.trim().is_empty() => text,
                _ => continue,
            };
            if record.description.is_none() {
                record.description = normalize_text(text);
            }

            let (applied, review) = self.extract_and_resolve(text, &mut record)?;
            applied_entries.extend(applied);
            needs_review |= review;
        }

        record.validation_state = Some(validation_state(needs_review));
        Ok(RowOutcome {
            record,
            applied_entries,
        })
    }

    /// 抽取并处理低置信度字段
    ///
    /// # 返回
    /// (应用过的知识条目 ID, 是否需要人工复核)
    fn extract_and_resolve(
        &self,
        text: &str,
        record: &mut ProductRecord,
    ) -> ImportResult<(Vec<String>, bool)> {
        let outcome = self.extraction.extract(text, record);
        let applied: Vec<String> = outcome
            .applied_entries()
            .into_iter()
            .map(|id| id.to_string())
            .collect();

        let mut needs_review = false;
        for low in outcome.low_confidence() {
            if record.is_set(low.field) {
                continue;
            }
            if !self.resolve_field(text, &outcome.working_text, low, record)? {
                needs_review = true;
            }
        }

        Ok((applied, needs_review))
    }

    /// 低置信度字段交给歧义处理器
    ///
    /// # 返回
    /// - true: 处理器选定了可用值
    /// - false: 跳过或无处理器,已写入默认值并留备注
    fn resolve_field(
        &self,
        text: &str,
        working_text: &str,
        low: &ExtractedField,
        record: &mut ProductRecord,
    ) -> ImportResult<bool> {
        let field = low.field;
        let decision: Option<(Candidate, bool)> = match &self.resolver {
            Some(resolver) => {
                let candidates = ambiguity::rank_candidates(
                    field,
                    low.token.as_deref(),
                    working_text,
                    self.extraction.dictionaries(),
                    self.knowledge.as_deref(),
                    self.profile.settings.max_candidates,
                );
                let ctx = AmbiguityContext {
                    row_number: record.row_number,
                    original_text: text,
                    field,
                    token: low.token.as_deref(),
                    partial_record: record,
                    confidence: ConfidenceLevel::Low.score(),
                };
                match ambiguity::dispatch(resolver.as_ref(), &ctx, &candidates) {
                    Resolution::Selected(candidate) => {
                        let learn = resolver.should_learn(&ctx, &candidate);
                        Some((candidate, learn))
                    }
                    Resolution::Skip => None,
                }
            }
            None => None,
        };

        if let Some((mut candidate, learn)) = decision {
            // 人工输入的同义词（如 edp）先经字典换成规范值
            if let Some(canonical) = self
                .extraction
                .dictionaries()
                .lookup(field, &candidate.value)
            {
                candidate.value = canonical.to_string();
            }
            if record.apply_canonical(field, &candidate.value) {
                if learn {
                    self.learn(field, low.token.as_deref().unwrap_or(working_text), &candidate)?;
                }
                debug!(
                    row_number = record.row_number,
                    field = %field,
                    value = %candidate.value,
                    learn,
                    "歧义已由处理器确定"
                );
                return Ok(true);
            }
            warn!(
                row_number = record.row_number,
                field = %field,
                value = %candidate.value,
                "选定值无法应用到字段,按默认值处理"
            );
        }

        record.apply_default(field);
        let unresolved = ImportError::AmbiguityUnresolved {
            row: record.row_number,
            field: field.to_string(),
        };
        record.add_remark(match &low.token {
            Some(token) => format!("{}: 片段 \"{}\" 置信度低,已取默认值", unresolved, token),
            None => format!("{}: 未能抽取,已取默认值", unresolved),
        });
        Ok(false)
    }

    /// 修正写入知识库（单写者由 KnowledgeStore 保证）
    fn learn(&self, field: FieldType, pattern: &str, candidate: &Candidate) -> ImportResult<()> {
        let store = match &self.knowledge {
            Some(store) => store,
            None => return Ok(()),
        };
        store.add_entry(
            field,
            pattern,
            &candidate.value,
            candidate.score,
            &self.profile.settings.default_author,
        )?;
        Ok(())
    }

    /// 回写知识条目应用结果（失败只记日志）
    fn record_knowledge_outcome(&self, entry_ids: &[String], was_successful: bool) {
        let store = match &self.knowledge {
            Some(store) => store,
            None => return,
        };
        for entry_id in entry_ids {
            if let Err(e) = store.update_success_rate(entry_id, was_successful) {
                warn!(entry_id = %entry_id, error = %e, "知识条目成功率更新失败");
            }
        }
    }

    /// 内嵌标题行: 命中的不同表头关键字数 ≥ 阈值
    fn is_inner_title(&self, cells: &[String]) -> bool {
        let lowered: Vec<String> = cells.iter().map(|c| c.to_lowercase()).collect();
        let keywords: BTreeSet<String> = self
            .profile
            .settings
            .header_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        let hits = keywords
            .iter()
            .filter(|k| lowered.iter().any(|c| c.contains(k.as_str())))
            .count();
        hits >= self.profile.settings.inner_title_threshold
    }
}

/// 行级错误 → RowError（位置由调用方给出）
fn row_error(row_number: usize, e: &ImportError, raw_line: String) -> RowError {
    RowError {
        row: row_number,
        field: e.field().to_string(),
        value: e.value().to_string(),
        message: e.detail(),
        raw_line,
    }
}

fn validation_state(needs_review: bool) -> ValidationState {
    if needs_review {
        ValidationState::NeedsReview
    } else {
        ValidationState::Valid
    }
}
