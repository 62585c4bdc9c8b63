// ==========================================
// 商品导入系统 - 商品导入器实现
// ==========================================
// 职责: 异步门面,整合 读取 → 转换编排 → 结果
// 说明: 行处理是同步的（交互式歧义处理器会阻塞）,放在阻塞线程池执行
// ==========================================

use crate::config::profile::ConversionProfile;
use crate::domain::product::ConversionResult;
use crate::engine::ambiguity::AmbiguityResolver;
use crate::engine::orchestrator::{CancellationFlag, ConversionOrchestrator};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::product_importer_trait::{ProductImporter, TabularReader};
use crate::knowledge::KnowledgeStore;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, instrument};

// ==========================================
// ProductImporterImpl - 商品导入器实现
// ==========================================
pub struct ProductImporterImpl {
    orchestrator: Arc<ConversionOrchestrator>,
    reader: Arc<dyn TabularReader>,
}

impl ProductImporterImpl {
    /// 创建导入器
    ///
    /// # 参数
    /// - orchestrator: 已校验配置的转换编排器
    /// - reader: 文件读取器
    pub fn new(orchestrator: ConversionOrchestrator, reader: Arc<dyn TabularReader>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            reader,
        }
    }

    /// 由转换方案构造（按扩展名自动选择读取器）
    ///
    /// # 返回
    /// - Err: 配置无效
    pub fn from_profile(
        profile: ConversionProfile,
        knowledge: Option<Arc<KnowledgeStore>>,
        resolver: Option<Arc<dyn AmbiguityResolver>>,
    ) -> ImportResult<Self> {
        let mut orchestrator = ConversionOrchestrator::new(profile, knowledge)?;
        if let Some(resolver) = resolver {
            orchestrator = orchestrator.with_resolver(resolver);
        }
        Ok(Self::new(orchestrator, Arc::new(UniversalFileParser)))
    }

    pub fn orchestrator(&self) -> &ConversionOrchestrator {
        &self.orchestrator
    }

    /// 取消句柄（克隆共享同一标记）
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.orchestrator.cancellation_flag()
    }
}

#[async_trait]
impl ProductImporter for ProductImporterImpl {
    #[instrument(skip(self, file_path), fields(file))]
    async fn import_file<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
    ) -> ImportResult<ConversionResult> {
        let path = file_path.as_ref().to_path_buf();
        tracing::Span::current().record("file", path.display().to_string().as_str());

        let orchestrator = Arc::clone(&self.orchestrator);
        let reader = Arc::clone(&self.reader);

        let result = tokio::task::spawn_blocking(move || {
            orchestrator.convert_file(reader.as_ref(), &path)
        })
        .await
        .map_err(|e| ImportError::InternalError(format!("导入任务异常终止: {}", e)))??;

        info!(
            batch_id = %result.batch_id,
            summary = %result.summary(),
            "文件导入完成"
        );
        Ok(result)
    }

    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
    ) -> Vec<Result<ConversionResult, String>> {
        use futures::future::join_all;

        info!(count = file_paths.len(), "开始批量导入文件");

        // 为每个文件创建导入任务
        let import_tasks = file_paths.into_iter().map(|path| {
            let path_str = path.as_ref().display().to_string();
            async move {
                match self.import_file(path).await {
                    Ok(result) => Ok(result),
                    Err(e) => {
                        error!(file = %path_str, error = %e, "文件导入失败");
                        Err(format!("文件 {} 导入失败: {}", path_str, e))
                    }
                }
            }
        });

        // 并发执行所有导入任务
        let results = join_all(import_tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );

        results
    }
}
