// ==========================================
// 商品导入系统 - 导入接口 Trait
// ==========================================
// 职责: 定义导入接口（不包含实现）
// 实现者: ProductImporterImpl / CsvReader / ExcelReader
// ==========================================

use crate::domain::product::ConversionResult;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::Grid;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// ProductImporter Trait
// ==========================================
// 用途: 商品导入主接口
// 实现者: ProductImporterImpl
#[async_trait]
pub trait ProductImporter: Send + Sync {
    /// 导入单个供应商文件
    ///
    /// # 返回
    /// - Ok(ConversionResult): 有效记录 + 行级错误 + 汇总计数
    /// - Err: 配置错误、文件读取错误（致命）
    ///
    /// # 导入流程
    /// 1. 配置校验（任何行处理之前）
    /// 2. 文件读取为网格
    /// 3. 逐行: 列映射 → 字段标准化 → 描述列文本抽取 → 歧义处理
    /// 4. 结果组装
    async fn import_file<P: AsRef<Path> + Send>(&self, file_path: P)
        -> ImportResult<ConversionResult>;

    /// 批量导入多个文件（并发执行）
    ///
    /// # 说明
    /// - 每个文件的导入是独立的，互不影响
    /// - 某个文件失败不影响其他文件,失败以错误描述返回
    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
    ) -> Vec<Result<ConversionResult, String>>;
}

// ==========================================
// TabularReader Trait
// ==========================================
// 用途: 文件 → 原始字符串网格
// 实现者: CsvReader, ExcelReader, UniversalFileParser
pub trait TabularReader: Send + Sync {
    /// 读取文件为网格
    ///
    /// # 返回
    /// - Ok(Grid): 行列均为原始字符串（已 trim）
    /// - Err: FileNotFound / UnsupportedFormat / EmptySource / 解析错误
    fn read(&self, file_path: &Path) -> ImportResult<Grid>;
}
