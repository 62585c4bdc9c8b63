// ==========================================
// 商品导入系统 - 文件布局配置
// ==========================================
// 职责: 声明表头行、数据行范围、列 → 字段映射、忽略列、描述列
// 校验由 importer::column_mapper::ColumnMapper 完成
// ==========================================

use crate::domain::types::FieldType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ==========================================
// FileConfiguration - 文件布局配置
// ==========================================
// 行号、列号均为 0 起的网格下标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfiguration {
    /// 供应商/布局名称
    #[serde(default)]
    pub name: String,

    pub header_row: usize,
    pub data_start_row: usize,

    /// 数据结束行（含）; 缺省为网格最后一行
    #[serde(default)]
    pub data_end_row: Option<usize>,

    /// 列号 → 字段
    pub column_mapping: BTreeMap<usize, FieldType>,

    #[serde(default)]
    pub ignored_columns: BTreeSet<usize>,

    /// 需要文本抽取的描述列
    #[serde(default)]
    pub description_columns: BTreeSet<usize>,

    /// 行最少有效列数
    #[serde(default)]
    pub min_columns: usize,

    /// 数据区内夹带重复标题行
    #[serde(default)]
    pub has_inner_titles: bool,
}

impl FileConfiguration {
    /// 创建配置（表头在第 0 行,数据从第 1 行开始）
    pub fn new(column_mapping: BTreeMap<usize, FieldType>) -> Self {
        Self {
            name: String::new(),
            header_row: 0,
            data_start_row: 1,
            data_end_row: None,
            column_mapping,
            ignored_columns: BTreeSet::new(),
            description_columns: BTreeSet::new(),
            min_columns: 0,
            has_inner_titles: false,
        }
    }

    /// 由 (列号, 字段) 列表构造
    pub fn from_pairs(pairs: &[(usize, FieldType)]) -> Self {
        Self::new(pairs.iter().copied().collect())
    }

    pub fn with_rows(mut self, header_row: usize, start: usize, end: Option<usize>) -> Self {
        self.header_row = header_row;
        self.data_start_row = start;
        self.data_end_row = end;
        self
    }

    pub fn with_description_columns(mut self, columns: &[usize]) -> Self {
        self.description_columns = columns.iter().copied().collect();
        self
    }

    pub fn with_ignored_columns(mut self, columns: &[usize]) -> Self {
        self.ignored_columns = columns.iter().copied().collect();
        self
    }

    pub fn with_min_columns(mut self, min_columns: usize) -> Self {
        self.min_columns = min_columns;
        self
    }

    pub fn with_inner_titles(mut self, has_inner_titles: bool) -> Self {
        self.has_inner_titles = has_inner_titles;
        self
    }
}
