// ==========================================
// 商品导入系统 - 列映射引擎
// ==========================================
// 职责: 列号 → 字段查询、忽略列判定、行范围、配置校验
// 红线: 纯函数,不读写网格以外的任何状态
// ==========================================

use crate::config::file_configuration::FileConfiguration;
use crate::domain::types::FieldType;
use crate::importer::error::{ImportError, ImportResult};
use std::collections::HashMap;
use std::ops::RangeInclusive;

pub struct ColumnMapper<'a> {
    config: &'a FileConfiguration,
}

impl<'a> ColumnMapper<'a> {
    pub fn new(config: &'a FileConfiguration) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FileConfiguration {
        self.config
    }

    /// 校验配置
    ///
    /// # 失败条件（ConfigurationError）
    /// - 映射为空
    /// - 缺少编码字段
    /// - 非忽略字段映射到多列
    /// - 数据起始行不在表头之后; 结束行不在起始行之后
    pub fn validate(&self) -> ImportResult<()> {
        let config = self.config;

        if config.column_mapping.is_empty() {
            return Err(ImportError::ConfigurationError(
                "列映射不能为空".to_string(),
            ));
        }

        if !config
            .column_mapping
            .values()
            .any(|f| *f == FieldType::Code)
        {
            return Err(ImportError::ConfigurationError(
                "列映射缺少编码字段 (code)".to_string(),
            ));
        }

        let mut seen: HashMap<FieldType, usize> = HashMap::new();
        for (&col, &field) in &config.column_mapping {
            if field.is_ignore() {
                continue;
            }
            if let Some(prev) = seen.insert(field, col) {
                return Err(ImportError::ConfigurationError(format!(
                    "字段 {} 被映射到多列 ({} 与 {})",
                    field, prev, col
                )));
            }
        }

        if config.data_start_row <= config.header_row {
            return Err(ImportError::ConfigurationError(format!(
                "数据起始行 ({}) 必须位于表头行 ({}) 之后",
                config.data_start_row, config.header_row
            )));
        }

        if let Some(end) = config.data_end_row {
            if end <= config.data_start_row {
                return Err(ImportError::ConfigurationError(format!(
                    "数据结束行 ({}) 必须位于起始行 ({}) 之后",
                    end, config.data_start_row
                )));
            }
        }

        Ok(())
    }

    /// 列对应字段（未映射时为 Ignore）
    pub fn field_for(&self, col: usize) -> FieldType {
        self.config
            .column_mapping
            .get(&col)
            .copied()
            .unwrap_or(FieldType::Ignore)
    }

    /// 忽略列: 显式忽略,或映射为 Ignore
    pub fn is_ignored(&self, col: usize) -> bool {
        self.config.ignored_columns.contains(&col) || self.field_for(col).is_ignore()
    }

    /// 需要标准化的列（列号升序）
    pub fn mapped_columns(&self) -> impl Iterator<Item = (usize, FieldType)> + '_ {
        self.config
            .column_mapping
            .iter()
            .map(|(&col, &field)| (col, field))
            .filter(move |(col, _)| !self.is_ignored(*col))
    }

    pub fn description_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.config.description_columns.iter().copied()
    }

    /// 数据行范围（含两端）; 结束行缺省或越界时取网格最后一行
    pub fn row_range(&self, row_count: usize) -> Option<RangeInclusive<usize>> {
        let last = row_count.checked_sub(1)?;
        let start = self.config.data_start_row;
        let end = self.config.data_end_row.map_or(last, |e| e.min(last));
        if start > end {
            None
        } else {
            Some(start..=end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FileConfiguration {
        FileConfiguration::from_pairs(&[
            (0, FieldType::Code),
            (1, FieldType::Name),
            (2, FieldType::Ignore),
            (3, FieldType::Price),
        ])
    }

    #[test]
    fn test_validate_ok() {
        assert!(ColumnMapper::new(&config()).validate().is_ok());
    }

    #[test]
    fn test_validate_missing_identifier() {
        let cfg = FileConfiguration::from_pairs(&[(0, FieldType::Name)]);
        let err = ColumnMapper::new(&cfg).validate().unwrap_err();
        assert!(matches!(err, ImportError::ConfigurationError(_)));
    }

    #[test]
    fn test_validate_empty_mapping() {
        let cfg = FileConfiguration::from_pairs(&[]);
        assert!(ColumnMapper::new(&cfg).validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_field() {
        let cfg = FileConfiguration::from_pairs(&[
            (0, FieldType::Code),
            (1, FieldType::Name),
            (2, FieldType::Name),
        ]);
        assert!(ColumnMapper::new(&cfg).validate().is_err());
    }

    #[test]
    fn test_validate_ignore_may_repeat() {
        let cfg = FileConfiguration::from_pairs(&[
            (0, FieldType::Code),
            (1, FieldType::Ignore),
            (2, FieldType::Ignore),
        ]);
        assert!(ColumnMapper::new(&cfg).validate().is_ok());
    }

    #[test]
    fn test_validate_row_ordering() {
        let cfg = config().with_rows(2, 2, None);
        assert!(ColumnMapper::new(&cfg).validate().is_err());

        let cfg = config().with_rows(0, 3, Some(3));
        assert!(ColumnMapper::new(&cfg).validate().is_err());

        let cfg = config().with_rows(0, 3, Some(4));
        assert!(ColumnMapper::new(&cfg).validate().is_ok());
    }

    #[test]
    fn test_field_for_and_ignored() {
        let cfg = config().with_ignored_columns(&[3]);
        let mapper = ColumnMapper::new(&cfg);

        assert_eq!(mapper.field_for(0), FieldType::Code);
        assert_eq!(mapper.field_for(9), FieldType::Ignore);
        assert!(mapper.is_ignored(2));
        assert!(mapper.is_ignored(3));
        assert!(mapper.is_ignored(9));
        assert!(!mapper.is_ignored(1));

        let mapped: Vec<_> = mapper.mapped_columns().collect();
        assert_eq!(mapped, vec![(0, FieldType::Code), (1, FieldType::Name)]);
    }

    #[test]
    fn test_row_range() {
        let cfg = config();
        let mapper = ColumnMapper::new(&cfg);
        assert_eq!(mapper.row_range(5), Some(1..=4));
        assert_eq!(mapper.row_range(1), None);
        assert_eq!(mapper.row_range(0), None);

        let cfg = config().with_rows(0, 1, Some(10));
        assert_eq!(ColumnMapper::new(&cfg).row_range(4), Some(1..=3));
    }
}
