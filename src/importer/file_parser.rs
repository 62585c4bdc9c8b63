// ==========================================
// 商品导入系统 - 文件解析器实现
// ==========================================
// 支持: 分隔文本 (.csv/.txt/.tsv, 自动识别 , ; TAB |)
//       电子表格 (.xlsx/.xlsm/.xlsb/.xls/.ods)
// 输出: 原始字符串网格,行号与源文件行一一对应
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::product_importer_trait::TabularReader;
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::path::Path;
use tracing::debug;

/// 候选分隔符（计数相同时靠前者优先）
const CANDIDATE_DELIMITERS: [u8; 4] = [b';', b',', b'\t', b'|'];

// ==========================================
// Grid - 原始网格
// ==========================================
// 行/列下标从 0 开始; 空白行保留占位
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
    delimiter: char, // 还原原始行时使用
}

impl Grid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows,
            delimiter: ';',
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 最宽行的列数
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|c| c.as_str())
    }

    pub fn is_blank_row(&self, index: usize) -> bool {
        self.row(index)
            .map_or(true, |r| r.iter().all(|c| c.trim().is_empty()))
    }

    /// 有效列数（去掉尾部空白单元格）
    pub fn populated_columns(&self, index: usize) -> usize {
        self.row(index).map_or(0, |r| {
            r.iter()
                .rposition(|c| !c.trim().is_empty())
                .map_or(0, |last| last + 1)
        })
    }

    /// 还原原始行文本（诊断用）
    pub fn raw_line(&self, index: usize) -> String {
        self.row(index)
            .map(|r| r.join(&self.delimiter.to_string()))
            .unwrap_or_default()
    }

    /// 是否不含任何非空单元格
    pub fn is_empty(&self) -> bool {
        (0..self.rows.len()).all(|i| self.is_blank_row(i))
    }
}

// ==========================================
// CSV Reader 实现
// ==========================================
pub struct CsvReader {
    delimiter: Option<u8>, // None = 自动识别
}

impl CsvReader {
    pub fn new() -> Self {
        Self { delimiter: None }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter: Some(delimiter),
        }
    }

    /// 按首个非空行中各候选分隔符出现次数识别
    pub fn sniff_delimiter(content: &str) -> u8 {
        let first_line = content
            .lines()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("");

        let mut best = (b',', 0usize);
        for candidate in CANDIDATE_DELIMITERS {
            let count = first_line.bytes().filter(|b| *b == candidate).count();
            if count > best.1 {
                best = (candidate, count);
            }
        }
        best.0
    }

    /// 按字节内容解析（供测试与内存数据使用）
    pub fn read_bytes(&self, bytes: &[u8]) -> ImportResult<Grid> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let delimiter = match self.delimiter {
            Some(d) => d,
            None => Self::sniff_delimiter(&String::from_utf8_lossy(bytes)),
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .delimiter(delimiter)
            .from_reader(bytes);

        // csv 会跳过空行,且记录位置停在被跳过的空行处:
        // 从该偏移越过行终止符得到记录真实起点,按换行数推算源行号
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut scanned = 0usize;
        let mut line = 1usize;
        for result in reader.byte_records() {
            let record = result?;

            let mut start = record
                .position()
                .map_or(scanned, |p| p.byte() as usize)
                .clamp(scanned, bytes.len());
            while start < bytes.len() && matches!(bytes[start], b'\r' | b'\n') {
                start += 1;
            }
            line += bytes[scanned..start].iter().filter(|b| **b == b'\n').count();
            scanned = start;

            while rows.len() + 1 < line {
                rows.push(Vec::new());
            }
            rows.push(record.iter().map(decode_cell).collect());
        }

        Ok(Grid::new(rows).with_delimiter(delimiter as char))
    }
}

impl Default for CsvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TabularReader for CsvReader {
    fn read(&self, file_path: &Path) -> ImportResult<Grid> {
        ensure_exists(file_path)?;

        let bytes = std::fs::read(file_path)?;
        let grid = self.read_bytes(&bytes)?;
        if grid.is_empty() {
            return Err(ImportError::EmptySource(file_path.display().to_string()));
        }

        debug!(
            path = %file_path.display(),
            rows = grid.row_count(),
            columns = grid.column_count(),
            "CSV 读取完成"
        );
        Ok(grid)
    }
}

/// UTF-8 优先,失败时按 Latin-1 逐字节解码
fn decode_cell(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.trim().to_string(),
        Err(_) => bytes
            .iter()
            .map(|&b| b as char)
            .collect::<String>()
            .trim()
            .to_string(),
    }
}

// ==========================================
// Excel Reader 实现
// ==========================================
// 读取第一个工作表
pub struct ExcelReader;

impl TabularReader for ExcelReader {
    fn read(&self, file_path: &Path) -> ImportResult<Grid> {
        ensure_exists(file_path)?;

        let mut workbook = open_workbook_auto(file_path)?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        // 已用区域不一定从 A1 开始: 补齐前导行列,保持行号与列号对齐
        let (start_row, start_col) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<String>> = vec![Vec::new(); start_row];
        for data_row in range.rows() {
            let mut cells = vec![String::new(); start_col];
            cells.extend(data_row.iter().map(|cell| cell.to_string().trim().to_string()));
            rows.push(cells);
        }

        let grid = Grid::new(rows).with_delimiter('\t');
        if grid.is_empty() {
            return Err(ImportError::EmptySource(file_path.display().to_string()));
        }

        debug!(
            path = %file_path.display(),
            sheet = %sheet_name,
            rows = grid.row_count(),
            "工作表读取完成"
        );
        Ok(grid)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl TabularReader for UniversalFileParser {
    fn read(&self, file_path: &Path) -> ImportResult<Grid> {
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" | "txt" | "tsv" => CsvReader::new().read(file_path),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => ExcelReader.read(file_path),
            _ => {
                ensure_exists(file_path)?;
                Err(ImportError::UnsupportedFormat(ext))
            }
        }
    }
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ImportError::FileNotFound(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(content: &[u8]) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        temp_file.write_all(content).unwrap();
        temp_file
    }

    #[test]
    fn test_csv_reader_semicolon_sniffed() {
        let temp_file = csv_file(b"CODICE;DESCRIZIONE;PREZZO\nA001;ADP EDT 30ML;29,90\n");

        let grid = CsvReader::new().read(temp_file.path()).unwrap();

        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.cell(1, 2), Some("29,90"));
        assert_eq!(grid.raw_line(1), "A001;ADP EDT 30ML;29,90");
    }

    #[test]
    fn test_sniff_delimiter_variants() {
        assert_eq!(CsvReader::sniff_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(CsvReader::sniff_delimiter("\n\na\tb\tc"), b'\t');
        assert_eq!(CsvReader::sniff_delimiter("a;b,c;d"), b';');
        assert_eq!(CsvReader::sniff_delimiter("single"), b',');
    }

    #[test]
    fn test_csv_blank_lines_keep_row_numbers() {
        let grid = CsvReader::new()
            .read_bytes(b"code,name\n\nA1,Rosa\n")
            .unwrap();

        assert_eq!(grid.row_count(), 3);
        assert!(grid.is_blank_row(1));
        assert_eq!(grid.cell(2, 0), Some("A1"));
    }

    #[test]
    fn test_csv_blank_lines_crlf_and_quoted_newline() {
        let grid = CsvReader::with_delimiter(b';')
            .read_bytes(b"\r\ncode;name\r\n\r\n\r\nA1;\"Rosa\nBianca\"\r\n\r\nA2;Viola\r\n")
            .unwrap();

        // 行 1 空, 行 2 表头, 行 3-4 空, 行 5-6 引号内换行, 行 7 空, 行 8 A2
        assert_eq!(grid.row_count(), 8);
        assert_eq!(grid.cell(1, 0), Some("code"));
        assert_eq!(grid.cell(4, 0), Some("A1"));
        assert!(grid.is_blank_row(5));
        assert!(grid.is_blank_row(6));
        assert_eq!(grid.cell(7, 0), Some("A2"));
    }

    #[test]
    fn test_csv_latin1_and_bom() {
        let grid = CsvReader::new()
            .read_bytes(b"\xEF\xBB\xBFcode;name\nA1;Quantit\xE0\n")
            .unwrap();

        assert_eq!(grid.cell(0, 0), Some("code"));
        assert_eq!(grid.cell(1, 1), Some("Quantità"));
    }

    #[test]
    fn test_populated_columns_trims_trailing_blanks() {
        let grid = Grid::new(vec![vec![
            "a".into(),
            "".into(),
            "c".into(),
            " ".into(),
            "".into(),
        ]]);
        assert_eq!(grid.populated_columns(0), 3);
        assert_eq!(grid.populated_columns(5), 0);
    }

    #[test]
    fn test_csv_reader_file_not_found() {
        let result = CsvReader::new().read(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_reader_empty_source() {
        let temp_file = csv_file(b" , ,\n\n");
        let result = CsvReader::new().read(temp_file.path());
        assert!(matches!(result, Err(ImportError::EmptySource(_))));
    }

    #[test]
    fn test_universal_parser_unsupported_format() {
        let temp_file = Builder::new().suffix(".pdf").tempfile().unwrap();
        let result = UniversalFileParser.read(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_universal_parser_dispatches_csv() {
        let temp_file = csv_file(b"code,name\nA1,Rosa\n");
        let grid = UniversalFileParser.read(temp_file.path()).unwrap();
        assert_eq!(grid.cell(1, 1), Some("Rosa"));
    }
}
