// ==========================================
// 家具配置报价系统 - CSV 解析器
// ==========================================
// 职责: CSV → 原始记录 (表头 → 单元格文本)
// 红线: 只做文本切分与去空白,不做类型转换
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// 一行原始记录
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// 数据行号 (表头为第 1 行,数据从第 2 行开始)
    pub row: usize,
    pub fields: HashMap<String, String>,
}

impl RawRecord {
    /// 取单元格 (不存在或为空返回 None)
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// 解析结果 (表头 + 数据行)
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl ParsedCsv {
    /// 校验必需列是否存在
    pub fn require_columns(&self, columns: &[&str]) -> ImportResult<()> {
        match columns.iter().find(|c| !self.headers.iter().any(|h| h == *c)) {
            Some(missing) => Err(ImportError::MissingColumn(missing.to_string())),
            None => Ok(()),
        }
    }
}

pub struct CsvParser;

impl CsvParser {
    /// 解析 CSV 文件
    pub fn parse_file(path: &Path) -> ImportResult<ParsedCsv> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        if let Some(ext) = path.extension() {
            if !ext.eq_ignore_ascii_case("csv") {
                return Err(ImportError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ));
            }
        }
        let file = File::open(path)?;
        Self::parse_reader(file)
    }

    /// 解析任意输入流 (表头必需,列名不区分大小写)
    pub fn parse_reader<R: Read>(reader: R) -> ImportResult<ParsedCsv> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        let mut records = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let fields: HashMap<String, String> = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect();

            // 跳过完全空白的行
            if fields.values().all(|v| v.is_empty()) {
                continue;
            }
            records.push(RawRecord { row: idx + 2, fields });
        }
        Ok(ParsedCsv { headers, records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reader_skips_blank_rows() {
        let data = "ID,Name\n a , Board \n,\nb,Glass\n";
        let parsed = CsvParser::parse_reader(data.as_bytes()).unwrap();
        assert_eq!(parsed.headers, vec!["id", "name"]);
        let records = parsed.records;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("id"), Some("a"));
        assert_eq!(records[0].get("name"), Some("Board"));
        assert_eq!(records[1].row, 4);
    }

    #[test]
    fn test_require_columns() {
        let parsed = CsvParser::parse_reader("id,name\nx,y\n".as_bytes()).unwrap();
        assert!(parsed.require_columns(&["id", "name"]).is_ok());
        match parsed.require_columns(&["id", "price"]).unwrap_err() {
            ImportError::MissingColumn(c) => assert_eq!(c, "price"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = CsvParser::parse_file(Path::new("/nonexistent/catalog.csv")).unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
    }
}
