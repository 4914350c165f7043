// ==========================================
// 家具配置报价系统 - 导入层
// ==========================================
// 职责: 外部目录数据 (CSV) 导入
// 流程: 解析 → 字段映射 → 目录不变量校验 → 落库
// ==========================================

pub mod catalog_importer;
pub mod csv_parser;
pub mod error;

pub use catalog_importer::{CatalogEntity, CatalogImporter, ImportSummary};
pub use csv_parser::{CsvParser, ParsedCsv, RawRecord};
pub use error::{ImportError, ImportResult};
