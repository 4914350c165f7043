// ==========================================
// 家具配置报价系统 - 目录导入器
// ==========================================
// 职责: CSV → 板材 / 加工项 / 配件,合并进现有目录后整体校验再落库
// 流程: 解析 → 字段映射 → 与现有目录合并 (同 id 覆盖) → CatalogStore 校验 → 写库
// 红线: 任一行失败则整批不写入
// ==========================================

use crate::domain::catalog::{AccessoryItem, Catalog, Material, ProcessingOption};
use crate::domain::types::{MaterialType, ModuleType};
use crate::engine::catalog_store::CatalogStore;
use crate::importer::csv_parser::{CsvParser, ParsedCsv, RawRecord};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::CatalogRepository;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// 导入的目录实体类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogEntity {
    Material,
    ProcessingOption,
    Accessory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub entity: CatalogEntity,
    pub imported: usize,
    /// 覆盖了已有 id 的条数
    pub replaced: usize,
}

// 必需列 (其余列可省略,取默认值)
const MATERIAL_COLUMNS: &[&str] = &["id", "code", "name", "type", "thickness_mm", "price_per_sqm"];
const PROCESSING_COLUMNS: &[&str] = &[
    "id",
    "name",
    "type",
    "price_per_unit",
    "unit",
    "compatible_materials",
];
const ACCESSORY_COLUMNS: &[&str] = &["id", "code", "name", "type", "price", "stock_qty", "compatibility"];

// ==========================================
// CatalogImporter - 目录导入器
// ==========================================
pub struct CatalogImporter {
    repo: Arc<CatalogRepository>,
}

impl CatalogImporter {
    pub fn new(repo: Arc<CatalogRepository>) -> Self {
        Self { repo }
    }

    pub fn import_materials_file(&self, path: &Path) -> ImportResult<ImportSummary> {
        self.import_materials(CsvParser::parse_file(path)?)
    }

    pub fn import_processing_file(&self, path: &Path) -> ImportResult<ImportSummary> {
        self.import_processing_options(CsvParser::parse_file(path)?)
    }

    pub fn import_accessories_file(&self, path: &Path) -> ImportResult<ImportSummary> {
        self.import_accessories(CsvParser::parse_file(path)?)
    }

    /// 列: id, code, name, type, thickness_mm, price_per_sqm, manufacturer, paintable, cantable, in_stock
    pub fn import_materials(&self, csv: ParsedCsv) -> ImportResult<ImportSummary> {
        csv.require_columns(MATERIAL_COLUMNS)?;
        let items = csv
            .records
            .iter()
            .map(map_material)
            .collect::<ImportResult<Vec<_>>>()?;
        let mut catalog = self.repo.load_catalog()?;
        let replaced = merge(&mut catalog.materials, items.clone(), |m| &m.id);
        self.commit(catalog, CatalogEntity::Material, items.len(), replaced)
    }

    /// 列: id, name, type, price_per_unit, unit, compatible_materials (以 | 分隔)
    pub fn import_processing_options(&self, csv: ParsedCsv) -> ImportResult<ImportSummary> {
        csv.require_columns(PROCESSING_COLUMNS)?;
        let items = csv
            .records
            .iter()
            .map(map_processing)
            .collect::<ImportResult<Vec<_>>>()?;
        let mut catalog = self.repo.load_catalog()?;
        let replaced = merge(&mut catalog.processing_options, items.clone(), |p| &p.id);
        self.commit(catalog, CatalogEntity::ProcessingOption, items.len(), replaced)
    }

    /// 列: id, code, name, type, manufacturer, price, stock_qty, compatibility (以 | 分隔)
    pub fn import_accessories(&self, csv: ParsedCsv) -> ImportResult<ImportSummary> {
        csv.require_columns(ACCESSORY_COLUMNS)?;
        let items = csv
            .records
            .iter()
            .map(map_accessory)
            .collect::<ImportResult<Vec<_>>>()?;
        let mut catalog = self.repo.load_catalog()?;
        let replaced = merge(&mut catalog.accessories, items.clone(), |a| &a.id);
        self.commit(catalog, CatalogEntity::Accessory, items.len(), replaced)
    }

    fn commit(
        &self,
        catalog: Catalog,
        entity: CatalogEntity,
        imported: usize,
        replaced: usize,
    ) -> ImportResult<ImportSummary> {
        // 合并后的目录必须满足全部目录不变量
        CatalogStore::new(catalog.clone())?;
        self.repo.replace_catalog(&catalog)?;

        info!(entity = ?entity, imported = imported, replaced = replaced, "目录导入完成");
        Ok(ImportSummary {
            entity,
            imported,
            replaced,
        })
    }
}

/// 同 id 覆盖,新 id 追加; 返回覆盖条数
fn merge<T, F>(existing: &mut Vec<T>, incoming: Vec<T>, id: F) -> usize
where
    F: Fn(&T) -> &String,
{
    let mut replaced = 0;
    for item in incoming {
        match existing.iter().position(|e| id(e) == id(&item)) {
            Some(pos) => {
                existing[pos] = item;
                replaced += 1;
            }
            None => existing.push(item),
        }
    }
    replaced
}

// ==========================================
// 字段映射
// ==========================================

fn required<'a>(record: &'a RawRecord, field: &str) -> ImportResult<&'a str> {
    record.get(field).ok_or_else(|| ImportError::TypeConversionError {
        row: record.row,
        field: field.to_string(),
        message: "必填字段为空".to_string(),
    })
}

fn primary_key(record: &RawRecord) -> ImportResult<String> {
    record
        .get("id")
        .map(str::to_string)
        .ok_or_else(|| ImportError::PrimaryKeyMissing {
            row: record.row,
            field: "id".to_string(),
        })
}

fn parse_field<T>(record: &RawRecord, field: &str) -> ImportResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = required(record, field)?;
    raw.parse::<T>().map_err(|e| ImportError::TypeConversionError {
        row: record.row,
        field: field.to_string(),
        message: format!("{} ({})", e, raw),
    })
}

fn parse_bool(record: &RawRecord, field: &str, default: bool) -> ImportResult<bool> {
    let Some(raw) = record.get(field) else {
        return Ok(default);
    };
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "da" => Ok(true),
        "0" | "false" | "no" | "n" | "nu" => Ok(false),
        other => Err(ImportError::TypeConversionError {
            row: record.row,
            field: field.to_string(),
            message: format!("无法识别的布尔值: {}", other),
        }),
    }
}

fn parse_set<T>(record: &RawRecord, field: &str) -> ImportResult<BTreeSet<T>>
where
    T: FromStr + Ord,
    T::Err: std::fmt::Display,
{
    required(record, field)?
        .split(['|', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<T>().map_err(|e| ImportError::TypeConversionError {
                row: record.row,
                field: field.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

fn map_material(record: &RawRecord) -> ImportResult<Material> {
    Ok(Material {
        id: primary_key(record)?,
        code: required(record, "code")?.to_string(),
        name: required(record, "name")?.to_string(),
        material_type: parse_field(record, "type")?,
        thickness_mm: parse_field(record, "thickness_mm")?,
        price_per_sqm: parse_field(record, "price_per_sqm")?,
        manufacturer: record.get("manufacturer").unwrap_or_default().to_string(),
        paintable: parse_bool(record, "paintable", false)?,
        cantable: parse_bool(record, "cantable", false)?,
        in_stock: parse_bool(record, "in_stock", true)?,
    })
}

fn map_processing(record: &RawRecord) -> ImportResult<ProcessingOption> {
    Ok(ProcessingOption {
        id: primary_key(record)?,
        name: required(record, "name")?.to_string(),
        processing_type: parse_field(record, "type")?,
        price_per_unit: parse_field(record, "price_per_unit")?,
        unit: parse_field(record, "unit")?,
        compatible_materials: parse_set::<MaterialType>(record, "compatible_materials")?,
    })
}

fn map_accessory(record: &RawRecord) -> ImportResult<AccessoryItem> {
    Ok(AccessoryItem {
        id: primary_key(record)?,
        code: required(record, "code")?.to_string(),
        name: required(record, "name")?.to_string(),
        accessory_type: parse_field(record, "type")?,
        manufacturer: record.get("manufacturer").unwrap_or_default().to_string(),
        price: parse_field(record, "price")?,
        stock_qty: parse_field(record, "stock_qty")?,
        compatibility: parse_set::<ModuleType>(record, "compatibility")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{AccessoryType, PriceUnit};

    fn records(csv: &str) -> Vec<RawRecord> {
        CsvParser::parse_reader(csv.as_bytes()).unwrap().records
    }

    #[test]
    fn test_map_material_row() {
        let rows = records(
            "id,code,name,type,thickness_mm,price_per_sqm,manufacturer,paintable,cantable,in_stock\n\
             m1,EG-W980,White PAL,PAL,18,45.5,Egger,0,1,da\n",
        );
        let m = map_material(&rows[0]).unwrap();
        assert_eq!(m.material_type, MaterialType::Pal);
        assert_eq!(m.price_per_sqm, 45.5);
        assert!(m.cantable && !m.paintable && m.in_stock);
    }

    #[test]
    fn test_map_processing_and_accessory_sets() {
        let rows = records(
            "id,name,type,price_per_unit,unit,compatible_materials\n\
             p1,ABS 2mm,edge_banding,3.5,ml,PAL|MDF-AGT\n",
        );
        let p = map_processing(&rows[0]).unwrap();
        assert_eq!(p.unit, PriceUnit::LinearMeter);
        assert_eq!(p.compatible_materials.len(), 2);

        let rows = records(
            "id,code,name,type,manufacturer,price,stock_qty,compatibility\n\
             a1,BL-71,Hinge,hinge,Blum,12.5,40,base_cabinet;wall_cabinet\n",
        );
        let a = map_accessory(&rows[0]).unwrap();
        assert_eq!(a.accessory_type, AccessoryType::Hinge);
        assert!(a.fits(ModuleType::WallCabinet));
    }

    #[test]
    fn test_unknown_enum_reports_row_and_field() {
        let rows = records(
            "id,code,name,type,thickness_mm,price_per_sqm\n\
             m1,X,Stone,MARBLE,20,300\n",
        );
        match map_material(&rows[0]).unwrap_err() {
            ImportError::TypeConversionError { row, field, .. } => {
                assert_eq!(row, 2);
                assert_eq!(field, "type");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_primary_key() {
        let rows = records("id,code,name\n,C1,Board\n");
        assert!(matches!(
            map_material(&rows[0]).unwrap_err(),
            ImportError::PrimaryKeyMissing { row: 2, .. }
        ));
    }

    #[test]
    fn test_merge_replaces_by_id() {
        let mut existing = vec!["a".to_string(), "b".to_string()];
        let replaced = merge(&mut existing, vec!["b".to_string(), "c".to_string()], |s| s);
        assert_eq!(replaced, 1);
        assert_eq!(existing, vec!["a", "b", "c"]);
    }
}
