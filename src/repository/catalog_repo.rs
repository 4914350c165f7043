// ==========================================
// 家具配置报价系统 - 目录数据仓储
// ==========================================
// 职责: material / processing_option / accessory_item 表的 CRUD
// 红线: Repository 不含业务逻辑 (目录不变量由 CatalogStore 校验)
// 红线: 写操作返回被修改实体的 id,调用方据此重新组装模块
// ==========================================

use crate::domain::catalog::{AccessoryItem, Catalog, Material, ProcessingOption};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{parse_json_column, parse_text_column};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

// ==========================================
// CatalogRepository - 目录仓储
// ==========================================
pub struct CatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

const MATERIAL_COLUMNS: &str = "material_id, code, name, material_type, thickness_mm, \
     price_per_sqm, manufacturer, paintable, cantable, in_stock";

const PROCESSING_COLUMNS: &str =
    "processing_id, name, processing_type, price_per_unit, unit, compatible_materials_json";

const ACCESSORY_COLUMNS: &str = "accessory_id, code, name, accessory_type, manufacturer, \
     price, stock_qty, compatibility_json";

impl CatalogRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 快照
    // ==========================================

    /// 一次性读取完整目录快照 (一个组装/评估/计价周期内只读)
    pub fn load_catalog(&self) -> RepositoryResult<Catalog> {
        let catalog = Catalog {
            materials: self.get_all_materials()?,
            processing_options: self.get_all_processing_options()?,
            accessories: self.get_all_accessories()?,
        };
        debug!(
            materials = catalog.materials.len(),
            processing_options = catalog.processing_options.len(),
            accessories = catalog.accessories.len(),
            "目录快照已加载"
        );
        Ok(catalog)
    }

    // ==========================================
    // 板材
    // ==========================================

    pub fn get_all_materials(&self) -> RepositoryResult<Vec<Material>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM material ORDER BY material_id",
            MATERIAL_COLUMNS
        ))?;
        let rows = stmt.query_map([], map_material)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn find_material(&self, material_id: &str) -> RepositoryResult<Option<Material>> {
        let conn = self.get_conn()?;
        let material = conn
            .query_row(
                &format!("SELECT {} FROM material WHERE material_id = ?1", MATERIAL_COLUMNS),
                params![material_id],
                map_material,
            )
            .optional()?;
        Ok(material)
    }

    pub fn upsert_material(&self, material: &Material) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        write_material(&conn, material)?;
        info!(material_id = %material.id, "板材已保存");
        Ok(material.id.clone())
    }

    pub fn delete_material(&self, material_id: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM material WHERE material_id = ?1",
            params![material_id],
        )?;
        ensure_found(affected, "material", material_id)?;
        info!(material_id = %material_id, "板材已删除");
        Ok(material_id.to_string())
    }

    // ==========================================
    // 加工项
    // ==========================================

    pub fn get_all_processing_options(&self) -> RepositoryResult<Vec<ProcessingOption>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM processing_option ORDER BY processing_id",
            PROCESSING_COLUMNS
        ))?;
        let rows = stmt.query_map([], map_processing)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn upsert_processing_option(&self, option: &ProcessingOption) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        write_processing_option(&conn, option)?;
        info!(processing_id = %option.id, "加工项已保存");
        Ok(option.id.clone())
    }

    pub fn delete_processing_option(&self, processing_id: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM processing_option WHERE processing_id = ?1",
            params![processing_id],
        )?;
        ensure_found(affected, "processing_option", processing_id)?;
        Ok(processing_id.to_string())
    }

    // ==========================================
    // 配件
    // ==========================================

    pub fn get_all_accessories(&self) -> RepositoryResult<Vec<AccessoryItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accessory_item ORDER BY accessory_id",
            ACCESSORY_COLUMNS
        ))?;
        let rows = stmt.query_map([], map_accessory)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn upsert_accessory(&self, item: &AccessoryItem) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        write_accessory(&conn, item)?;
        info!(accessory_id = %item.id, "配件已保存");
        Ok(item.id.clone())
    }

    pub fn delete_accessory(&self, accessory_id: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM accessory_item WHERE accessory_id = ?1",
            params![accessory_id],
        )?;
        ensure_found(affected, "accessory_item", accessory_id)?;
        Ok(accessory_id.to_string())
    }

    /// 整体替换目录 (单事务)
    pub fn replace_catalog(&self, catalog: &Catalog) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM material", [])?;
        tx.execute("DELETE FROM processing_option", [])?;
        tx.execute("DELETE FROM accessory_item", [])?;
        for m in &catalog.materials {
            write_material(&tx, m)?;
        }
        for p in &catalog.processing_options {
            write_processing_option(&tx, p)?;
        }
        for a in &catalog.accessories {
            write_accessory(&tx, a)?;
        }
        tx.commit()?;

        let count =
            catalog.materials.len() + catalog.processing_options.len() + catalog.accessories.len();
        info!(count = count, "目录已整体替换");
        Ok(count)
    }
}

fn write_material(conn: &Connection, material: &Material) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO material (
            material_id, code, name, material_type, thickness_mm, price_per_sqm,
            manufacturer, paintable, cantable, in_stock, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(material_id) DO UPDATE SET
            code = excluded.code,
            name = excluded.name,
            material_type = excluded.material_type,
            thickness_mm = excluded.thickness_mm,
            price_per_sqm = excluded.price_per_sqm,
            manufacturer = excluded.manufacturer,
            paintable = excluded.paintable,
            cantable = excluded.cantable,
            in_stock = excluded.in_stock,
            updated_at = excluded.updated_at
        "#,
        params![
            material.id,
            material.code,
            material.name,
            material.material_type.as_str(),
            material.thickness_mm,
            material.price_per_sqm,
            material.manufacturer,
            material.paintable,
            material.cantable,
            material.in_stock,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn write_processing_option(conn: &Connection, option: &ProcessingOption) -> RepositoryResult<()> {
    let compatible = serde_json::to_string(&option.compatible_materials)?;
    conn.execute(
        r#"
        INSERT INTO processing_option (
            processing_id, name, processing_type, price_per_unit, unit,
            compatible_materials_json, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(processing_id) DO UPDATE SET
            name = excluded.name,
            processing_type = excluded.processing_type,
            price_per_unit = excluded.price_per_unit,
            unit = excluded.unit,
            compatible_materials_json = excluded.compatible_materials_json,
            updated_at = excluded.updated_at
        "#,
        params![
            option.id,
            option.name,
            option.processing_type.as_str(),
            option.price_per_unit,
            option.unit.as_str(),
            compatible,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn write_accessory(conn: &Connection, item: &AccessoryItem) -> RepositoryResult<()> {
    let compatibility = serde_json::to_string(&item.compatibility)?;
    conn.execute(
        r#"
        INSERT INTO accessory_item (
            accessory_id, code, name, accessory_type, manufacturer, price,
            stock_qty, compatibility_json, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(accessory_id) DO UPDATE SET
            code = excluded.code,
            name = excluded.name,
            accessory_type = excluded.accessory_type,
            manufacturer = excluded.manufacturer,
            price = excluded.price,
            stock_qty = excluded.stock_qty,
            compatibility_json = excluded.compatibility_json,
            updated_at = excluded.updated_at
        "#,
        params![
            item.id,
            item.code,
            item.name,
            item.accessory_type.as_str(),
            item.manufacturer,
            item.price,
            item.stock_qty,
            compatibility,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn ensure_found(affected: usize, entity: &str, id: &str) -> RepositoryResult<()> {
    if affected == 0 {
        return Err(RepositoryError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn map_material(row: &Row<'_>) -> rusqlite::Result<Material> {
    Ok(Material {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        material_type: parse_text_column(row, 3)?,
        thickness_mm: row.get(4)?,
        price_per_sqm: row.get(5)?,
        manufacturer: row.get(6)?,
        paintable: row.get(7)?,
        cantable: row.get(8)?,
        in_stock: row.get(9)?,
    })
}

fn map_processing(row: &Row<'_>) -> rusqlite::Result<ProcessingOption> {
    Ok(ProcessingOption {
        id: row.get(0)?,
        name: row.get(1)?,
        processing_type: parse_text_column(row, 2)?,
        price_per_unit: row.get(3)?,
        unit: parse_text_column(row, 4)?,
        compatible_materials: parse_json_column(row, 5)?,
    })
}

fn map_accessory(row: &Row<'_>) -> rusqlite::Result<AccessoryItem> {
    Ok(AccessoryItem {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        accessory_type: parse_text_column(row, 3)?,
        manufacturer: row.get(4)?,
        price: row.get(5)?,
        stock_qty: row.get(6)?,
        compatibility: parse_json_column(row, 7)?,
    })
}
