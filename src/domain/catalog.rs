// ==========================================
// 家具配置报价系统 - 目录领域模型
// ==========================================
// 职责: 板材 / 加工项 / 五金配件 参考数据
// 红线: 会话内只读,修改目录后调用方必须重新组装模块
// ==========================================

use crate::domain::types::{AccessoryType, MaterialType, ModuleType, PriceUnit, ProcessingType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ==========================================
// Material - 板材
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: String,
    pub code: String, // 唯一,人工可读编码
    pub name: String,
    pub material_type: MaterialType,
    pub thickness_mm: f64,
    pub price_per_sqm: f64,
    pub manufacturer: String,
    pub paintable: bool, // 仅 MDF 系列允许
    pub cantable: bool,  // 可封边 (需有可测量的边长)
    pub in_stock: bool,
}

// ==========================================
// ProcessingOption - 加工项
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOption {
    pub id: String,
    pub name: String,
    pub processing_type: ProcessingType,
    pub price_per_unit: f64,
    pub unit: PriceUnit,
    pub compatible_materials: BTreeSet<MaterialType>,
}

impl ProcessingOption {
    /// 是否适用于该板材类型
    pub fn is_compatible_with(&self, material_type: MaterialType) -> bool {
        self.compatible_materials.contains(&material_type)
    }
}

// ==========================================
// AccessoryItem - 五金配件
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessoryItem {
    pub id: String,
    pub code: String,
    pub name: String,
    pub accessory_type: AccessoryType,
    pub manufacturer: String,
    pub price: f64,
    pub stock_qty: u32,
    pub compatibility: BTreeSet<ModuleType>,
}

impl AccessoryItem {
    /// 是否可安装到该柜型
    pub fn fits(&self, module_type: ModuleType) -> bool {
        self.compatibility.contains(&module_type)
    }
}

// ==========================================
// Catalog - 目录快照
// ==========================================
// 对应外部目录持久化的 getAllMaterials / getAllAccessories / 加工项 读取结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub materials: Vec<Material>,
    pub processing_options: Vec<ProcessingOption>,
    pub accessories: Vec<AccessoryItem>,
}
