// ==========================================
// 家具配置报价系统 - 目录存储
// ==========================================
// 职责: 目录快照的只读索引 + 目录不变量校验
// 红线: 无状态变更接口; 目录变更 = 重新构造快照
// ==========================================

use crate::domain::catalog::{AccessoryItem, Catalog, Material, ProcessingOption};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, warn};

/// 目录数据错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("目录ID重复: {entity} id={id}")]
    DuplicateId { entity: &'static str, id: String },

    #[error("板材编码重复: {0}")]
    DuplicateCode(String),

    #[error("目录条目无效 ({entity} id={id}): {message}")]
    InvalidEntry {
        entity: &'static str,
        id: String,
        message: String,
    },
}

fn invalid(entity: &'static str, id: &str, message: impl Into<String>) -> CatalogError {
    let message = message.into();
    warn!(entity = entity, id = %id, message = %message, "目录条目校验失败");
    CatalogError::InvalidEntry {
        entity,
        id: id.to_string(),
        message,
    }
}

fn check_price(entity: &'static str, id: &str, field: &str, value: f64) -> Result<(), CatalogError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(entity, id, format!("{}={} 必须为非负有限数", field, value)));
    }
    Ok(())
}

// ==========================================
// CatalogStore - 目录只读快照
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    materials: HashMap<String, Material>,
    processing_options: HashMap<String, ProcessingOption>,
    accessories: HashMap<String, AccessoryItem>,
}

impl CatalogStore {
    /// 由目录快照构造 (校验全部目录不变量)
    ///
    /// # 校验规则
    /// 1. 各类条目 id 唯一,板材 code 唯一
    /// 2. paintable 仅允许 MDF 系列
    /// 3. cantable 要求板厚为正
    /// 4. 价格为非负有限数
    /// 5. 加工项/配件的兼容集合非空
    pub fn new(catalog: Catalog) -> Result<Self, CatalogError> {
        let mut materials = HashMap::with_capacity(catalog.materials.len());
        let mut codes = HashSet::new();
        for material in catalog.materials {
            Self::validate_material(&material)?;
            if !codes.insert(material.code.clone()) {
                return Err(CatalogError::DuplicateCode(material.code));
            }
            if materials.contains_key(&material.id) {
                return Err(CatalogError::DuplicateId {
                    entity: "material",
                    id: material.id,
                });
            }
            materials.insert(material.id.clone(), material);
        }

        let mut processing_options = HashMap::with_capacity(catalog.processing_options.len());
        for option in catalog.processing_options {
            check_price("processing_option", &option.id, "price_per_unit", option.price_per_unit)?;
            if option.compatible_materials.is_empty() {
                return Err(invalid("processing_option", &option.id, "compatible_materials 为空"));
            }
            if processing_options.contains_key(&option.id) {
                return Err(CatalogError::DuplicateId {
                    entity: "processing_option",
                    id: option.id,
                });
            }
            processing_options.insert(option.id.clone(), option);
        }

        let mut accessories = HashMap::with_capacity(catalog.accessories.len());
        for item in catalog.accessories {
            check_price("accessory", &item.id, "price", item.price)?;
            if item.compatibility.is_empty() {
                return Err(invalid("accessory", &item.id, "compatibility 为空"));
            }
            if accessories.contains_key(&item.id) {
                return Err(CatalogError::DuplicateId {
                    entity: "accessory",
                    id: item.id,
                });
            }
            accessories.insert(item.id.clone(), item);
        }

        debug!(
            materials = materials.len(),
            processing_options = processing_options.len(),
            accessories = accessories.len(),
            "目录快照已加载"
        );

        Ok(Self {
            materials,
            processing_options,
            accessories,
        })
    }

    fn validate_material(material: &Material) -> Result<(), CatalogError> {
        check_price("material", &material.id, "price_per_sqm", material.price_per_sqm)?;
        if material.code.trim().is_empty() {
            return Err(invalid("material", &material.id, "code 为空"));
        }
        if material.paintable && !material.material_type.is_mdf_family() {
            return Err(invalid(
                "material",
                &material.id,
                format!("{} 类型板材不可喷漆", material.material_type),
            ));
        }
        if material.cantable && !(material.thickness_mm.is_finite() && material.thickness_mm > 0.0) {
            return Err(invalid("material", &material.id, "可封边板材必须有正的板厚"));
        }
        Ok(())
    }

    pub fn material(&self, id: &str) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn processing_option(&self, id: &str) -> Option<&ProcessingOption> {
        self.processing_options.get(id)
    }

    pub fn accessory(&self, id: &str) -> Option<&AccessoryItem> {
        self.accessories.get(id)
    }

    /// 按编码查找板材
    pub fn material_by_code(&self, code: &str) -> Option<&Material> {
        self.materials.values().find(|m| m.code == code)
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn processing_option_count(&self) -> usize {
        self.processing_options.len()
    }

    pub fn accessory_count(&self) -> usize {
        self.accessories.len()
    }
}
