// ==========================================
// 家具配置报价系统 - 模块组装器
// ==========================================
// 职责: 校验模块选择与目录的类型兼容性,输出规范化模块状态
// 输入: 模块草稿 (FurnitureModule) + 目录快照
// 输出: NormalizedModuleState (所有引用已解析为完整对象)
// 红线: 纯函数,无副作用; 下游不得再次按 id 解析
// ==========================================

use crate::domain::catalog::{AccessoryItem, Material, ProcessingOption};
use crate::domain::project::FurnitureModule;
use crate::domain::rule::{ActionTarget, ConflictKind, RuleConflict};
use crate::domain::types::{
    AccessoryType, ConflictSeverity, MaterialType, ModuleType, PanelTarget, ProcessingType,
};
use crate::engine::catalog_store::CatalogStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, warn};

// ==========================================
// CompositionError - 组装错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositionError {
    #[error("板材不存在 (module_id={module_id}): material_id={material_id}")]
    UnknownMaterial {
        module_id: String,
        material_id: String,
    },

    #[error("加工项不兼容 (module_id={module_id}): {processing_type} 不适用于 {material_type} {panel} ({reason})")]
    IncompatibleProcessing {
        module_id: String,
        processing_id: String,
        processing_type: ProcessingType,
        material_type: MaterialType,
        panel: PanelTarget,
        reason: String,
    },

    #[error("配件不兼容 (module_id={module_id}): {accessory_type} ({accessory_id}) 不可安装于 {module_type}")]
    IncompatibleAccessory {
        module_id: String,
        accessory_id: String,
        accessory_type: AccessoryType,
        module_type: ModuleType,
    },

    #[error("加工项不存在 (module_id={module_id}): processing_id={processing_id}")]
    UnknownProcessing {
        module_id: String,
        processing_id: String,
    },

    #[error("配件不存在 (module_id={module_id}): accessory_id={accessory_id}")]
    UnknownAccessory {
        module_id: String,
        accessory_id: String,
    },

    #[error("门板加工缺少门板板材 (module_id={module_id}): processing_id={processing_id}")]
    MissingFrontMaterial {
        module_id: String,
        processing_id: String,
    },

    #[error("柜型 {module_type} 无门板,不可指定门板板材 (module_id={module_id})")]
    FrontNotSupported {
        module_id: String,
        module_type: ModuleType,
    },

    #[error("模块尺寸无效 (module_id={module_id}): {message}")]
    InvalidDimensions { module_id: String, message: String },

    #[error("数量无效 (module_id={module_id}, item_id={item_id}): 数量必须大于 0")]
    InvalidQuantity { module_id: String, item_id: String },
}

impl CompositionError {
    pub fn module_id(&self) -> &str {
        match self {
            CompositionError::UnknownMaterial { module_id, .. }
            | CompositionError::IncompatibleProcessing { module_id, .. }
            | CompositionError::IncompatibleAccessory { module_id, .. }
            | CompositionError::UnknownProcessing { module_id, .. }
            | CompositionError::UnknownAccessory { module_id, .. }
            | CompositionError::MissingFrontMaterial { module_id, .. }
            | CompositionError::FrontNotSupported { module_id, .. }
            | CompositionError::InvalidDimensions { module_id, .. }
            | CompositionError::InvalidQuantity { module_id, .. } => module_id,
        }
    }
}

// ==========================================
// 规范化模块状态
// ==========================================

/// 已解析的加工选择
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedProcessing {
    pub option: ProcessingOption,
    pub target: PanelTarget,
    /// 按件计价数量 (缺省 1)
    pub quantity: u32,
    /// 在草稿中的选择顺序
    pub selection_index: usize,
}

/// 已解析的配件选择
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAccessory {
    pub item: AccessoryItem,
    pub quantity: u32,
    pub selection_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedModuleState {
    pub module_id: String,
    pub name: String,
    pub space_id: String,
    pub sequence: u64,
    pub module_type: ModuleType,
    pub width_mm: f64,
    pub height_mm: f64,
    pub depth_mm: f64,
    pub body_material: Material,
    pub front_material: Option<Material>,
    pub processing: Vec<ResolvedProcessing>,
    pub accessories: Vec<ResolvedAccessory>,
    /// 规则要求但尚未选定具体条目的配件类型
    pub required_accessory_types: BTreeSet<AccessoryType>,
    /// 规则要求但尚未选定具体条目的加工类型
    pub required_processing_types: BTreeSet<ProcessingType>,
    /// 组装 (库存) 与规则评估产生的冲突
    pub conflicts: Vec<RuleConflict>,
}

impl NormalizedModuleState {
    /// 柜体板与门板的板材类型
    pub fn material_types(&self) -> BTreeSet<MaterialType> {
        let mut types = BTreeSet::from([self.body_material.material_type]);
        if let Some(front) = &self.front_material {
            types.insert(front.material_type);
        }
        types
    }

    pub fn has_material_type(&self, material_type: MaterialType) -> bool {
        self.body_material.material_type == material_type
            || self
                .front_material
                .as_ref()
                .is_some_and(|m| m.material_type == material_type)
    }

    /// 已选具体配件或已被规则要求
    pub fn has_accessory_type(&self, accessory_type: AccessoryType) -> bool {
        self.required_accessory_types.contains(&accessory_type)
            || self
                .accessories
                .iter()
                .any(|a| a.item.accessory_type == accessory_type)
    }

    /// 已选具体加工或已被规则要求
    pub fn has_processing_type(&self, processing_type: ProcessingType) -> bool {
        self.required_processing_types.contains(&processing_type)
            || self
                .processing
                .iter()
                .any(|p| p.option.processing_type == processing_type)
    }

    /// 待调用方补选具体条目的要求
    pub fn pending_requirements(&self) -> Vec<ActionTarget> {
        let accessories = self
            .required_accessory_types
            .iter()
            .filter(|t| !self.accessories.iter().any(|a| a.item.accessory_type == **t))
            .map(|t| ActionTarget::Accessory(*t));
        let processing = self
            .required_processing_types
            .iter()
            .filter(|t| !self.processing.iter().any(|p| p.option.processing_type == **t))
            .map(|t| ActionTarget::Processing(*t));
        accessories.chain(processing).collect()
    }

    pub fn is_blocked(&self) -> bool {
        self.conflicts.iter().any(RuleConflict::is_blocking)
    }

    pub fn blocking_conflicts(&self) -> Vec<RuleConflict> {
        self.conflicts
            .iter()
            .filter(|c| c.is_blocking())
            .cloned()
            .collect()
    }

    /// 模块是否完整 (无待补选要求、无阻断冲突)
    pub fn is_complete(&self) -> bool {
        !self.is_blocked() && self.pending_requirements().is_empty()
    }
}

// ==========================================
// 组装选项
// ==========================================

/// 缺货处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    /// 记录 warning 冲突,不影响计价
    #[default]
    Warn,
    /// 记录 blocking 冲突,模块不参与计价
    Block,
}

impl StockPolicy {
    fn severity(&self) -> ConflictSeverity {
        match self {
            StockPolicy::Warn => ConflictSeverity::Warning,
            StockPolicy::Block => ConflictSeverity::Blocking,
        }
    }
}

// ==========================================
// ModuleComposer - 模块组装器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ModuleComposer {
    stock_policy: StockPolicy,
}

impl ModuleComposer {
    pub fn new(stock_policy: StockPolicy) -> Self {
        Self { stock_policy }
    }

    /// 组装模块
    ///
    /// # 校验顺序
    /// 1. 尺寸为正
    /// 2. 柜体板存在 (UnknownMaterial)
    /// 3. 门板存在且柜型支持门板
    /// 4. 每个加工项: 存在、数量有效、作用面板材在 compatible_materials 内、喷漆/封边能力
    /// 5. 每个配件: 存在、数量有效、柜型在 compatibility 内
    /// 6. 库存检查 (按策略记录冲突)
    pub fn compose(
        &self,
        draft: &FurnitureModule,
        catalog: &CatalogStore,
    ) -> Result<NormalizedModuleState, CompositionError> {
        let module_id = draft.id.as_str();
        debug!(module_id = %module_id, module_type = %draft.module_type, "开始组装模块");

        for (label, v) in [
            ("width_mm", draft.width_mm),
            ("height_mm", draft.height_mm),
            ("depth_mm", draft.depth_mm),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(CompositionError::InvalidDimensions {
                    module_id: module_id.to_string(),
                    message: format!("{}={} 必须为正数", label, v),
                });
            }
        }

        let body_material = catalog
            .material(&draft.body_material_id)
            .cloned()
            .ok_or_else(|| CompositionError::UnknownMaterial {
                module_id: module_id.to_string(),
                material_id: draft.body_material_id.clone(),
            })?;

        let front_material = match &draft.front_material_id {
            Some(front_id) => {
                if !draft.module_type.has_front() {
                    return Err(CompositionError::FrontNotSupported {
                        module_id: module_id.to_string(),
                        module_type: draft.module_type,
                    });
                }
                Some(catalog.material(front_id).cloned().ok_or_else(|| {
                    CompositionError::UnknownMaterial {
                        module_id: module_id.to_string(),
                        material_id: front_id.clone(),
                    }
                })?)
            }
            None => None,
        };

        let mut processing = Vec::with_capacity(draft.processing.len());
        for (selection_index, selection) in draft.processing.iter().enumerate() {
            let option = catalog
                .processing_option(&selection.processing_id)
                .ok_or_else(|| CompositionError::UnknownProcessing {
                    module_id: module_id.to_string(),
                    processing_id: selection.processing_id.clone(),
                })?;

            let quantity = selection.quantity.unwrap_or(1);
            if quantity == 0 {
                return Err(CompositionError::InvalidQuantity {
                    module_id: module_id.to_string(),
                    item_id: option.id.clone(),
                });
            }

            let panel_material = match selection.target {
                PanelTarget::Body => &body_material,
                PanelTarget::Front => {
                    front_material
                        .as_ref()
                        .ok_or_else(|| CompositionError::MissingFrontMaterial {
                            module_id: module_id.to_string(),
                            processing_id: option.id.clone(),
                        })?
                }
            };
            Self::check_processing(module_id, option, panel_material, selection.target)?;

            processing.push(ResolvedProcessing {
                option: option.clone(),
                target: selection.target,
                quantity,
                selection_index,
            });
        }

        let mut accessories = Vec::with_capacity(draft.accessories.len());
        for (selection_index, selection) in draft.accessories.iter().enumerate() {
            let item = catalog
                .accessory(&selection.accessory_id)
                .ok_or_else(|| CompositionError::UnknownAccessory {
                    module_id: module_id.to_string(),
                    accessory_id: selection.accessory_id.clone(),
                })?;
            if selection.quantity == 0 {
                return Err(CompositionError::InvalidQuantity {
                    module_id: module_id.to_string(),
                    item_id: item.id.clone(),
                });
            }
            if !item.fits(draft.module_type) {
                return Err(CompositionError::IncompatibleAccessory {
                    module_id: module_id.to_string(),
                    accessory_id: item.id.clone(),
                    accessory_type: item.accessory_type,
                    module_type: draft.module_type,
                });
            }
            accessories.push(ResolvedAccessory {
                item: item.clone(),
                quantity: selection.quantity,
                selection_index,
            });
        }

        let conflicts = self.stock_conflicts(&body_material, front_material.as_ref(), &accessories);
        if !conflicts.is_empty() {
            warn!(
                module_id = %module_id,
                count = conflicts.len(),
                policy = ?self.stock_policy,
                "模块存在库存问题"
            );
        }

        Ok(NormalizedModuleState {
            module_id: draft.id.clone(),
            name: draft.name.clone(),
            space_id: draft.space_id.clone(),
            sequence: draft.sequence,
            module_type: draft.module_type,
            width_mm: draft.width_mm,
            height_mm: draft.height_mm,
            depth_mm: draft.depth_mm,
            body_material,
            front_material,
            processing,
            accessories,
            required_accessory_types: BTreeSet::new(),
            required_processing_types: BTreeSet::new(),
            conflicts,
        })
    }

    /// 加工项与作用面板材的兼容性
    fn check_processing(
        module_id: &str,
        option: &ProcessingOption,
        material: &Material,
        panel: PanelTarget,
    ) -> Result<(), CompositionError> {
        let reject = |reason: &str| CompositionError::IncompatibleProcessing {
            module_id: module_id.to_string(),
            processing_id: option.id.clone(),
            processing_type: option.processing_type,
            material_type: material.material_type,
            panel,
            reason: reason.to_string(),
        };

        if !option.is_compatible_with(material.material_type) {
            return Err(reject("板材类型不在兼容集合内"));
        }
        match option.processing_type {
            ProcessingType::Painting if !material.paintable => Err(reject("板材不可喷漆")),
            ProcessingType::EdgeBanding if !material.cantable => Err(reject("板材不可封边")),
            _ => Ok(()),
        }
    }

    fn stock_conflicts(
        &self,
        body: &Material,
        front: Option<&Material>,
        accessories: &[ResolvedAccessory],
    ) -> Vec<RuleConflict> {
        let severity = self.stock_policy.severity();
        let stock = |message: String| RuleConflict {
            kind: ConflictKind::Stock,
            rule_id: None,
            rule_name: None,
            severity,
            message,
        };

        let mut conflicts = Vec::new();
        let mut seen = BTreeSet::new();
        for material in std::iter::once(body).chain(front) {
            if !material.in_stock && seen.insert(material.id.clone()) {
                conflicts.push(stock(format!("板材缺货: {} ({})", material.name, material.code)));
            }
        }
        for acc in accessories {
            if acc.quantity > acc.item.stock_qty {
                conflicts.push(stock(format!(
                    "配件库存不足: {} ({}) 需要 {} 库存 {}",
                    acc.item.name, acc.item.code, acc.quantity, acc.item.stock_qty
                )));
            }
        }
        conflicts
    }
}

/// 使用默认选项组装模块
pub fn compose(
    draft: &FurnitureModule,
    catalog: &CatalogStore,
) -> Result<NormalizedModuleState, CompositionError> {
    ModuleComposer::default().compose(draft, catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Catalog;
    use crate::domain::project::ProcessingSelection;
    use crate::domain::types::PriceUnit;
    use std::collections::BTreeSet;

    fn material(id: &str, t: MaterialType, paintable: bool) -> Material {
        Material {
            id: id.to_string(),
            code: id.to_string(),
            name: format!("{} board", t),
            material_type: t,
            thickness_mm: 18.0,
            price_per_sqm: 40.0,
            manufacturer: "Kronospan".to_string(),
            paintable,
            cantable: t != MaterialType::Glass,
            in_stock: true,
        }
    }

    fn catalog() -> CatalogStore {
        CatalogStore::new(Catalog {
            materials: vec![
                material("PAL", MaterialType::Pal, false),
                material("MDF", MaterialType::Mdf, true),
                material("GLASS", MaterialType::Glass, false),
            ],
            processing_options: vec![
                ProcessingOption {
                    id: "EDGE".to_string(),
                    name: "ABS 2mm".to_string(),
                    processing_type: ProcessingType::EdgeBanding,
                    price_per_unit: 4.0,
                    unit: PriceUnit::LinearMeter,
                    compatible_materials: BTreeSet::from([MaterialType::Pal, MaterialType::MdfAgt]),
                },
                ProcessingOption {
                    id: "PAINT".to_string(),
                    name: "Matt lacquer".to_string(),
                    processing_type: ProcessingType::Painting,
                    price_per_unit: 120.0,
                    unit: PriceUnit::SquareMeter,
                    compatible_materials: BTreeSet::from([MaterialType::Mdf, MaterialType::MdfAgt]),
                },
            ],
            accessories: vec![AccessoryItem {
                id: "HINGE".to_string(),
                code: "BLUM-71B".to_string(),
                name: "Clip top hinge".to_string(),
                accessory_type: AccessoryType::Hinge,
                manufacturer: "Blum".to_string(),
                price: 12.5,
                stock_qty: 4,
                compatibility: BTreeSet::from([ModuleType::BaseCabinet, ModuleType::WallCabinet]),
            }],
        })
        .unwrap()
    }

    fn base(body: &str) -> FurnitureModule {
        FurnitureModule::new(ModuleType::BaseCabinet, 600.0, 720.0, 560.0, body).with_id("mod-1")
    }

    #[test]
    fn test_compose_resolves_entities() {
        let draft = base("PAL")
            .with_front("MDF")
            .with_processing(ProcessingSelection::body("EDGE"))
            .with_processing(ProcessingSelection::front("PAINT"))
            .with_accessory("HINGE", 2);
        let state = compose(&draft, &catalog()).unwrap();
        assert_eq!(state.body_material.material_type, MaterialType::Pal);
        assert_eq!(state.front_material.as_ref().unwrap().id, "MDF");
        assert_eq!(state.processing.len(), 2);
        assert_eq!(state.accessories[0].item.price, 12.5);
        assert!(state.conflicts.is_empty());
        assert!(state.is_complete());
    }

    #[test]
    fn test_unknown_body_material() {
        let err = compose(&base("NOPE"), &catalog()).unwrap_err();
        assert_eq!(
            err,
            CompositionError::UnknownMaterial {
                module_id: "mod-1".to_string(),
                material_id: "NOPE".to_string()
            }
        );
    }

    #[test]
    fn test_incompatible_processing_names_pair() {
        let draft = base("GLASS").with_processing(ProcessingSelection::body("EDGE"));
        let err = compose(&draft, &catalog()).unwrap_err();
        match &err {
            CompositionError::IncompatibleProcessing {
                processing_type,
                material_type,
                ..
            } => {
                assert_eq!(*processing_type, ProcessingType::EdgeBanding);
                assert_eq!(*material_type, MaterialType::Glass);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        let msg = err.to_string();
        assert!(msg.contains("edge_banding"));
        assert!(msg.contains("GLASS"));
    }

    #[test]
    fn test_front_processing_checks_front_material() {
        // 柜体 PAL 不可喷漆,但门板 MDF 可以
        let ok = base("PAL").with_front("MDF").with_processing(ProcessingSelection::front("PAINT"));
        assert!(compose(&ok, &catalog()).is_ok());

        let bad = base("PAL").with_front("MDF").with_processing(ProcessingSelection::body("PAINT"));
        assert!(matches!(
            compose(&bad, &catalog()),
            Err(CompositionError::IncompatibleProcessing { panel: PanelTarget::Body, .. })
        ));
    }

    #[test]
    fn test_front_processing_without_front() {
        let draft = base("MDF").with_processing(ProcessingSelection::front("PAINT"));
        assert!(matches!(
            compose(&draft, &catalog()),
            Err(CompositionError::MissingFrontMaterial { .. })
        ));
    }

    #[test]
    fn test_incompatible_accessory() {
        let draft = FurnitureModule::new(ModuleType::DrawerUnit, 600.0, 720.0, 560.0, "PAL")
            .with_id("mod-2")
            .with_accessory("HINGE", 2);
        let err = compose(&draft, &catalog()).unwrap_err();
        assert!(matches!(
            err,
            CompositionError::IncompatibleAccessory {
                module_type: ModuleType::DrawerUnit,
                ..
            }
        ));
        assert_eq!(err.module_id(), "mod-2");
    }

    #[test]
    fn test_open_shelf_rejects_front() {
        let draft = FurnitureModule::new(ModuleType::OpenShelf, 600.0, 720.0, 300.0, "PAL")
            .with_front("MDF");
        assert!(matches!(
            compose(&draft, &catalog()),
            Err(CompositionError::FrontNotSupported { .. })
        ));
    }

    #[test]
    fn test_zero_quantity_and_dimensions() {
        let draft = base("PAL").with_accessory("HINGE", 0);
        assert!(matches!(
            compose(&draft, &catalog()),
            Err(CompositionError::InvalidQuantity { .. })
        ));

        let mut draft = base("PAL");
        draft.height_mm = 0.0;
        assert!(matches!(
            compose(&draft, &catalog()),
            Err(CompositionError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_stock_policy() {
        let draft = base("PAL").with_accessory("HINGE", 6);
        let warn_state = ModuleComposer::new(StockPolicy::Warn)
            .compose(&draft, &catalog())
            .unwrap();
        assert_eq!(warn_state.conflicts.len(), 1);
        assert_eq!(warn_state.conflicts[0].kind, ConflictKind::Stock);
        assert!(!warn_state.is_blocked());

        let block_state = ModuleComposer::new(StockPolicy::Block)
            .compose(&draft, &catalog())
            .unwrap();
        assert!(block_state.is_blocked());
    }
}
