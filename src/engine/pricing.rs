// ==========================================
// 家具配置报价系统 - 计价汇总器
// ==========================================
// 职责: 将规则评估后的模块状态汇总为物料清单 (BOM) 与总价
// 输入: NormalizedModuleState 列表 (已组装、已评估)
// 输出: BillOfMaterials
// 红线: 阻断冲突模块计 0 并列入 excluded_modules,不得静默丢弃
// 红线: 行金额 half-up 保留 2 位; 小计 = 已舍入行金额之和 (按分累加)
// 红线: 输入不合法说明上游不变量被破坏,直接报错,绝不按 0 处理
// ==========================================

use crate::domain::quote::{
    BillOfMaterials, BomLine, CategorySubtotals, ExcludedModule, IncompleteModule,
};
use crate::domain::types::{BomCategory, PanelTarget, PriceUnit};
use crate::engine::composer::NormalizedModuleState;
use crate::engine::geometry::PanelGeometry;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

// ==========================================
// PricingError - 计价错误 (上游不变量被破坏)
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("模块ID重复: {0}")]
    DuplicateModuleId(String),

    #[error("模块尺寸无效 (module_id={module_id}): {message}")]
    InvalidDimensions { module_id: String, message: String },

    #[error("单价无效 (module_id={module_id}, item_id={item_id}): {price}")]
    InvalidPrice {
        module_id: String,
        item_id: String,
        price: f64,
    },

    #[error("门板引用未解析 (module_id={module_id}, item_id={item_id})")]
    UnresolvedFront { module_id: String, item_id: String },

    #[error("金额溢出 (module_id={module_id}, item_id={item_id})")]
    AmountOverflow { module_id: String, item_id: String },

    #[error("合计溢出 (category={category}, module_id={module_id})")]
    TotalOverflow {
        category: String,
        module_id: String,
    },
}

// ==========================================
// 金额舍入
// ==========================================

/// 金额 → 分,half-up (远离零) 舍入
///
/// 先在 1e-6 分精度上归整,消除 1.005 × 100 = 100.49999… 这类二进制误差
pub fn to_cents(amount: f64) -> Option<i64> {
    if !amount.is_finite() {
        return None;
    }
    let scaled = (amount * 100.0 * 1e6).round() / 1e6;
    let cents = if scaled >= 0.0 {
        (scaled + 0.5).floor()
    } else {
        (scaled - 0.5).ceil()
    };
    if cents.abs() > i64::MAX as f64 / 2.0 {
        return None;
    }
    Some(cents as i64)
}

fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// 保留 2 位小数,half-up
pub fn round_money(amount: f64) -> Option<f64> {
    to_cents(amount).map(from_cents)
}

// ==========================================
// PricingAggregator - 计价汇总器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingAggregator;

/// 单个清单行的中间结果 (金额以分计)
struct PricedLine {
    line: BomLine,
    cents: i64,
}

impl PricingAggregator {
    pub fn new() -> Self {
        Self
    }

    /// 汇总物料清单
    pub fn aggregate(
        &self,
        modules: &[NormalizedModuleState],
    ) -> Result<BillOfMaterials, PricingError> {
        self.aggregate_at(modules, Utc::now())
    }

    /// 汇总物料清单 (指定生成时间)
    ///
    /// # 排序
    /// 分类 material → processing → accessory; 分类内按模块创建序号,再按选择顺序
    pub fn aggregate_at(
        &self,
        modules: &[NormalizedModuleState],
        generated_at: DateTime<Utc>,
    ) -> Result<BillOfMaterials, PricingError> {
        let mut seen = HashSet::new();
        for m in modules {
            if !seen.insert(m.module_id.as_str()) {
                return Err(PricingError::DuplicateModuleId(m.module_id.clone()));
            }
        }

        let mut ordered: Vec<&NormalizedModuleState> = modules.iter().collect();
        ordered.sort_by(|a, b| {
            a.sequence
                .cmp(&b.sequence)
                .then_with(|| a.module_id.cmp(&b.module_id))
        });

        let mut material_lines = Vec::new();
        let mut processing_lines = Vec::new();
        let mut accessory_lines = Vec::new();
        let mut excluded_modules = Vec::new();
        let mut incomplete_modules = Vec::new();

        for module in ordered {
            if module.is_blocked() {
                let reasons = module.blocking_conflicts();
                warn!(
                    module_id = %module.module_id,
                    reasons = reasons.len(),
                    "模块存在阻断冲突,排除计价"
                );
                excluded_modules.push(ExcludedModule {
                    module_id: module.module_id.clone(),
                    module_name: module.name.clone(),
                    reasons,
                });
                continue;
            }

            check_dimensions(module)?;
            let geometry = PanelGeometry::of(module);

            material_lines.extend(Self::material_lines(module, &geometry)?);
            processing_lines.extend(Self::processing_lines(module, &geometry)?);
            accessory_lines.extend(Self::accessory_lines(module)?);

            let pending = module.pending_requirements();
            if !pending.is_empty() {
                debug!(
                    module_id = %module.module_id,
                    pending = pending.len(),
                    "模块仍有待补选项"
                );
                incomplete_modules.push(IncompleteModule {
                    module_id: module.module_id.clone(),
                    pending_requirements: pending,
                });
            }
        }

        let material_cents = checked_sum(BomCategory::Material, &material_lines)?;
        let processing_cents = checked_sum(BomCategory::Processing, &processing_lines)?;
        let accessory_cents = checked_sum(BomCategory::Accessory, &accessory_lines)?;
        let total_cents = material_cents
            .checked_add(processing_cents)
            .and_then(|c| c.checked_add(accessory_cents))
            .ok_or_else(|| PricingError::TotalOverflow {
                category: "total".to_string(),
                module_id: String::new(),
            })?;

        let lines: Vec<BomLine> = material_lines
            .into_iter()
            .chain(processing_lines)
            .chain(accessory_lines)
            .map(|p| p.line)
            .collect();

        let bom = BillOfMaterials {
            lines,
            subtotals: CategorySubtotals {
                material: from_cents(material_cents),
                processing: from_cents(processing_cents),
                accessory: from_cents(accessory_cents),
            },
            total: from_cents(total_cents),
            excluded_modules,
            incomplete_modules,
            module_count: modules.len(),
            generated_at,
        };

        info!(
            modules = bom.module_count,
            lines = bom.lines.len(),
            excluded = bom.excluded_modules.len(),
            incomplete = bom.incomplete_modules.len(),
            total = bom.total,
            "物料清单汇总完成"
        );
        Ok(bom)
    }

    /// 板材行: 柜体在前,门板在后
    fn material_lines(
        module: &NormalizedModuleState,
        geometry: &PanelGeometry,
    ) -> Result<Vec<PricedLine>, PricingError> {
        let mut lines = vec![priced(
            module,
            BomCategory::Material,
            &module.body_material.id,
            format!("{} [柜体]", module.body_material.name),
            geometry.body_area_m2,
            PriceUnit::SquareMeter.as_str(),
            module.body_material.price_per_sqm,
        )?];

        if let Some(front) = &module.front_material {
            let area = geometry
                .front_area_m2
                .ok_or_else(|| PricingError::UnresolvedFront {
                    module_id: module.module_id.clone(),
                    item_id: front.id.clone(),
                })?;
            lines.push(priced(
                module,
                BomCategory::Material,
                &front.id,
                format!("{} [门板]", front.name),
                area,
                PriceUnit::SquareMeter.as_str(),
                front.price_per_sqm,
            )?);
        }
        Ok(lines)
    }

    fn processing_lines(
        module: &NormalizedModuleState,
        geometry: &PanelGeometry,
    ) -> Result<Vec<PricedLine>, PricingError> {
        let mut selections: Vec<_> = module.processing.iter().collect();
        selections.sort_by_key(|p| p.selection_index);

        selections
            .into_iter()
            .map(|p| {
                if p.target == PanelTarget::Front
                    && (module.front_material.is_none() || geometry.front_area_m2.is_none())
                {
                    return Err(PricingError::UnresolvedFront {
                        module_id: module.module_id.clone(),
                        item_id: p.option.id.clone(),
                    });
                }
                let quantity = match p.option.unit {
                    PriceUnit::SquareMeter => geometry.area_m2(p.target),
                    PriceUnit::LinearMeter => geometry.edge_m(p.target),
                    PriceUnit::Piece => f64::from(p.quantity),
                };
                let panel = match p.target {
                    PanelTarget::Body => "柜体",
                    PanelTarget::Front => "门板",
                };
                priced(
                    module,
                    BomCategory::Processing,
                    &p.option.id,
                    format!("{} [{}]", p.option.name, panel),
                    quantity,
                    p.option.unit.as_str(),
                    p.option.price_per_unit,
                )
            })
            .collect()
    }

    fn accessory_lines(module: &NormalizedModuleState) -> Result<Vec<PricedLine>, PricingError> {
        let mut selections: Vec<_> = module.accessories.iter().collect();
        selections.sort_by_key(|a| a.selection_index);

        selections
            .into_iter()
            .map(|a| {
                priced(
                    module,
                    BomCategory::Accessory,
                    &a.item.id,
                    format!("{} ({})", a.item.name, a.item.code),
                    f64::from(a.quantity),
                    PriceUnit::Piece.as_str(),
                    a.item.price,
                )
            })
            .collect()
    }
}

fn check_dimensions(module: &NormalizedModuleState) -> Result<(), PricingError> {
    for (label, v) in [
        ("width_mm", module.width_mm),
        ("height_mm", module.height_mm),
        ("depth_mm", module.depth_mm),
    ] {
        if !v.is_finite() || v <= 0.0 {
            return Err(PricingError::InvalidDimensions {
                module_id: module.module_id.clone(),
                message: format!("{}={}", label, v),
            });
        }
    }
    Ok(())
}

/// 分类小计 (按分累加,溢出即报错)
fn checked_sum(category: BomCategory, lines: &[PricedLine]) -> Result<i64, PricingError> {
    lines.iter().try_fold(0i64, |acc, l| {
        acc.checked_add(l.cents)
            .ok_or_else(|| PricingError::TotalOverflow {
                category: category.to_string(),
                module_id: l.line.module_id.clone(),
            })
    })
}

fn priced(
    module: &NormalizedModuleState,
    category: BomCategory,
    item_id: &str,
    description: String,
    quantity: f64,
    unit: &str,
    unit_price: f64,
) -> Result<PricedLine, PricingError> {
    if !unit_price.is_finite() || unit_price < 0.0 {
        return Err(PricingError::InvalidPrice {
            module_id: module.module_id.clone(),
            item_id: item_id.to_string(),
            price: unit_price,
        });
    }
    let cents = to_cents(quantity * unit_price).ok_or_else(|| PricingError::AmountOverflow {
        module_id: module.module_id.clone(),
        item_id: item_id.to_string(),
    })?;

    Ok(PricedLine {
        line: BomLine {
            category,
            module_id: module.module_id.clone(),
            module_name: module.name.clone(),
            module_sequence: module.sequence,
            item_id: item_id.to_string(),
            description,
            quantity,
            unit: unit.to_string(),
            unit_price,
            line_total: from_cents(cents),
        },
        cents,
    })
}

/// 以默认汇总器汇总
pub fn aggregate(modules: &[NormalizedModuleState]) -> Result<BillOfMaterials, PricingError> {
    PricingAggregator::new().aggregate(modules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{AccessoryItem, Catalog, Material, ProcessingOption};
    use crate::domain::project::{FurnitureModule, ProcessingSelection};
    use crate::domain::rule::RuleConflict;
    use crate::domain::types::{
        AccessoryType, ConflictSeverity, MaterialType, ModuleType, ProcessingType,
    };
    use crate::engine::catalog_store::CatalogStore;
    use crate::engine::composer::compose;
    use std::collections::BTreeSet;

    fn material(id: &str, t: MaterialType, price: f64) -> Material {
        Material {
            id: id.to_string(),
            code: format!("C-{}", id),
            name: id.to_string(),
            material_type: t,
            thickness_mm: 18.0,
            price_per_sqm: price,
            manufacturer: "Egger".to_string(),
            paintable: t.is_mdf_family(),
            cantable: t != MaterialType::Glass,
            in_stock: true,
        }
    }

    fn catalog() -> CatalogStore {
        CatalogStore::new(Catalog {
            materials: vec![
                material("PAL", MaterialType::Pal, 45.5),
                material("MDF", MaterialType::Mdf, 80.0),
                material("ODD", MaterialType::Pal, 1.005),
                material("CENT", MaterialType::Pal, 0.01),
            ],
            processing_options: vec![
                ProcessingOption {
                    id: "EDGE".to_string(),
                    name: "ABS 2mm".to_string(),
                    processing_type: ProcessingType::EdgeBanding,
                    price_per_unit: 3.0,
                    unit: PriceUnit::LinearMeter,
                    compatible_materials: BTreeSet::from([MaterialType::Pal, MaterialType::MdfAgt]),
                },
                ProcessingOption {
                    id: "PAINT".to_string(),
                    name: "Matt lacquer".to_string(),
                    processing_type: ProcessingType::Painting,
                    price_per_unit: 100.0,
                    unit: PriceUnit::SquareMeter,
                    compatible_materials: BTreeSet::from([MaterialType::Mdf]),
                },
                ProcessingOption {
                    id: "CNC".to_string(),
                    name: "CNC hole".to_string(),
                    processing_type: ProcessingType::Cnc,
                    price_per_unit: 2.5,
                    unit: PriceUnit::Piece,
                    compatible_materials: MaterialType::ALL.into_iter().collect(),
                },
            ],
            accessories: vec![AccessoryItem {
                id: "KNOB".to_string(),
                code: "K-1".to_string(),
                name: "Knob".to_string(),
                accessory_type: AccessoryType::Handle,
                manufacturer: "Hafele".to_string(),
                price: 0.333,
                stock_qty: 50,
                compatibility: ModuleType::ALL.into_iter().collect(),
            }],
        })
        .unwrap()
    }

    fn module(id: &str, seq: u64, draft: FurnitureModule) -> NormalizedModuleState {
        let mut draft = draft.with_id(id);
        draft.sequence = seq;
        compose(&draft, &catalog()).unwrap()
    }

    fn base(body: &str) -> FurnitureModule {
        FurnitureModule::new(ModuleType::BaseCabinet, 600.0, 720.0, 560.0, body)
    }

    #[test]
    fn test_body_only_total_equals_area_times_price() {
        let m = module("m1", 1, base("PAL"));
        let bom = aggregate(&[m]).unwrap();
        // 0.432 m² × 45.5 = 19.656 → 19.66
        assert_eq!(bom.total, 19.66);
        assert_eq!(bom.subtotals.material, 19.66);
        assert_eq!(bom.lines.len(), 1);
        assert_eq!(bom.lines[0].unit, "m2");
    }

    #[test]
    fn test_half_up_rounding() {
        assert_eq!(round_money(1.005), Some(1.01));
        assert_eq!(round_money(0.005), Some(0.01));
        assert_eq!(round_money(2.675), Some(2.68));
        assert_eq!(round_money(-1.005), Some(-1.01));
        assert_eq!(round_money(f64::NAN), None);

        let m = module(
            "m1",
            1,
            FurnitureModule::new(ModuleType::TallCabinet, 1000.0, 1000.0, 560.0, "ODD"),
        );
        assert_eq!(aggregate(&[m]).unwrap().total, 1.01);
    }

    #[test]
    fn test_subtotal_is_sum_of_rounded_lines() {
        let m = module(
            "m1",
            1,
            base("PAL")
                .with_accessory("KNOB", 1)
                .with_accessory("KNOB", 1)
                .with_accessory("KNOB", 1),
        );
        let bom = aggregate(&[m]).unwrap();
        assert_eq!(bom.subtotals.accessory, 0.99);
        let visible: f64 = bom.lines.iter().map(|l| l.line_total).sum();
        assert_eq!(to_cents(visible), to_cents(bom.total));
    }

    #[test]
    fn test_edge_banding_contributes_processing_line() {
        let m = module(
            "m1",
            1,
            base("PAL").with_processing(ProcessingSelection::body("EDGE")),
        );
        let bom = aggregate(&[m]).unwrap();
        let line = bom.lines_in(BomCategory::Processing).next().unwrap();
        // 2 × (600 + 720) mm = 2.64 m × 3.0
        assert_eq!(line.quantity, 2.64);
        assert_eq!(line.line_total, 7.92);
        assert!(bom.subtotals.processing > 0.0);
    }

    #[test]
    fn test_unit_dependent_processing_quantities() {
        let m = module(
            "m1",
            1,
            base("PAL")
                .with_front("MDF")
                .with_processing(ProcessingSelection::front("PAINT"))
                .with_processing(ProcessingSelection::body("CNC").with_quantity(4)),
        );
        let bom = aggregate(&[m]).unwrap();
        let lines: Vec<_> = bom.lines_in(BomCategory::Processing).collect();
        assert_eq!(lines[0].item_id, "PAINT");
        assert_eq!(lines[0].line_total, 43.2);
        assert_eq!(lines[1].item_id, "CNC");
        assert_eq!(lines[1].quantity, 4.0);
        assert_eq!(lines[1].line_total, 10.0);
    }

    #[test]
    fn test_line_order_category_then_sequence_then_selection() {
        let second = module("b", 2, base("PAL").with_accessory("KNOB", 2));
        let first = module(
            "a",
            1,
            base("PAL")
                .with_front("MDF")
                .with_processing(ProcessingSelection::body("CNC")),
        );
        let bom = aggregate(&[second, first]).unwrap();
        let order: Vec<(BomCategory, &str, &str)> = bom
            .lines
            .iter()
            .map(|l| (l.category, l.module_id.as_str(), l.item_id.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (BomCategory::Material, "a", "PAL"),
                (BomCategory::Material, "a", "MDF"),
                (BomCategory::Material, "b", "PAL"),
                (BomCategory::Processing, "a", "CNC"),
                (BomCategory::Accessory, "b", "KNOB"),
            ]
        );
    }

    #[test]
    fn test_blocked_module_excluded_and_accounted() {
        let ok = module("ok", 1, base("PAL"));
        let mut blocked = module("blocked", 2, base("PAL").with_accessory("KNOB", 1));
        blocked.conflicts.push(RuleConflict {
            kind: crate::domain::rule::ConflictKind::RuleFlag,
            rule_id: Some("R900".to_string()),
            rule_name: Some("no PAL".to_string()),
            severity: ConflictSeverity::Blocking,
            message: "PAL not allowed".to_string(),
        });
        let mut warned = module("warned", 3, base("PAL"));
        warned.conflicts.push(RuleConflict {
            kind: crate::domain::rule::ConflictKind::RuleFlag,
            rule_id: Some("R901".to_string()),
            rule_name: None,
            severity: ConflictSeverity::Warning,
            message: "check".to_string(),
        });

        let bom = aggregate(&[ok, blocked, warned]).unwrap();
        assert_eq!(bom.excluded_modules.len(), 1);
        assert_eq!(bom.excluded_modules[0].module_id, "blocked");
        assert_eq!(bom.excluded_modules[0].reasons[0].rule_id.as_deref(), Some("R900"));
        assert!(bom.lines.iter().all(|l| l.module_id != "blocked"));
        assert_eq!(
            bom.excluded_modules.len() + bom.priced_module_count(),
            bom.module_count
        );
        assert_eq!(bom.total, 39.32);
    }

    #[test]
    fn test_pending_requirements_listed_as_incomplete() {
        let mut m = module("m1", 1, base("PAL"));
        m.required_accessory_types.insert(AccessoryType::Hinge);
        let bom = aggregate(&[m]).unwrap();
        assert_eq!(bom.incomplete_modules.len(), 1);
        assert_eq!(bom.priced_module_count(), 1);
    }

    #[test]
    fn test_invariant_violations_fail_loudly() {
        let a = module("dup", 1, base("PAL"));
        let b = module("dup", 2, base("PAL"));
        assert_eq!(
            aggregate(&[a, b]).unwrap_err(),
            PricingError::DuplicateModuleId("dup".to_string())
        );

        let mut bad_price = module("m1", 1, base("PAL"));
        bad_price.body_material.price_per_sqm = f64::NAN;
        assert!(matches!(
            aggregate(&[bad_price]).unwrap_err(),
            PricingError::InvalidPrice { .. }
        ));

        let mut front_on_shelf = module(
            "m2",
            1,
            FurnitureModule::new(ModuleType::OpenShelf, 800.0, 300.0, 250.0, "PAL"),
        );
        front_on_shelf.front_material = Some(front_on_shelf.body_material.clone());
        assert!(matches!(
            aggregate(&[front_on_shelf]).unwrap_err(),
            PricingError::UnresolvedFront { .. }
        ));
    }

    #[test]
    fn test_subtotal_overflow_is_an_error() {
        // 单行 1e18 分在上限内,十行累加超出 i64
        let modules: Vec<_> = (1..=10)
            .map(|i| {
                let mut m = module(
                    &format!("t{}", i),
                    i,
                    FurnitureModule::new(ModuleType::TallCabinet, 1000.0, 1000.0, 560.0, "PAL"),
                );
                m.body_material.price_per_sqm = 1.0e16;
                m
            })
            .collect();
        assert!(aggregate(&modules[..1]).is_ok());

        match aggregate(&modules).unwrap_err() {
            PricingError::TotalOverflow {
                category,
                module_id,
            } => {
                assert_eq!(category, "material");
                assert!(module_id.starts_with('t'));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lines_carry_module_name() {
        let mut draft = base("PAL").with_accessory("KNOB", 1);
        draft.name = "Sink base".to_string();
        let bom = aggregate(&[module("m1", 1, draft)]).unwrap();
        assert_eq!(bom.lines.len(), 2);
        assert!(bom.lines.iter().all(|l| l.module_name == "Sink base"));
    }

    #[test]
    fn test_empty_input() {
        let bom = aggregate(&[]).unwrap();
        assert_eq!(bom.total, 0.0);
        assert_eq!(bom.module_count, 0);
        assert!(bom.lines.is_empty());
    }

    #[test]
    fn test_cent_price_rounds_up_at_half() {
        let m = module(
            "m1",
            1,
            FurnitureModule::new(ModuleType::TallCabinet, 1000.0, 500.0, 560.0, "CENT"),
        );
        assert_eq!(aggregate(&[m]).unwrap().total, 0.01);
    }
}
