// ==========================================
// 家具配置报价系统 - 引擎编排器
// ==========================================
// 流程: 目录 → 组装 → 规则评估 (不动点) → 计价汇总 → 导出模型
// 红线: 每次报价都从草稿重新组装,不复用旧的规范化状态
// 红线: 一次报价只取一次规则集快照,所有模块使用同一快照
// ==========================================

use crate::domain::project::{FurnitureModule, Project};
use crate::domain::quote::{BillOfMaterials, ExportModel, ExportOptions, GeneratorIdentity};
use crate::domain::rule::{ActionTarget, RuleConflict, RuleError};
use crate::engine::catalog_store::CatalogStore;
use crate::engine::composer::{CompositionError, ModuleComposer, StockPolicy};
use crate::engine::export::ExportModelBuilder;
use crate::engine::pricing::{PricingAggregator, PricingError};
use crate::engine::rule_evaluator::{AppliedAction, EvaluationResult, RuleEvaluator};
use crate::engine::rule_set::RuleSetSnapshot;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

// ==========================================
// EngineError - 流程错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("{} 个模块组装失败: {}", .0.len(), join_errors(.0))]
    Composition(Vec<CompositionError>),

    #[error("规则集无效: {0}")]
    Rule(#[from] RuleError),

    #[error("计价失败: {0}")]
    Pricing(#[from] PricingError),
}

fn join_errors(errors: &[CompositionError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<CompositionError> for EngineError {
    fn from(e: CompositionError) -> Self {
        EngineError::Composition(vec![e])
    }
}

// ==========================================
// 报价结果
// ==========================================

/// 单个模块的评估摘要 (供界面逐模块展示)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleEvaluation {
    pub module_id: String,
    pub module_name: String,
    pub applied_actions: Vec<AppliedAction>,
    /// 库存冲突 + 规则冲突
    pub conflicts: Vec<RuleConflict>,
    pub pending_requirements: Vec<ActionTarget>,
    pub iterations: usize,
    pub converged: bool,
}

impl ModuleEvaluation {
    pub fn from_result(result: &EvaluationResult) -> Self {
        let state = &result.next_state;
        Self {
            module_id: state.module_id.clone(),
            module_name: state.name.clone(),
            applied_actions: result.applied_actions.clone(),
            conflicts: state.conflicts.clone(),
            pending_requirements: state.pending_requirements(),
            iterations: result.iterations,
            converged: result.converged,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectQuote {
    pub project_id: String,
    /// 按模块创建顺序
    pub modules: Vec<ModuleEvaluation>,
    pub bom: BillOfMaterials,
}

// ==========================================
// ConfiguratorEngine - 引擎编排器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ConfiguratorEngine {
    composer: ModuleComposer,
    evaluator: RuleEvaluator,
    aggregator: PricingAggregator,
}

impl ConfiguratorEngine {
    pub fn new(stock_policy: StockPolicy) -> Self {
        Self {
            composer: ModuleComposer::new(stock_policy),
            evaluator: RuleEvaluator::new(),
            aggregator: PricingAggregator::new(),
        }
    }

    /// 单模块: 组装 + 规则评估
    pub fn evaluate_module(
        &self,
        draft: &FurnitureModule,
        catalog: &CatalogStore,
        rules: &RuleSetSnapshot,
    ) -> Result<EvaluationResult, EngineError> {
        let state = self.composer.compose(draft, catalog)?;
        Ok(self.evaluator.evaluate_snapshot(&state, rules)?)
    }

    /// 项目报价
    ///
    /// # 流程
    /// 1. 按创建顺序组装全部模块 (收集全部组装错误后一次性返回)
    /// 2. 以同一规则快照逐模块评估
    /// 3. 汇总物料清单
    pub fn quote_project(
        &self,
        project: &Project,
        catalog: &CatalogStore,
        rules: &RuleSetSnapshot,
    ) -> Result<ProjectQuote, EngineError> {
        let drafts = project.modules_in_creation_order();
        info!(
            project_id = %project.id,
            modules = drafts.len(),
            rules = rules.len(),
            "开始项目报价"
        );

        // ==========================================
        // 步骤1: 组装
        // ==========================================
        let mut states = Vec::with_capacity(drafts.len());
        let mut failures = Vec::new();
        for draft in drafts {
            match self.composer.compose(draft, catalog) {
                Ok(state) => states.push(state),
                Err(e) => {
                    warn!(module_id = %draft.id, error = %e, "模块组装失败");
                    failures.push(e);
                }
            }
        }
        if !failures.is_empty() {
            return Err(EngineError::Composition(failures));
        }

        // ==========================================
        // 步骤2: 规则评估
        // ==========================================
        let mut evaluations = Vec::with_capacity(states.len());
        let mut final_states = Vec::with_capacity(states.len());
        for state in &states {
            let result = self.evaluator.evaluate_snapshot(state, rules)?;
            debug!(
                module_id = %state.module_id,
                applied = result.applied_actions.len(),
                conflicts = result.next_state.conflicts.len(),
                "模块评估完成"
            );
            evaluations.push(ModuleEvaluation::from_result(&result));
            final_states.push(result.next_state);
        }

        // ==========================================
        // 步骤3: 计价
        // ==========================================
        let bom = self.aggregator.aggregate(&final_states)?;

        info!(
            project_id = %project.id,
            total = bom.total,
            excluded = bom.excluded_modules.len(),
            "项目报价完成"
        );

        Ok(ProjectQuote {
            project_id: project.id.clone(),
            modules: evaluations,
            bom,
        })
    }

    /// 项目报价并构建导出模型
    pub fn export_project(
        &self,
        project: &Project,
        catalog: &CatalogStore,
        rules: &RuleSetSnapshot,
        options: &ExportOptions,
        generator: GeneratorIdentity,
        currency: &str,
    ) -> Result<(ProjectQuote, ExportModel), EngineError> {
        let quote = self.quote_project(project, catalog, rules)?;
        let model = ExportModelBuilder::new(generator, currency).build(project, &quote.bom, options);
        Ok((quote, model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{AccessoryItem, Catalog, Material, ProcessingOption};
    use crate::domain::project::{ProcessingSelection, SpaceDraft};
    use crate::domain::types::{
        AccessoryType, MaterialType, ModuleType, PriceUnit, ProcessingType,
    };
    use crate::engine::default_rules::default_rules;
    use crate::engine::rule_set::ComboRuleSet;
    use std::collections::BTreeSet;

    fn catalog() -> CatalogStore {
        let material = |id: &str, t: MaterialType| Material {
            id: id.to_string(),
            code: id.to_string(),
            name: id.to_string(),
            material_type: t,
            thickness_mm: 18.0,
            price_per_sqm: 50.0,
            manufacturer: "Egger".to_string(),
            paintable: false,
            cantable: t != MaterialType::Glass,
            in_stock: true,
        };
        let accessory = |id: &str, t: AccessoryType, price: f64| AccessoryItem {
            id: id.to_string(),
            code: id.to_string(),
            name: id.to_string(),
            accessory_type: t,
            manufacturer: "Blum".to_string(),
            price,
            stock_qty: 100,
            compatibility: ModuleType::ALL.into_iter().collect(),
        };
        CatalogStore::new(Catalog {
            materials: vec![
                material("PAL", MaterialType::Pal),
                material("GLASS", MaterialType::Glass),
            ],
            processing_options: vec![ProcessingOption {
                id: "EDGE".to_string(),
                name: "ABS".to_string(),
                processing_type: ProcessingType::EdgeBanding,
                price_per_unit: 2.0,
                unit: PriceUnit::LinearMeter,
                compatible_materials: BTreeSet::from([MaterialType::Pal]),
            }],
            accessories: vec![
                accessory("PUSH", AccessoryType::PushSystem, 30.0),
                accessory("HANDLE", AccessoryType::Handle, 15.0),
            ],
        })
        .unwrap()
    }

    fn project() -> (Project, String) {
        let mut project = Project::new("u1", "Test kitchen", "kitchen");
        let space = project
            .add_space(SpaceDraft {
                name: "Kitchen".to_string(),
                width_mm: 3000.0,
                height_mm: 2500.0,
                depth_mm: 600.0,
                ..SpaceDraft::default()
            })
            .unwrap();
        (project, space)
    }

    #[test]
    fn test_quote_applies_rules_before_pricing() {
        let (mut project, space) = project();
        project
            .add_module(
                &space,
                FurnitureModule::new(ModuleType::BaseCabinet, 600.0, 720.0, 560.0, "PAL")
                    .with_id("m1")
                    .with_accessory("PUSH", 1)
                    .with_accessory("HANDLE", 2),
            )
            .unwrap();
        let rules = ComboRuleSet::new(default_rules()).unwrap();

        let quote = ConfiguratorEngine::default()
            .quote_project(&project, &catalog(), &rules.snapshot())
            .unwrap();

        assert_eq!(quote.modules[0].applied_actions.len(), 1);
        assert!(quote.bom.lines.iter().all(|l| l.item_id != "HANDLE"));
        // 0.432 × 50 = 21.60 + push 30.00
        assert_eq!(quote.bom.total, 51.6);
    }

    #[test]
    fn test_all_composition_failures_reported_together() {
        let (mut project, space) = project();
        project
            .add_module(
                &space,
                FurnitureModule::new(ModuleType::BaseCabinet, 600.0, 720.0, 560.0, "NOPE"),
            )
            .unwrap();
        project
            .add_module(
                &space,
                FurnitureModule::new(ModuleType::WallCabinet, 600.0, 720.0, 320.0, "GLASS")
                    .with_processing(ProcessingSelection::body("EDGE")),
            )
            .unwrap();
        let rules = ComboRuleSet::new(vec![]).unwrap();

        let err = ConfiguratorEngine::default()
            .quote_project(&project, &catalog(), &rules.snapshot())
            .unwrap_err();
        match err {
            EngineError::Composition(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_export_uses_quote_bom() {
        let (mut project, space) = project();
        project
            .add_module(
                &space,
                FurnitureModule::new(ModuleType::BaseCabinet, 600.0, 720.0, 560.0, "PAL"),
            )
            .unwrap();
        let rules = ComboRuleSet::new(default_rules()).unwrap();
        let (quote, model) = ConfiguratorEngine::default()
            .export_project(
                &project,
                &catalog(),
                &rules.snapshot(),
                &ExportOptions::default(),
                GeneratorIdentity {
                    name: "test".to_string(),
                    version: "1".to_string(),
                },
                "RON",
            )
            .unwrap();
        assert_eq!(model.totals.unwrap().total, quote.bom.total);
    }
}
