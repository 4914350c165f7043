// ==========================================
// 家具配置报价系统 - 引擎层
// ==========================================
// 职责: 组合规则与计价引擎 (纯计算,不做 I/O)
// 红线: Engine 不拼 SQL; 每个失败/冲突都必须可追溯到具体规则或具体选择
// ==========================================

pub mod catalog_store;
pub mod composer;
pub mod default_rules;
pub mod export;
pub mod geometry;
pub mod orchestrator;
pub mod pricing;
pub mod rule_audit;
pub mod rule_evaluator;
pub mod rule_set;

// 重导出核心引擎
pub use catalog_store::{CatalogError, CatalogStore};
pub use composer::{
    compose, CompositionError, ModuleComposer, NormalizedModuleState, ResolvedAccessory,
    ResolvedProcessing, StockPolicy,
};
pub use default_rules::default_rules;
pub use export::{ExportModelBuilder, Exporter};
pub use geometry::PanelGeometry;
pub use orchestrator::{ConfiguratorEngine, EngineError, ModuleEvaluation, ProjectQuote};
pub use pricing::{aggregate, round_money, PricingAggregator, PricingError};
pub use rule_audit::{RuleOverlap, RuleOverlapKind, RuleSetAuditor};
pub use rule_evaluator::{evaluate, AppliedAction, EvaluationResult, RuleEvaluator};
pub use rule_set::{ComboRuleSet, RuleSetSnapshot};
