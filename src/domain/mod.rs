// ==========================================
// 家具配置报价系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、封闭枚举、规则数据模型、派生报价模型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod catalog;
pub mod project;
pub mod quote;
pub mod rule;
pub mod types;

// 重导出核心类型
pub use catalog::{AccessoryItem, Catalog, Material, ProcessingOption};
pub use project::{
    AccessorySelection, FurnitureModule, Position, ProcessingSelection, Project,
    ProjectDimensions, ProjectError, Space, SpaceDraft, Wall,
};
pub use quote::{
    BillOfMaterials, BomLine, CategorySubtotals, CategoryTotal, ExcludedModule, ExportHeader,
    ExportModel, ExportOptions, ExportOutcome, ExportRequest, ExportRow, ExportSection,
    ExportTotals, GeneratorIdentity, IncompleteModule, Quote,
};
pub use rule::{
    ActionTarget, ComboRule, ConflictKind, RuleAction, RuleCondition, RuleConflict, RuleError,
};
pub use types::{
    AccessoryType, BomCategory, ConflictSeverity, ExportFormat, MaterialType, ModuleType,
    PanelTarget, PriceUnit, ProcessingType, ProjectStatus, UnknownVariant,
};
