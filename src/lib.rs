// ==========================================
// 家具配置报价系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 家具项目的组合规则校验与报价引擎
// 主流程: 目录 → 模块组装 → 规则评估 (不动点) → 计价汇总 → 导出模型
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 组合规则与计价
pub mod engine;

// 导入层 - 目录 CSV
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/表结构）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 共享状态
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AccessoryType, BomCategory, ConflictSeverity, ExportFormat, MaterialType, ModuleType,
    PriceUnit, ProcessingType, ProjectStatus,
};

// 领域实体
pub use domain::{
    AccessoryItem, BillOfMaterials, ComboRule, ExportModel, ExportOptions, FurnitureModule,
    Material, ProcessingOption, Project, RuleAction, RuleCondition, RuleConflict, Space,
};

// 引擎
pub use engine::{
    CatalogStore, ComboRuleSet, ConfiguratorEngine, ExportModelBuilder, ModuleComposer,
    PricingAggregator, RuleEvaluator, RuleSetAuditor,
};

// API
pub use api::{ApiError, ConfiguratorApi, ProjectApi, RuleApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称 (导出文档头中的缺省生成方)
pub const APP_NAME: &str = "furniture-configurator";
