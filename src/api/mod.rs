// ==========================================
// 家具配置报价系统 - API 层
// ==========================================
// 职责: 面向界面的业务 API (项目管理、规则管理、报价导出)
// ==========================================

pub mod configurator_api;
pub mod error;
pub mod project_api;
pub mod rule_api;

// 重导出核心类型
pub use configurator_api::ConfiguratorApi;
pub use error::{ApiError, ApiResult};
pub use project_api::ProjectApi;
pub use rule_api::RuleApi;
