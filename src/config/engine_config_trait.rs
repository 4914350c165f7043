// ==========================================
// 家具配置报价系统 - 引擎配置读取 Trait
// ==========================================
// 职责: 定义报价/导出流程所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::quote::{ExportOptions, GeneratorIdentity};
use crate::engine::composer::StockPolicy;
use async_trait::async_trait;
use std::error::Error;

/// 配置读取结果
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait EngineConfigReader: Send + Sync {
    /// 报价币种
    ///
    /// # 默认值
    /// - RON
    async fn get_currency(&self) -> ConfigResult<String>;

    /// 导出文档头中的生成方标识
    ///
    /// # 默认值
    /// - 程序名 + 版本号
    async fn get_generator_identity(&self) -> ConfigResult<GeneratorIdentity>;

    /// 默认导出选项 (JSON,缺省键为 true)
    ///
    /// # 默认值
    /// - 全部为 true
    async fn get_default_export_options(&self) -> ConfigResult<ExportOptions>;

    /// 缺货处理策略
    ///
    /// # 默认值
    /// - warn (仅提示)
    async fn get_stock_policy(&self) -> ConfigResult<StockPolicy>;
}
