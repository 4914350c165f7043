// ==========================================
// 家具配置报价系统 - 配置报价 API
// ==========================================
// 职责: 对已保存项目执行 组装 / 规则评估 / 报价 / 导出
// 红线: 每次调用都重新读取目录快照并重新组装 (不缓存规范化状态)
// 红线: I/O (读目录、读项目、读配置) 全部在引擎调用之前完成
// ==========================================

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::config::engine_config_trait::EngineConfigReader;
use crate::domain::project::Project;
use crate::domain::quote::{ExportModel, ExportOptions, ExportOutcome, ExportRequest};
use crate::engine::catalog_store::CatalogStore;
use crate::engine::export::Exporter;
use crate::engine::orchestrator::{ConfiguratorEngine, ModuleEvaluation, ProjectQuote};
use crate::engine::rule_set::ComboRuleSet;
use crate::repository::{CatalogRepository, ProjectRepository};

fn config_error(e: Box<dyn std::error::Error + Send + Sync>) -> ApiError {
    ApiError::ConfigError(e.to_string())
}

// ==========================================
// ConfiguratorApi - 配置报价 API
// ==========================================
pub struct ConfiguratorApi<C = ConfigManager>
where
    C: EngineConfigReader,
{
    catalog_repo: Arc<CatalogRepository>,
    project_repo: Arc<ProjectRepository>,
    rule_set: Arc<ComboRuleSet>,
    config: Arc<C>,
    exporters: Vec<Arc<dyn Exporter>>,
}

impl<C> ConfiguratorApi<C>
where
    C: EngineConfigReader,
{
    pub fn new(
        catalog_repo: Arc<CatalogRepository>,
        project_repo: Arc<ProjectRepository>,
        rule_set: Arc<ComboRuleSet>,
        config: Arc<C>,
    ) -> Self {
        Self {
            catalog_repo,
            project_repo,
            rule_set,
            config,
            exporters: Vec::new(),
        }
    }

    /// 注册外部导出器 (按注册顺序匹配格式)
    pub fn with_exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.exporters.push(exporter);
        self
    }

    fn load_project(&self, project_id: &str) -> ApiResult<Project> {
        self.project_repo
            .find_by_id(project_id)?
            .ok_or_else(|| ApiError::NotFound(format!("project(id={})不存在", project_id)))
    }

    fn load_catalog(&self) -> ApiResult<CatalogStore> {
        Ok(CatalogStore::new(self.catalog_repo.load_catalog()?)?)
    }

    async fn engine(&self) -> ApiResult<ConfiguratorEngine> {
        let policy = self.config.get_stock_policy().await.map_err(config_error)?;
        Ok(ConfiguratorEngine::new(policy))
    }

    /// 评估单个模块 (组装 + 规则不动点)
    pub async fn evaluate_module(
        &self,
        project_id: &str,
        module_id: &str,
    ) -> ApiResult<ModuleEvaluation> {
        let project = self.load_project(project_id)?;
        let draft = project
            .module(module_id)
            .ok_or_else(|| ApiError::NotFound(format!("模块(id={})不存在", module_id)))?;
        let catalog = self.load_catalog()?;
        let engine = self.engine().await?;

        let result = engine.evaluate_module(draft, &catalog, &self.rule_set.snapshot())?;
        if result.cycle_detected() {
            warn!(module_id = %module_id, "规则集存在循环");
        }
        Ok(ModuleEvaluation::from_result(&result))
    }

    /// 项目报价
    pub async fn quote_project(&self, project_id: &str) -> ApiResult<ProjectQuote> {
        let project = self.load_project(project_id)?;
        let catalog = self.load_catalog()?;
        let engine = self.engine().await?;
        Ok(engine.quote_project(&project, &catalog, &self.rule_set.snapshot())?)
    }

    /// 构建导出模型 (options 为 None 时使用配置中的默认导出选项)
    pub async fn build_export_model(
        &self,
        project_id: &str,
        options: Option<ExportOptions>,
    ) -> ApiResult<ExportModel> {
        let project = self.load_project(project_id)?;
        let catalog = self.load_catalog()?;
        let engine = self.engine().await?;

        let options = match options {
            Some(o) => o,
            None => self
                .config
                .get_default_export_options()
                .await
                .map_err(config_error)?,
        };
        let generator = self
            .config
            .get_generator_identity()
            .await
            .map_err(config_error)?;
        let currency = self.config.get_currency().await.map_err(config_error)?;

        let (_, model) = engine.export_project(
            &project,
            &catalog,
            &self.rule_set.snapshot(),
            &options,
            generator,
            &currency,
        )?;
        Ok(model)
    }

    /// 导出项目报价
    ///
    /// 没有支持该格式的导出器时返回 Failed,而不是错误
    pub async fn export_project(
        &self,
        project_id: &str,
        request: &ExportRequest,
        options: Option<ExportOptions>,
    ) -> ApiResult<ExportOutcome> {
        if request.filename.trim().is_empty() {
            return Err(ApiError::InvalidInput("导出文件名不能为空".to_string()));
        }
        let model = self.build_export_model(project_id, options).await?;

        let Some(exporter) = self.exporters.iter().find(|e| e.supports(request.format)) else {
            warn!(format = %request.format, "没有可用的导出器");
            return Ok(ExportOutcome::Failed {
                reason: format!("不支持的导出格式: {}", request.format),
            });
        };

        let outcome = exporter.export(&model, request);
        info!(
            project_id = %project_id,
            format = %request.format,
            filename = %request.filename,
            "导出完成"
        );
        Ok(outcome)
    }
}
