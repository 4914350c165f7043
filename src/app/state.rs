// ==========================================
// 家具配置报价系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 红线: 所有仓储共享同一个数据库连接; 规则集全局唯一
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{ConfiguratorApi, ProjectApi, RuleApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::rule_set::ComboRuleSet;
use crate::importer::CatalogImporter;
use crate::repository::{CatalogRepository, ComboRuleRepository, ProjectRepository};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "FURNITURE_CONFIGURATOR_DB_PATH";

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 项目/空间/模块 API
    pub project_api: Arc<ProjectApi>,

    /// 组合规则 API
    pub rule_api: Arc<RuleApi>,

    /// 组装/评估/报价/导出 API
    pub configurator_api: Arc<ConfiguratorApi<ConfigManager>>,

    /// 目录 CSV 导入
    pub catalog_importer: Arc<CatalogImporter>,

    /// 目录仓储 (目录维护界面直接使用)
    pub catalog_repo: Arc<CatalogRepository>,

    /// 项目仓储
    pub project_repo: Arc<ProjectRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 内存规则集 (评估时取快照)
    pub rule_set: Arc<ComboRuleSet>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 1. 打开数据库并初始化表结构
    /// 2. 初始化所有Repository
    /// 3. 从数据库加载规则集
    /// 4. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        Self::from_connection(Arc::new(Mutex::new(conn)), db_path)
    }

    /// 基于已有连接创建 (测试使用内存库)
    pub fn from_connection(conn: Arc<Mutex<Connection>>, db_path: String) -> Result<Self, String> {
        {
            let guard = conn
                .lock()
                .map_err(|e| format!("数据库锁获取失败: {}", e))?;
            init_schema(&guard).map_err(|e| format!("数据库初始化失败: {}", e))?;
        }

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let catalog_repo = Arc::new(CatalogRepository::from_connection(conn.clone()));
        let project_repo = Arc::new(ProjectRepository::from_connection(conn.clone()));
        let rule_repo = Arc::new(ComboRuleRepository::from_connection(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 规则集
        // ==========================================
        let rule_set = Arc::new(
            ComboRuleSet::new(Vec::new()).map_err(|e| format!("无法创建规则集: {}", e))?,
        );
        let rule_api = Arc::new(RuleApi::new(rule_repo, rule_set.clone()));
        rule_api
            .reload()
            .map_err(|e| format!("规则加载失败: {}", e))?;

        // ==========================================
        // API层
        // ==========================================
        let project_api = Arc::new(ProjectApi::new(project_repo.clone()));
        let configurator_api = Arc::new(ConfiguratorApi::new(
            catalog_repo.clone(),
            project_repo.clone(),
            rule_set.clone(),
            config_manager.clone(),
        ));
        let catalog_importer = Arc::new(CatalogImporter::new(catalog_repo.clone()));

        tracing::info!(rules = rule_set.snapshot().len(), "AppState初始化完成");

        Ok(Self {
            db_path,
            project_api,
            rule_api,
            configurator_api,
            catalog_importer,
            catalog_repo,
            project_repo,
            config_manager,
            rule_set,
        })
    }
}

/// 默认数据库路径
///
/// 优先级: 环境变量 → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./furniture_configurator.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("furniture-configurator");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("furniture_configurator.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_from_in_memory_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let state =
            AppState::from_connection(Arc::new(Mutex::new(conn)), ":memory:".to_string()).unwrap();
        assert!(state.rule_api.list_rules().is_empty());
        assert_eq!(state.rule_api.seed_defaults().unwrap(), 8);
        assert_eq!(state.rule_set.snapshot().len(), 8);
    }
}
