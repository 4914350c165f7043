// ==========================================
// 家具配置报价系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写、快照/恢复
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::engine_config_trait::{ConfigResult, EngineConfigReader};
use crate::db::open_sqlite_connection;
use crate::domain::quote::{ExportOptions, GeneratorIdentity};
use crate::engine::composer::StockPolicy;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }
        Ok(Self { conn })
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置 (UPSERT)
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err("配置键不能为空".into());
        }
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        info!(key = %key, "配置已更新");
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON 对象,按键排序）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(serde_json::to_string(&config_map)?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    ///
    /// # 注意
    /// - 覆盖同名 global 配置; 快照中不存在的键保持不变
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ConfigResult<usize> {
        let config_map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;
        let mut count = 0;
        for (key, value) in &config_map {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value, updated_at)
                 VALUES ('global', ?1, ?2, datetime('now'))
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
                params![key, value],
            )?;
        }
        tx.commit()?;

        info!(count = count, "配置已从快照恢复");
        Ok(count)
    }
}

#[async_trait]
impl EngineConfigReader for ConfigManager {
    async fn get_currency(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::CURRENCY, "RON")?;
        let value = value.trim().to_uppercase();
        if value.is_empty() {
            Ok("RON".to_string())
        } else {
            Ok(value)
        }
    }

    async fn get_generator_identity(&self) -> ConfigResult<GeneratorIdentity> {
        Ok(GeneratorIdentity {
            name: self.get_config_or_default(config_keys::GENERATOR_NAME, crate::APP_NAME)?,
            version: self.get_config_or_default(config_keys::GENERATOR_VERSION, crate::VERSION)?,
        })
    }

    async fn get_default_export_options(&self) -> ConfigResult<ExportOptions> {
        let Some(raw) = self.get_global_config_value(config_keys::DEFAULT_EXPORT_OPTIONS)? else {
            return Ok(ExportOptions::default());
        };
        match serde_json::from_str::<ExportOptions>(&raw) {
            Ok(options) => Ok(options),
            Err(e) => {
                warn!(error = %e, "默认导出选项格式错误,使用缺省值");
                Ok(ExportOptions::default())
            }
        }
    }

    async fn get_stock_policy(&self) -> ConfigResult<StockPolicy> {
        let value = self.get_config_or_default(config_keys::STOCK_POLICY, "warn")?;
        match value.trim().to_lowercase().as_str() {
            "warn" => Ok(StockPolicy::Warn),
            "block" => Ok(StockPolicy::Block),
            other => {
                warn!(value = %other, "未知缺货策略,按 warn 处理");
                Ok(StockPolicy::Warn)
            }
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 报价
    pub const CURRENCY: &str = "currency";
    pub const STOCK_POLICY: &str = "stock_policy"; // warn | block

    // 导出
    pub const GENERATOR_NAME: &str = "generator_name";
    pub const GENERATOR_VERSION: &str = "generator_version";
    pub const DEFAULT_EXPORT_OPTIONS: &str = "default_export_options"; // JSON
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_table_empty() {
        let cfg = manager();
        assert_eq!(cfg.get_currency().await.unwrap(), "RON");
        assert_eq!(cfg.get_stock_policy().await.unwrap(), StockPolicy::Warn);
        assert_eq!(
            cfg.get_default_export_options().await.unwrap(),
            ExportOptions::default()
        );
        let generator = cfg.get_generator_identity().await.unwrap();
        assert_eq!(generator.name, crate::APP_NAME);
        assert_eq!(generator.version, crate::VERSION);
    }

    #[tokio::test]
    async fn test_overrides_are_read() {
        let cfg = manager();
        cfg.set_config_value(config_keys::CURRENCY, "eur").unwrap();
        cfg.set_config_value(config_keys::STOCK_POLICY, "block").unwrap();
        cfg.set_config_value(config_keys::DEFAULT_EXPORT_OPTIONS, r#"{"includePrices":false}"#)
            .unwrap();

        assert_eq!(cfg.get_currency().await.unwrap(), "EUR");
        assert_eq!(cfg.get_stock_policy().await.unwrap(), StockPolicy::Block);
        let options = cfg.get_default_export_options().await.unwrap();
        assert!(!options.include_prices);
        assert!(options.include_materials);
    }

    #[tokio::test]
    async fn test_malformed_export_options_fall_back() {
        let cfg = manager();
        cfg.set_config_value(config_keys::DEFAULT_EXPORT_OPTIONS, "not json")
            .unwrap();
        assert_eq!(
            cfg.get_default_export_options().await.unwrap(),
            ExportOptions::default()
        );
    }

    #[test]
    fn test_snapshot_and_restore() {
        let cfg = manager();
        cfg.set_config_value(config_keys::CURRENCY, "RON").unwrap();
        cfg.set_config_value(config_keys::STOCK_POLICY, "block").unwrap();
        let snapshot = cfg.get_config_snapshot().unwrap();

        cfg.set_config_value(config_keys::STOCK_POLICY, "warn").unwrap();
        assert_eq!(cfg.restore_config_from_snapshot(&snapshot).unwrap(), 2);
        assert_eq!(
            cfg.get_global_config_value(config_keys::STOCK_POLICY).unwrap(),
            Some("block".to_string())
        );
        assert!(cfg.set_config_value("  ", "x").is_err());
    }
}
