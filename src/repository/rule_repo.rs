// ==========================================
// 家具配置报价系统 - 组合规则仓储
// ==========================================
// 职责: combo_rule 表的 CRUD; 条件/动作以 JSON 存储
// 红线: 持久化 JSON 中出现未知枚举值 → RuleError::Malformed (硬失败,不跳过)
// ==========================================

use crate::domain::rule::{ComboRule, RuleAction, RuleCondition, RuleError};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// 原始行 (JSON 尚未解析)
struct ComboRuleRow {
    rule_id: String,
    name: String,
    description: String,
    enabled: bool,
    condition_json: String,
    action_json: String,
}

impl ComboRuleRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            rule_id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            enabled: row.get(3)?,
            condition_json: row.get(4)?,
            action_json: row.get(5)?,
        })
    }

    fn into_rule(self) -> Result<ComboRule, RuleError> {
        let malformed = |what: &str, e: serde_json::Error| RuleError::Malformed {
            rule_id: self.rule_id.clone(),
            message: format!("{} 解析失败: {}", what, e),
        };
        let condition: RuleCondition =
            serde_json::from_str(&self.condition_json).map_err(|e| malformed("condition", e))?;
        let action: RuleAction =
            serde_json::from_str(&self.action_json).map_err(|e| malformed("action", e))?;

        let rule = ComboRule {
            id: self.rule_id,
            name: self.name,
            description: self.description,
            enabled: self.enabled,
            condition,
            action,
        };
        rule.validate()?;
        Ok(rule)
    }
}

const RULE_COLUMNS: &str = "rule_id, name, description, enabled, condition_json, action_json";

// ==========================================
// ComboRuleRepository - 组合规则仓储
// ==========================================
pub struct ComboRuleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ComboRuleRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 全部规则 (rule_id 升序)
    pub fn list_all(&self) -> RepositoryResult<Vec<ComboRule>> {
        let rows = {
            let conn = self.get_conn()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM combo_rule ORDER BY rule_id",
                RULE_COLUMNS
            ))?;
            let rows = stmt.query_map([], ComboRuleRow::from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        rows.into_iter()
            .map(|r| r.into_rule().map_err(RepositoryError::from))
            .collect()
    }

    pub fn find_by_id(&self, rule_id: &str) -> RepositoryResult<Option<ComboRule>> {
        let row = {
            let conn = self.get_conn()?;
            conn.query_row(
                &format!("SELECT {} FROM combo_rule WHERE rule_id = ?1", RULE_COLUMNS),
                params![rule_id],
                ComboRuleRow::from_row,
            )
            .optional()?
        };
        row.map(|r| r.into_rule().map_err(RepositoryError::from))
            .transpose()
    }

    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM combo_rule", [], |row| row.get(0))?;
        Ok(n.max(0) as usize)
    }

    /// 新增或替换规则 (写入前校验)
    pub fn upsert(&self, rule: &ComboRule) -> RepositoryResult<()> {
        rule.validate()?;
        let condition_json = serde_json::to_string(&rule.condition)?;
        let action_json = serde_json::to_string(&rule.action)?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO combo_rule (
                rule_id, name, description, enabled, condition_json, action_json, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(rule_id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                enabled = excluded.enabled,
                condition_json = excluded.condition_json,
                action_json = excluded.action_json,
                updated_at = excluded.updated_at
            "#,
            params![
                rule.id,
                rule.name,
                rule.description,
                rule.enabled,
                condition_json,
                action_json,
                Utc::now().to_rfc3339(),
            ],
        )?;
        info!(rule_id = %rule.id, enabled = rule.enabled, "规则已保存");
        Ok(())
    }

    pub fn set_enabled(&self, rule_id: &str, enabled: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE combo_rule SET enabled = ?2, updated_at = ?3 WHERE rule_id = ?1",
            params![rule_id, enabled, Utc::now().to_rfc3339()],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "combo_rule".to_string(),
                id: rule_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn delete(&self, rule_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM combo_rule WHERE rule_id = ?1", params![rule_id])?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "combo_rule".to_string(),
                id: rule_id.to_string(),
            });
        }
        info!(rule_id = %rule_id, "规则已删除");
        Ok(())
    }
}
