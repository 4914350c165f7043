// ==========================================
// 家具配置报价系统 - 项目仓储
// ==========================================
// 职责: project 表的 CRUD
// 存储: 整个聚合 (空间 + 模块) 以一份 JSON 落库,空间/模块不会脱离项目存在
// ==========================================

use crate::domain::project::Project;
use crate::domain::types::ProjectStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::parse_text_column;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// 项目列表摘要 (不解析 payload)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub project_id: String,
    pub user_id: String,
    pub name: String,
    pub project_type: String,
    pub status: ProjectStatus,
    pub updated_at: String,
}

// ==========================================
// ProjectRepository - 项目仓储
// ==========================================
pub struct ProjectRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProjectRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 保存项目 (存在则覆盖)
    ///
    /// project_id / user_id 为空时拒绝写入
    pub fn save(&self, project: &Project) -> RepositoryResult<()> {
        for (field, value) in [("project_id", &project.id), ("user_id", &project.user_id)] {
            if value.trim().is_empty() {
                return Err(RepositoryError::ValidationError(format!(
                    "项目{}不能为空",
                    field
                )));
            }
        }
        let payload = serde_json::to_string(project)?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO project (
                project_id, user_id, name, project_type, status, payload_json,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(project_id) DO UPDATE SET
                user_id = excluded.user_id,
                name = excluded.name,
                project_type = excluded.project_type,
                status = excluded.status,
                payload_json = excluded.payload_json,
                updated_at = excluded.updated_at
            "#,
            params![
                project.id,
                project.user_id,
                project.name,
                project.project_type,
                project.status.as_str(),
                payload,
                project.created_at.to_rfc3339(),
                project.updated_at.to_rfc3339(),
            ],
        )?;
        debug!(
            project_id = %project.id,
            modules = project.module_count(),
            "项目已保存"
        );
        Ok(())
    }

    pub fn find_by_id(&self, project_id: &str) -> RepositoryResult<Option<Project>> {
        let payload: Option<String> = {
            let conn = self.get_conn()?;
            conn.query_row(
                "SELECT payload_json FROM project WHERE project_id = ?1",
                params![project_id],
                |row| row.get(0),
            )
            .optional()?
        };
        let Some(payload) = payload else {
            return Ok(None);
        };
        let project: Project = serde_json::from_str(&payload)?;
        // payload 内的 id 必须与行主键一致
        if project.id != project_id {
            return Err(RepositoryError::ValidationError(format!(
                "项目payload ID不一致: row={}, payload={}",
                project_id, project.id
            )));
        }
        Ok(Some(project))
    }

    /// 按用户列出项目 (最近修改在前)
    pub fn list_by_user(&self, user_id: &str) -> RepositoryResult<Vec<ProjectSummary>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT project_id, user_id, name, project_type, status, updated_at
            FROM project
            WHERE user_id = ?1
            ORDER BY updated_at DESC, project_id
            "#,
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(ProjectSummary {
                project_id: row.get(0)?,
                user_id: row.get(1)?,
                name: row.get(2)?,
                project_type: row.get(3)?,
                status: parse_text_column(row, 4)?,
                updated_at: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn delete(&self, project_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM project WHERE project_id = ?1",
            params![project_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "project".to_string(),
                id: project_id.to_string(),
            });
        }
        info!(project_id = %project_id, "项目已删除");
        Ok(())
    }
}
