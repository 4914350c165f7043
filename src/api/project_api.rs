// ==========================================
// 家具配置报价系统 - 项目 API
// ==========================================
// 职责: 项目 / 空间 / 模块 的生命周期管理
// 流程: 读取聚合 → 在聚合上修改 → 整体保存
// ==========================================

use std::sync::Arc;

use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::project::{FurnitureModule, Project, SpaceDraft};
use crate::domain::types::ProjectStatus;
use crate::repository::{ProjectRepository, ProjectSummary};

// ==========================================
// ProjectApi - 项目 API
// ==========================================
pub struct ProjectApi {
    project_repo: Arc<ProjectRepository>,
}

impl ProjectApi {
    pub fn new(project_repo: Arc<ProjectRepository>) -> Self {
        Self { project_repo }
    }

    fn load(&self, project_id: &str) -> ApiResult<Project> {
        self.project_repo
            .find_by_id(project_id)?
            .ok_or_else(|| ApiError::NotFound(format!("project(id={})不存在", project_id)))
    }

    /// 读取 → 修改 → 保存
    fn modify<T, F>(&self, project_id: &str, mutate: F) -> ApiResult<T>
    where
        F: FnOnce(&mut Project) -> ApiResult<T>,
    {
        let mut project = self.load(project_id)?;
        let out = mutate(&mut project)?;
        self.project_repo.save(&project)?;
        Ok(out)
    }

    // ==========================================
    // 项目
    // ==========================================

    pub fn create_project(
        &self,
        user_id: &str,
        name: &str,
        project_type: &str,
    ) -> ApiResult<Project> {
        if user_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("user_id 不能为空".to_string()));
        }
        if name.trim().is_empty() {
            return Err(ApiError::InvalidInput("项目名称不能为空".to_string()));
        }
        let project = Project::new(user_id, name.trim(), project_type);
        self.project_repo.save(&project)?;
        info!(project_id = %project.id, user_id = %user_id, "项目已创建");
        Ok(project)
    }

    pub fn get_project(&self, project_id: &str) -> ApiResult<Project> {
        self.load(project_id)
    }

    pub fn list_projects(&self, user_id: &str) -> ApiResult<Vec<ProjectSummary>> {
        Ok(self.project_repo.list_by_user(user_id)?)
    }

    pub fn delete_project(&self, project_id: &str) -> ApiResult<()> {
        Ok(self.project_repo.delete(project_id)?)
    }

    pub fn set_status(&self, project_id: &str, status: ProjectStatus) -> ApiResult<()> {
        self.modify(project_id, |p| {
            p.status = status;
            Ok(())
        })
    }

    // ==========================================
    // 空间
    // ==========================================

    pub fn add_space(&self, project_id: &str, draft: SpaceDraft) -> ApiResult<String> {
        self.modify(project_id, |p| Ok(p.add_space(draft)?))
    }

    pub fn update_space(&self, project_id: &str, space_id: &str, draft: SpaceDraft) -> ApiResult<()> {
        self.modify(project_id, |p| Ok(p.update_space(space_id, draft)?))
    }

    /// 删除空间 (级联删除模块)
    ///
    /// # 返回
    /// 被级联删除的模块ID
    pub fn remove_space(&self, project_id: &str, space_id: &str) -> ApiResult<Vec<String>> {
        let removed = self.modify(project_id, |p| Ok(p.remove_space(space_id)?))?;
        info!(
            project_id = %project_id,
            space_id = %space_id,
            modules = removed.len(),
            "空间已删除"
        );
        Ok(removed)
    }

    // ==========================================
    // 模块
    // ==========================================

    pub fn add_module(
        &self,
        project_id: &str,
        space_id: &str,
        module: FurnitureModule,
    ) -> ApiResult<String> {
        self.modify(project_id, |p| Ok(p.add_module(space_id, module)?))
    }

    /// 用新草稿替换模块内容 (id / 所属空间 / 创建序号保持不变)
    pub fn update_module(
        &self,
        project_id: &str,
        module_id: &str,
        draft: FurnitureModule,
    ) -> ApiResult<()> {
        self.modify(project_id, |p| {
            Ok(p.update_module(module_id, move |m| *m = draft)?)
        })
    }

    pub fn remove_module(&self, project_id: &str, module_id: &str) -> ApiResult<FurnitureModule> {
        self.modify(project_id, |p| Ok(p.remove_module(module_id)?))
    }
}
