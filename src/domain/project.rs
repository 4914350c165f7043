// ==========================================
// 家具配置报价系统 - 项目领域模型
// ==========================================
// 职责: Project / Space / FurnitureModule 聚合
// 红线: 严格所有权,按 id 的 arena 存储,无反向指针
// 红线: 删除空间级联删除其模块,模块与空间不得脱离项目存在
// ==========================================

use crate::domain::types::{ModuleType, PanelTarget, ProjectStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// 项目聚合错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectError {
    #[error("空间不存在: {0}")]
    SpaceNotFound(String),

    #[error("模块不存在: {0}")]
    ModuleNotFound(String),

    #[error("模块ID重复: {0}")]
    DuplicateModuleId(String),

    #[error("尺寸无效 ({entity}): {message}")]
    InvalidDimensions { entity: String, message: String },
}

// ==========================================
// 项目尺寸与墙面
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub name: String,
    pub length_mm: f64,
    pub height_mm: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectDimensions {
    pub width_mm: f64,
    pub height_mm: f64,
    pub depth_mm: f64,
    #[serde(default)]
    pub walls: Vec<Wall>,
}

// ==========================================
// 选择项
// ==========================================

/// 加工选择
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSelection {
    pub processing_id: String,
    #[serde(default)]
    pub target: PanelTarget,
    /// 仅按件计价时使用 (缺省 1)
    #[serde(default)]
    pub quantity: Option<u32>,
}

impl ProcessingSelection {
    pub fn body(processing_id: impl Into<String>) -> Self {
        Self {
            processing_id: processing_id.into(),
            target: PanelTarget::Body,
            quantity: None,
        }
    }

    pub fn front(processing_id: impl Into<String>) -> Self {
        Self {
            processing_id: processing_id.into(),
            target: PanelTarget::Front,
            quantity: None,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }
}

/// 配件选择
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessorySelection {
    pub accessory_id: String,
    pub quantity: u32,
}

impl AccessorySelection {
    pub fn new(accessory_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            accessory_id: accessory_id.into(),
            quantity,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x_mm: f64,
    pub y_mm: f64,
    pub z_mm: f64,
}

// ==========================================
// FurnitureModule - 柜体模块 (即组装器的输入草稿)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureModule {
    pub id: String,
    #[serde(default)]
    pub space_id: String,
    /// 创建顺序 (由 Project 分配,单调递增)
    #[serde(default)]
    pub sequence: u64,
    pub module_type: ModuleType,
    #[serde(default)]
    pub name: String,
    pub width_mm: f64,
    pub height_mm: f64,
    pub depth_mm: f64,
    pub body_material_id: String,
    #[serde(default)]
    pub front_material_id: Option<String>,
    #[serde(default)]
    pub processing: Vec<ProcessingSelection>,
    #[serde(default)]
    pub accessories: Vec<AccessorySelection>,
    #[serde(default)]
    pub position: Position,
    /// 绕竖轴旋转角度 (度)
    #[serde(default)]
    pub rotation_deg: f64,
}

impl FurnitureModule {
    /// 创建空模块草稿 (id/space/sequence 由 Project::add_module 分配)
    pub fn new(
        module_type: ModuleType,
        width_mm: f64,
        height_mm: f64,
        depth_mm: f64,
        body_material_id: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            space_id: String::new(),
            sequence: 0,
            module_type,
            name: String::new(),
            width_mm,
            height_mm,
            depth_mm,
            body_material_id: body_material_id.into(),
            front_material_id: None,
            processing: Vec::new(),
            accessories: Vec::new(),
            position: Position::default(),
            rotation_deg: 0.0,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_front(mut self, front_material_id: impl Into<String>) -> Self {
        self.front_material_id = Some(front_material_id.into());
        self
    }

    pub fn with_processing(mut self, selection: ProcessingSelection) -> Self {
        self.processing.push(selection);
        self
    }

    pub fn with_accessory(mut self, accessory_id: impl Into<String>, quantity: u32) -> Self {
        self.accessories
            .push(AccessorySelection::new(accessory_id, quantity));
        self
    }
}

// ==========================================
// Space - 空间
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub width_mm: f64,
    pub height_mm: f64,
    pub depth_mm: f64,
    pub include_pipe: bool,
    pub include_faucets: bool,
    pub include_cornice: bool,
    /// 本空间拥有的模块 (按加入顺序)
    #[serde(default)]
    pub module_ids: Vec<String>,
}

/// 创建/修改空间的输入
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceDraft {
    pub name: String,
    pub width_mm: f64,
    pub height_mm: f64,
    pub depth_mm: f64,
    #[serde(default)]
    pub include_pipe: bool,
    #[serde(default)]
    pub include_faucets: bool,
    #[serde(default)]
    pub include_cornice: bool,
}

fn check_dimensions(entity: &str, w: f64, h: f64, d: f64) -> Result<(), ProjectError> {
    for (label, v) in [("width_mm", w), ("height_mm", h), ("depth_mm", d)] {
        if !v.is_finite() || v <= 0.0 {
            return Err(ProjectError::InvalidDimensions {
                entity: entity.to_string(),
                message: format!("{}={} 必须为正数", label, v),
            });
        }
    }
    Ok(())
}

// ==========================================
// Project - 项目 (根聚合)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub project_type: String,
    #[serde(default)]
    pub sub_type: Option<String>,
    pub status: ProjectStatus,
    #[serde(default)]
    pub dimensions: ProjectDimensions,
    /// 自由参数 (前端配置项等)
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,

    // ===== arena 存储 =====
    #[serde(default)]
    spaces: BTreeMap<String, Space>,
    #[serde(default)]
    space_order: Vec<String>,
    #[serde(default)]
    modules: BTreeMap<String, FurnitureModule>,
    #[serde(default)]
    next_sequence: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// 创建空项目 (草稿状态)
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        project_type: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: name.into(),
            project_type: project_type.into(),
            sub_type: None,
            status: ProjectStatus::Draft,
            dimensions: ProjectDimensions::default(),
            parameters: BTreeMap::new(),
            spaces: BTreeMap::new(),
            space_order: Vec::new(),
            modules: BTreeMap::new(),
            next_sequence: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // ==========================================
    // 空间操作
    // ==========================================

    /// 新增空间,返回空间ID
    pub fn add_space(&mut self, draft: SpaceDraft) -> Result<String, ProjectError> {
        check_dimensions("space", draft.width_mm, draft.height_mm, draft.depth_mm)?;

        let space_id = Uuid::new_v4().to_string();
        let space = Space {
            id: space_id.clone(),
            project_id: self.id.clone(),
            name: draft.name,
            width_mm: draft.width_mm,
            height_mm: draft.height_mm,
            depth_mm: draft.depth_mm,
            include_pipe: draft.include_pipe,
            include_faucets: draft.include_faucets,
            include_cornice: draft.include_cornice,
            module_ids: Vec::new(),
        };
        self.spaces.insert(space_id.clone(), space);
        self.space_order.push(space_id.clone());
        self.touch();
        Ok(space_id)
    }

    /// 修改空间属性 (模块归属不变)
    pub fn update_space(&mut self, space_id: &str, draft: SpaceDraft) -> Result<(), ProjectError> {
        check_dimensions("space", draft.width_mm, draft.height_mm, draft.depth_mm)?;
        let space = self
            .spaces
            .get_mut(space_id)
            .ok_or_else(|| ProjectError::SpaceNotFound(space_id.to_string()))?;
        space.name = draft.name;
        space.width_mm = draft.width_mm;
        space.height_mm = draft.height_mm;
        space.depth_mm = draft.depth_mm;
        space.include_pipe = draft.include_pipe;
        space.include_faucets = draft.include_faucets;
        space.include_cornice = draft.include_cornice;
        self.touch();
        Ok(())
    }

    /// 删除空间并级联删除其模块
    ///
    /// # 返回
    /// 被级联删除的模块ID
    pub fn remove_space(&mut self, space_id: &str) -> Result<Vec<String>, ProjectError> {
        let space = self
            .spaces
            .remove(space_id)
            .ok_or_else(|| ProjectError::SpaceNotFound(space_id.to_string()))?;
        self.space_order.retain(|id| id != space_id);
        for module_id in &space.module_ids {
            self.modules.remove(module_id);
        }
        self.touch();
        Ok(space.module_ids)
    }

    pub fn space(&self, space_id: &str) -> Option<&Space> {
        self.spaces.get(space_id)
    }

    /// 按创建顺序返回空间
    pub fn spaces(&self) -> Vec<&Space> {
        self.space_order
            .iter()
            .filter_map(|id| self.spaces.get(id))
            .collect()
    }

    // ==========================================
    // 模块操作
    // ==========================================

    /// 在空间中新增模块
    ///
    /// 分配 id (若草稿未带)、space_id 与创建序号
    pub fn add_module(
        &mut self,
        space_id: &str,
        mut module: FurnitureModule,
    ) -> Result<String, ProjectError> {
        if !self.spaces.contains_key(space_id) {
            return Err(ProjectError::SpaceNotFound(space_id.to_string()));
        }
        if module.id.trim().is_empty() {
            module.id = Uuid::new_v4().to_string();
        }
        if self.modules.contains_key(&module.id) {
            return Err(ProjectError::DuplicateModuleId(module.id));
        }

        module.space_id = space_id.to_string();
        module.sequence = self.next_sequence;
        self.next_sequence += 1;

        let module_id = module.id.clone();
        if let Some(space) = self.spaces.get_mut(space_id) {
            space.module_ids.push(module_id.clone());
        }
        self.modules.insert(module_id.clone(), module);
        self.touch();
        Ok(module_id)
    }

    /// 修改模块选择 (id / space_id / sequence 不可被修改)
    pub fn update_module<F>(&mut self, module_id: &str, mutate: F) -> Result<(), ProjectError>
    where
        F: FnOnce(&mut FurnitureModule),
    {
        let module = self
            .modules
            .get_mut(module_id)
            .ok_or_else(|| ProjectError::ModuleNotFound(module_id.to_string()))?;
        let (id, space_id, sequence) = (module.id.clone(), module.space_id.clone(), module.sequence);
        mutate(module);
        module.id = id;
        module.space_id = space_id;
        module.sequence = sequence;
        self.touch();
        Ok(())
    }

    pub fn remove_module(&mut self, module_id: &str) -> Result<FurnitureModule, ProjectError> {
        let module = self
            .modules
            .remove(module_id)
            .ok_or_else(|| ProjectError::ModuleNotFound(module_id.to_string()))?;
        if let Some(space) = self.spaces.get_mut(&module.space_id) {
            space.module_ids.retain(|id| id != module_id);
        }
        self.touch();
        Ok(module)
    }

    pub fn module(&self, module_id: &str) -> Option<&FurnitureModule> {
        self.modules.get(module_id)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// 按创建顺序返回全部模块
    pub fn modules_in_creation_order(&self) -> Vec<&FurnitureModule> {
        let mut modules: Vec<&FurnitureModule> = self.modules.values().collect();
        modules.sort_by_key(|m| m.sequence);
        modules
    }

    pub fn space_modules(&self, space_id: &str) -> Result<Vec<&FurnitureModule>, ProjectError> {
        let space = self
            .spaces
            .get(space_id)
            .ok_or_else(|| ProjectError::SpaceNotFound(space_id.to_string()))?;
        Ok(space
            .module_ids
            .iter()
            .filter_map(|id| self.modules.get(id))
            .collect())
    }
}
