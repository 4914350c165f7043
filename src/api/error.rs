// ==========================================
// 家具配置报价系统 - API层错误类型
// ==========================================
// 职责: 统一 API 层错误,将仓储/引擎/导入错误转换为可展示的错误
// 红线: 每个错误都必须能定位到具体模块、规则或选择
// ==========================================

use crate::domain::project::ProjectError;
use crate::domain::rule::RuleError;
use crate::engine::catalog_store::CatalogError;
use crate::engine::composer::CompositionError;
use crate::engine::orchestrator::EngineError;
use crate::importer::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    /// 模块组装失败 (逐模块列出)
    #[error("{} 个模块组装失败", .0.len())]
    Composition(Vec<CompositionError>),

    #[error("规则数据无效: {0}")]
    RuleInvalid(String),

    #[error("目录数据无效: {0}")]
    CatalogInvalid(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("配置读取失败: {0}")]
    ConfigError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::SerializationError(msg) => ApiError::InternalError(msg),
            RepositoryError::Rule(e) => ApiError::from(e),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从引擎错误转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Composition(errors) => ApiError::Composition(errors),
            EngineError::Rule(e) => ApiError::from(e),
            // 上游不变量被破坏,属于内部错误
            EngineError::Pricing(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

impl From<CompositionError> for ApiError {
    fn from(err: CompositionError) -> Self {
        ApiError::Composition(vec![err])
    }
}

impl From<RuleError> for ApiError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::NotFound(id) => ApiError::NotFound(format!("规则(id={})不存在", id)),
            other => ApiError::RuleInvalid(other.to_string()),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::CatalogInvalid(err.to_string())
    }
}

impl From<ProjectError> for ApiError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::SpaceNotFound(_) | ProjectError::ModuleNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            ProjectError::DuplicateModuleId(_) => ApiError::BusinessRuleViolation(err.to_string()),
            ProjectError::InvalidDimensions { .. } => ApiError::InvalidInput(err.to_string()),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(e) => ApiError::from(e),
            ImportError::Catalog(e) => ApiError::from(e),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
