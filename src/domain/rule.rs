// ==========================================
// 家具配置报价系统 - 组合规则领域模型
// ==========================================
// 职责: 规则以数据表达 (条件/动作均为带标签枚举)
// 红线: 规则不含可执行逻辑,可由非技术人员维护与启停
// ==========================================

use crate::domain::types::{AccessoryType, ConflictSeverity, MaterialType, ModuleType, ProcessingType};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 规则数据错误 (只有畸形输入才是硬失败)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("规则数据畸形 (rule_id={rule_id}): {message}")]
    Malformed { rule_id: String, message: String },

    #[error("规则ID为空")]
    EmptyRuleId,

    #[error("规则ID重复: {0}")]
    DuplicateRuleId(String),

    #[error("规则不存在: {0}")]
    NotFound(String),
}

// ==========================================
// RuleCondition - 规则条件
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCondition {
    /// 柜体板或门板为该类型
    HasMaterialType { material_type: MaterialType },
    /// 已选 (或已被要求) 该类型配件
    HasAccessoryType { accessory_type: AccessoryType },
    /// 已选 (或已被要求) 该类型加工
    HasProcessingType { processing_type: ProcessingType },
    ModuleTypeIs { module_type: ModuleType },
    And { conditions: Vec<RuleCondition> },
    Or { conditions: Vec<RuleCondition> },
    Not { condition: Box<RuleCondition> },
}

impl RuleCondition {
    pub fn has_material(material_type: MaterialType) -> Self {
        RuleCondition::HasMaterialType { material_type }
    }

    pub fn has_accessory(accessory_type: AccessoryType) -> Self {
        RuleCondition::HasAccessoryType { accessory_type }
    }

    pub fn has_processing(processing_type: ProcessingType) -> Self {
        RuleCondition::HasProcessingType { processing_type }
    }

    pub fn module_type_is(module_type: ModuleType) -> Self {
        RuleCondition::ModuleTypeIs { module_type }
    }

    pub fn all(conditions: Vec<RuleCondition>) -> Self {
        RuleCondition::And { conditions }
    }

    pub fn any(conditions: Vec<RuleCondition>) -> Self {
        RuleCondition::Or { conditions }
    }

    pub fn negate(condition: RuleCondition) -> Self {
        RuleCondition::Not {
            condition: Box::new(condition),
        }
    }

    /// 结构校验: 组合子不得为空
    fn validate(&self, rule_id: &str) -> Result<(), RuleError> {
        match self {
            RuleCondition::And { conditions } | RuleCondition::Or { conditions } => {
                if conditions.is_empty() {
                    return Err(RuleError::Malformed {
                        rule_id: rule_id.to_string(),
                        message: "and/or 组合条件不能为空".to_string(),
                    });
                }
                conditions.iter().try_for_each(|c| c.validate(rule_id))
            }
            RuleCondition::Not { condition } => condition.validate(rule_id),
            _ => Ok(()),
        }
    }
}

// ==========================================
// ActionTarget - 动作作用对象
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "type", rename_all = "snake_case")]
pub enum ActionTarget {
    Accessory(AccessoryType),
    Processing(ProcessingType),
}

impl fmt::Display for ActionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionTarget::Accessory(t) => write!(f, "accessory:{}", t),
            ActionTarget::Processing(t) => write!(f, "processing:{}", t),
        }
    }
}

// ==========================================
// RuleAction - 规则动作
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleAction {
    RequireAccessory { accessory_type: AccessoryType },
    ForbidAccessory { accessory_type: AccessoryType },
    RequireProcessing { processing_type: ProcessingType },
    ForbidProcessing { processing_type: ProcessingType },
    FlagConflict {
        severity: ConflictSeverity,
        message: String,
    },
}

impl RuleAction {
    /// 动作作用对象 (FlagConflict 无作用对象)
    pub fn target(&self) -> Option<ActionTarget> {
        match self {
            RuleAction::RequireAccessory { accessory_type }
            | RuleAction::ForbidAccessory { accessory_type } => {
                Some(ActionTarget::Accessory(*accessory_type))
            }
            RuleAction::RequireProcessing { processing_type }
            | RuleAction::ForbidProcessing { processing_type } => {
                Some(ActionTarget::Processing(*processing_type))
            }
            RuleAction::FlagConflict { .. } => None,
        }
    }

    pub fn is_require(&self) -> bool {
        matches!(
            self,
            RuleAction::RequireAccessory { .. } | RuleAction::RequireProcessing { .. }
        )
    }

    pub fn is_forbid(&self) -> bool {
        matches!(
            self,
            RuleAction::ForbidAccessory { .. } | RuleAction::ForbidProcessing { .. }
        )
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleAction::RequireAccessory { accessory_type } => {
                write!(f, "require accessory {}", accessory_type)
            }
            RuleAction::ForbidAccessory { accessory_type } => {
                write!(f, "forbid accessory {}", accessory_type)
            }
            RuleAction::RequireProcessing { processing_type } => {
                write!(f, "require processing {}", processing_type)
            }
            RuleAction::ForbidProcessing { processing_type } => {
                write!(f, "forbid processing {}", processing_type)
            }
            RuleAction::FlagConflict { severity, message } => {
                write!(f, "flag {}: {}", severity, message)
            }
        }
    }
}

// ==========================================
// ComboRule - 组合规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub enabled: bool,
    pub condition: RuleCondition,
    pub action: RuleAction,
}

impl ComboRule {
    /// 创建启用状态的规则
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        condition: RuleCondition,
        action: RuleAction,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            enabled: true,
            condition,
            action,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// 规则结构校验
    ///
    /// # 校验规则
    /// 1. id 非空
    /// 2. and/or 组合子非空
    /// 3. FlagConflict 的 message 非空
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.id.trim().is_empty() {
            return Err(RuleError::EmptyRuleId);
        }
        self.condition.validate(&self.id)?;
        if let RuleAction::FlagConflict { message, .. } = &self.action {
            if message.trim().is_empty() {
                return Err(RuleError::Malformed {
                    rule_id: self.id.clone(),
                    message: "冲突提示信息不能为空".to_string(),
                });
            }
        }
        Ok(())
    }
}

// ==========================================
// RuleConflict - 规则冲突记录
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// 规则 FlagConflict 动作产生
    RuleFlag,
    /// 规则集振荡,达到迭代上限 (归属规则集而非单条规则)
    RuleCycleDetected,
    /// 组装阶段库存检查产生
    Stock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConflict {
    pub kind: ConflictKind,
    /// None 表示归属整个规则集
    pub rule_id: Option<String>,
    pub rule_name: Option<String>,
    pub severity: ConflictSeverity,
    pub message: String,
}

impl RuleConflict {
    pub fn from_rule(rule: &ComboRule, severity: ConflictSeverity, message: &str) -> Self {
        Self {
            kind: ConflictKind::RuleFlag,
            rule_id: Some(rule.id.clone()),
            rule_name: Some(rule.name.clone()),
            severity,
            message: message.to_string(),
        }
    }

    pub fn cycle_detected(iterations: usize, oscillating_rules: &[String]) -> Self {
        Self {
            kind: ConflictKind::RuleCycleDetected,
            rule_id: None,
            rule_name: None,
            severity: ConflictSeverity::Blocking,
            message: format!(
                "RuleCycleDetected: 规则集在 {} 轮迭代后仍未收敛 (振荡规则: {})",
                iterations,
                oscillating_rules.join(", ")
            ),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == ConflictSeverity::Blocking
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_json_shape() {
        let rule = ComboRule::new(
            "R001",
            "push-to-open forbids handle",
            RuleCondition::has_accessory(AccessoryType::PushSystem),
            RuleAction::ForbidAccessory {
                accessory_type: AccessoryType::Handle,
            },
        );
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["condition"]["kind"], "has_accessory_type");
        assert_eq!(json["condition"]["accessory_type"], "push_system");
        assert_eq!(json["action"]["kind"], "forbid_accessory");

        let back: ComboRule = serde_json::from_value(json).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn test_unknown_enumeration_in_condition_fails_to_parse() {
        let raw = r#"{"kind":"has_material_type","material_type":"OSB"}"#;
        assert!(serde_json::from_str::<RuleCondition>(raw).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_combinator() {
        let rule = ComboRule::new(
            "R9",
            "empty",
            RuleCondition::negate(RuleCondition::all(vec![])),
            RuleAction::RequireAccessory {
                accessory_type: AccessoryType::Leg,
            },
        );
        assert!(matches!(rule.validate(), Err(RuleError::Malformed { .. })));
    }

    #[test]
    fn test_validate_rejects_empty_message_and_id() {
        let rule = ComboRule::new(
            "R10",
            "flag",
            RuleCondition::module_type_is(ModuleType::OpenShelf),
            RuleAction::FlagConflict {
                severity: ConflictSeverity::Warning,
                message: "  ".to_string(),
            },
        );
        assert!(rule.validate().is_err());

        let mut rule = rule;
        rule.id = String::new();
        assert_eq!(rule.validate(), Err(RuleError::EmptyRuleId));
    }

    #[test]
    fn test_action_target() {
        let forbid = RuleAction::ForbidProcessing {
            processing_type: ProcessingType::Painting,
        };
        assert_eq!(
            forbid.target(),
            Some(ActionTarget::Processing(ProcessingType::Painting))
        );
        assert!(forbid.is_forbid());
        assert!(!forbid.is_require());
    }
}
