// ==========================================
// 家具配置报价系统 - 默认组合规则
// ==========================================
// 规则表为空时写入; 之后全部可由规则管理界面启停/修改
// ==========================================

use crate::domain::rule::{ComboRule, RuleAction, RuleCondition};
use crate::domain::types::{
    AccessoryType, ConflictSeverity, MaterialType, ModuleType, ProcessingType,
};

/// 默认规则 (rule_id 升序)
pub fn default_rules() -> Vec<ComboRule> {
    let glass = || RuleCondition::has_material(MaterialType::Glass);

    vec![
        ComboRule::new(
            "R001",
            "推弹系统不装拉手",
            RuleCondition::has_accessory(AccessoryType::PushSystem),
            RuleAction::ForbidAccessory {
                accessory_type: AccessoryType::Handle,
            },
        )
        .with_description("选择推弹 (push-to-open) 后自动移除拉手"),
        ComboRule::new(
            "R002",
            "玻璃不封边",
            glass(),
            RuleAction::ForbidProcessing {
                processing_type: ProcessingType::EdgeBanding,
            },
        ),
        ComboRule::new(
            "R003",
            "玻璃不做 CNC",
            glass(),
            RuleAction::ForbidProcessing {
                processing_type: ProcessingType::Cnc,
            },
        ),
        ComboRule::new(
            "R004",
            "玻璃不喷漆",
            glass(),
            RuleAction::ForbidProcessing {
                processing_type: ProcessingType::Painting,
            },
        ),
        ComboRule::new(
            "R005",
            "玻璃需玻璃加工",
            glass(),
            RuleAction::RequireProcessing {
                processing_type: ProcessingType::GlassProcessing,
            },
        )
        .with_description("玻璃门板只允许玻璃类加工 (磨边/钢化)"),
        ComboRule::new(
            "R006",
            "抽屉柜需滑轨",
            RuleCondition::module_type_is(ModuleType::DrawerUnit),
            RuleAction::RequireAccessory {
                accessory_type: AccessoryType::DrawerSlide,
            },
        ),
        ComboRule::new(
            "R007",
            "开放层架不装铰链",
            RuleCondition::module_type_is(ModuleType::OpenShelf),
            RuleAction::ForbidAccessory {
                accessory_type: AccessoryType::Hinge,
            },
        ),
        ComboRule::new(
            "R008",
            "非 MDF 板材不可喷漆",
            RuleCondition::all(vec![
                RuleCondition::has_processing(ProcessingType::Painting),
                RuleCondition::negate(RuleCondition::any(vec![
                    RuleCondition::has_material(MaterialType::Mdf),
                    RuleCondition::has_material(MaterialType::MdfAgt),
                ])),
            ]),
            RuleAction::FlagConflict {
                severity: ConflictSeverity::Blocking,
                message: "喷漆只适用于 MDF 系列板材".to_string(),
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rule_audit::RuleSetAuditor;
    use crate::engine::rule_set::ComboRuleSet;

    #[test]
    fn test_default_rules_are_valid_and_unique() {
        let rules = default_rules();
        let set = ComboRuleSet::new(rules.clone()).unwrap();
        assert_eq!(set.snapshot().len(), rules.len());
        assert!(rules.iter().all(|r| r.enabled));
    }

    #[test]
    fn test_default_rules_do_not_contradict_each_other() {
        assert!(RuleSetAuditor::new().audit(&default_rules()).is_empty());
    }
}
