use crate::domain::rule::RuleCondition;
use crate::engine::composer::NormalizedModuleState;

/// 判断条件在当前模块状态下是否成立
///
/// 配件/加工类型条件同时考虑具体选择与规则已提出的要求
pub fn condition_holds(condition: &RuleCondition, state: &NormalizedModuleState) -> bool {
    match condition {
        RuleCondition::HasMaterialType { material_type } => state.has_material_type(*material_type),
        RuleCondition::HasAccessoryType { accessory_type } => {
            state.has_accessory_type(*accessory_type)
        }
        RuleCondition::HasProcessingType { processing_type } => {
            state.has_processing_type(*processing_type)
        }
        RuleCondition::ModuleTypeIs { module_type } => state.module_type == *module_type,
        RuleCondition::And { conditions } => conditions.iter().all(|c| condition_holds(c, state)),
        RuleCondition::Or { conditions } => conditions.iter().any(|c| condition_holds(c, state)),
        RuleCondition::Not { condition } => !condition_holds(condition, state),
    }
}
