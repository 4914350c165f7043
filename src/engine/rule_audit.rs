// ==========================================
// 家具配置报价系统 - 规则集审计
// ==========================================
// 职责: 静态分析启用规则,列出可能互相抵触的规则对 (供规则管理界面展示)
// 红线: 只读、只提示; 是否真正冲突仍以评估期结果为准
// ==========================================

use crate::domain::rule::{ActionTarget, ComboRule, RuleCondition};
use crate::domain::types::ModuleType;
use crate::engine::rule_set::RuleSetSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOverlapKind {
    /// 一条规则要求某类型,另一条规则禁止同一类型
    RequireForbid,
    /// 条件与动作完全相同
    Duplicate,
}

/// 审计发现
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOverlap {
    pub kind: RuleOverlapKind,
    /// 按 rule_id 升序的两条规则
    pub rule_ids: [String; 2],
    pub target: Option<ActionTarget>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSetAuditor;

impl RuleSetAuditor {
    pub fn new() -> Self {
        Self
    }

    pub fn audit_snapshot(&self, snapshot: &RuleSetSnapshot) -> Vec<RuleOverlap> {
        self.audit(snapshot.iter())
    }

    /// 审计启用规则 (禁用规则不参与)
    pub fn audit<'a, I>(&self, rules: I) -> Vec<RuleOverlap>
    where
        I: IntoIterator<Item = &'a ComboRule>,
    {
        let mut enabled: Vec<&ComboRule> = rules.into_iter().filter(|r| r.enabled).collect();
        enabled.sort_by(|a, b| a.id.cmp(&b.id));

        let mut findings = Vec::new();

        let mut requires: BTreeMap<ActionTarget, Vec<&ComboRule>> = BTreeMap::new();
        let mut forbids: BTreeMap<ActionTarget, Vec<&ComboRule>> = BTreeMap::new();
        for rule in &enabled {
            if let Some(target) = rule.action.target() {
                if rule.action.is_require() {
                    requires.entry(target).or_default().push(rule);
                } else {
                    forbids.entry(target).or_default().push(rule);
                }
            }
        }
        for (target, requirers) in &requires {
            let Some(forbidders) = forbids.get(target) else {
                continue;
            };
            for req in requirers {
                for fb in forbidders {
                    if disjoint(&req.condition, &fb.condition) {
                        continue;
                    }
                    findings.push(RuleOverlap {
                        kind: RuleOverlapKind::RequireForbid,
                        rule_ids: ordered_pair(&req.id, &fb.id),
                        target: Some(*target),
                        message: format!(
                            "规则 {} 要求 {},规则 {} 禁止 {}; 条件同时成立时禁止优先",
                            req.id, target, fb.id, target
                        ),
                    });
                }
            }
        }

        for (i, a) in enabled.iter().enumerate() {
            for b in &enabled[i + 1..] {
                if a.condition == b.condition && a.action == b.action {
                    findings.push(RuleOverlap {
                        kind: RuleOverlapKind::Duplicate,
                        rule_ids: ordered_pair(&a.id, &b.id),
                        target: a.action.target(),
                        message: format!("规则 {} 与 {} 条件和动作完全相同", a.id, b.id),
                    });
                }
            }
        }

        findings.sort_by(|x, y| x.rule_ids.cmp(&y.rule_ids).then(x.kind_rank().cmp(&y.kind_rank())));
        findings
    }
}

impl RuleOverlap {
    fn kind_rank(&self) -> u8 {
        match self.kind {
            RuleOverlapKind::RequireForbid => 0,
            RuleOverlapKind::Duplicate => 1,
        }
    }
}

/// 条件限定的柜体类型集合; None 表示不限定
fn module_types(condition: &RuleCondition) -> Option<BTreeSet<ModuleType>> {
    match condition {
        RuleCondition::ModuleTypeIs { module_type } => Some(BTreeSet::from([*module_type])),
        RuleCondition::And { conditions } => conditions
            .iter()
            .filter_map(module_types)
            .reduce(|a, b| a.intersection(&b).copied().collect()),
        RuleCondition::Or { conditions } if !conditions.is_empty() => conditions
            .iter()
            .map(module_types)
            .try_fold(BTreeSet::new(), |mut acc, set| {
                acc.extend(set?);
                Some(acc)
            }),
        _ => None,
    }
}

/// 两个条件限定的柜体类型无交集时不可能同时成立
fn disjoint(a: &RuleCondition, b: &RuleCondition) -> bool {
    match (module_types(a), module_types(b)) {
        (Some(x), Some(y)) => x.is_disjoint(&y),
        _ => false,
    }
}

fn ordered_pair(a: &str, b: &str) -> [String; 2] {
    if a <= b {
        [a.to_string(), b.to_string()]
    } else {
        [b.to_string(), a.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::{RuleAction, RuleCondition};
    use crate::domain::types::{AccessoryType, ModuleType};

    fn rule(id: &str, condition: RuleCondition, action: RuleAction) -> ComboRule {
        ComboRule::new(id, id, condition, action)
    }

    #[test]
    fn test_require_forbid_pair_reported() {
        let rules = vec![
            rule(
                "R2",
                RuleCondition::module_type_is(ModuleType::BaseCabinet),
                RuleAction::RequireAccessory {
                    accessory_type: AccessoryType::Handle,
                },
            ),
            rule(
                "R1",
                RuleCondition::has_accessory(AccessoryType::PushSystem),
                RuleAction::ForbidAccessory {
                    accessory_type: AccessoryType::Handle,
                },
            ),
        ];
        let findings = RuleSetAuditor::new().audit(&rules);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, RuleOverlapKind::RequireForbid);
        assert_eq!(findings[0].rule_ids, ["R1".to_string(), "R2".to_string()]);
        assert_eq!(
            findings[0].target,
            Some(ActionTarget::Accessory(AccessoryType::Handle))
        );
    }

    #[test]
    fn test_pairs_on_different_module_types_not_reported() {
        let require = RuleAction::RequireAccessory {
            accessory_type: AccessoryType::Handle,
        };
        let forbid = RuleAction::ForbidAccessory {
            accessory_type: AccessoryType::Handle,
        };
        let rules = vec![
            rule(
                "R1",
                RuleCondition::module_type_is(ModuleType::BaseCabinet),
                require.clone(),
            ),
            rule(
                "R2",
                RuleCondition::any(vec![
                    RuleCondition::module_type_is(ModuleType::OpenShelf),
                    RuleCondition::module_type_is(ModuleType::WallCabinet),
                ]),
                forbid.clone(),
            ),
            rule(
                "R3",
                RuleCondition::all(vec![
                    RuleCondition::module_type_is(ModuleType::BaseCabinet),
                    RuleCondition::has_accessory(AccessoryType::PushSystem),
                ]),
                forbid,
            ),
        ];
        let findings = RuleSetAuditor::new().audit(&rules);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_ids, ["R1".to_string(), "R3".to_string()]);

        let a = RuleCondition::module_type_is(ModuleType::TallCabinet);
        let b = RuleCondition::negate(RuleCondition::module_type_is(ModuleType::TallCabinet));
        assert!(!disjoint(&a, &b));
    }

    #[test]
    fn test_disabled_rules_ignored_and_duplicates_found() {
        let forbid = RuleAction::ForbidAccessory {
            accessory_type: AccessoryType::Hinge,
        };
        let cond = RuleCondition::module_type_is(ModuleType::OpenShelf);
        let rules = vec![
            rule("A", cond.clone(), forbid.clone()),
            rule("B", cond.clone(), forbid.clone()),
            rule(
                "C",
                cond,
                RuleAction::RequireAccessory {
                    accessory_type: AccessoryType::Hinge,
                },
            )
            .disabled(),
        ];
        let findings = RuleSetAuditor::new().audit(&rules);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, RuleOverlapKind::Duplicate);
    }
}
