// ==========================================
// 家具配置报价系统 - 规则评估引擎
// ==========================================
// 每轮: 以本轮开始时的状态判断全部条件 → 收集动作 → 按目标归并 → 应用
// 停止: 某轮无任何状态变化 (收敛),或达到迭代上限 (振荡)
// ==========================================

use crate::domain::rule::{ActionTarget, ComboRule, ConflictKind, RuleAction, RuleConflict, RuleError};
use crate::engine::composer::NormalizedModuleState;
use crate::engine::rule_set::RuleSetSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use super::condition::condition_holds;

// ==========================================
// 评估结果
// ==========================================

/// 实际改变了状态的动作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedAction {
    /// 第几轮迭代 (从 1 开始)
    pub iteration: usize,
    pub rule_id: String,
    pub rule_name: String,
    pub action: RuleAction,
    /// forbid 动作移除的具体目录条目ID
    pub removed_item_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub next_state: NormalizedModuleState,
    pub applied_actions: Vec<AppliedAction>,
    /// 本次评估产生的冲突 (规则标记 + 振荡检测),组装阶段的库存冲突不在此列
    pub conflicts: Vec<RuleConflict>,
    pub iterations: usize,
    pub converged: bool,
}

impl EvaluationResult {
    pub fn has_blocking_conflict(&self) -> bool {
        self.conflicts.iter().any(RuleConflict::is_blocking)
    }

    pub fn cycle_detected(&self) -> bool {
        self.conflicts
            .iter()
            .any(|c| c.kind == ConflictKind::RuleCycleDetected)
    }
}

// ==========================================
// RuleEvaluator - 规则评估引擎
// ==========================================
// 无状态引擎,规则通过参数传入
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// 以规则集快照评估
    pub fn evaluate_snapshot(
        &self,
        state: &NormalizedModuleState,
        snapshot: &RuleSetSnapshot,
    ) -> Result<EvaluationResult, RuleError> {
        self.evaluate(state, snapshot.iter())
    }

    /// 评估模块状态
    ///
    /// # 参数
    /// - `state`: 组装器输出 (或上一次评估的 next_state)
    /// - `rules`: 规则 (输入顺序不影响结果)
    ///
    /// # 返回
    /// - Ok(EvaluationResult): 所有业务结果 (含冲突) 均在其中
    /// - Err(RuleError): 启用规则畸形或 rule_id 重复
    pub fn evaluate<'a, I>(
        &self,
        state: &NormalizedModuleState,
        rules: I,
    ) -> Result<EvaluationResult, RuleError>
    where
        I: IntoIterator<Item = &'a ComboRule>,
    {
        let enabled = Self::prepare_rules(rules)?;
        let cap = enabled.len() + 1;

        debug!(
            module_id = %state.module_id,
            enabled_rules = enabled.len(),
            cap = cap,
            "开始规则评估"
        );

        // 丢弃上一轮评估留下的规则冲突,保留组装阶段的库存冲突
        let mut current = state.clone();
        current
            .conflicts
            .retain(|c| c.kind == ConflictKind::Stock);

        let mut applied_actions = Vec::new();
        let mut converged = false;
        let mut iterations = 0;
        let mut last_round_rules: Vec<String> = Vec::new();

        for iteration in 1..=cap {
            iterations = iteration;
            let decisions = Self::collect_decisions(&enabled, &current);

            let mut changed = false;
            last_round_rules.clear();
            for rule in decisions {
                if let Some(removed_item_ids) = apply_action(&mut current, &rule.action) {
                    debug!(
                        module_id = %current.module_id,
                        iteration = iteration,
                        rule_id = %rule.id,
                        action = %rule.action,
                        "规则动作已应用"
                    );
                    last_round_rules.push(rule.id.clone());
                    applied_actions.push(AppliedAction {
                        iteration,
                        rule_id: rule.id.clone(),
                        rule_name: rule.name.clone(),
                        action: rule.action.clone(),
                        removed_item_ids,
                    });
                    changed = true;
                }
            }

            if !changed {
                converged = true;
                break;
            }
        }

        let mut conflicts: Vec<RuleConflict> = enabled
            .iter()
            .filter_map(|rule| match &rule.action {
                RuleAction::FlagConflict { severity, message }
                    if condition_holds(&rule.condition, &current) =>
                {
                    Some(RuleConflict::from_rule(rule, *severity, message))
                }
                _ => None,
            })
            .collect();

        if !converged {
            warn!(
                module_id = %current.module_id,
                iterations = iterations,
                rules = ?last_round_rules,
                "规则集振荡,达到迭代上限"
            );
            conflicts.push(RuleConflict::cycle_detected(iterations, &last_round_rules));
        }

        current.conflicts.extend(conflicts.iter().cloned());

        info!(
            module_id = %current.module_id,
            iterations = iterations,
            applied = applied_actions.len(),
            conflicts = conflicts.len(),
            converged = converged,
            "规则评估完成"
        );

        Ok(EvaluationResult {
            next_state: current,
            applied_actions,
            conflicts,
            iterations,
            converged,
        })
    }

    /// 过滤启用规则、校验并按 rule_id 升序排列
    fn prepare_rules<'a, I>(rules: I) -> Result<Vec<&'a ComboRule>, RuleError>
    where
        I: IntoIterator<Item = &'a ComboRule>,
    {
        let mut enabled: Vec<&ComboRule> = rules.into_iter().filter(|r| r.enabled).collect();
        enabled.sort_by(|a, b| a.id.cmp(&b.id));

        let mut seen = BTreeSet::new();
        for rule in &enabled {
            rule.validate()?;
            if !seen.insert(rule.id.as_str()) {
                return Err(RuleError::DuplicateRuleId(rule.id.clone()));
            }
        }
        Ok(enabled)
    }

    /// 收集本轮成立的变更动作,同一目标只保留一条
    ///
    /// 同一目标: rule_id 小者优先,但 forbid 覆盖 require
    fn collect_decisions<'a>(
        enabled: &[&'a ComboRule],
        state: &NormalizedModuleState,
    ) -> Vec<&'a ComboRule> {
        let mut by_target: BTreeMap<ActionTarget, &'a ComboRule> = BTreeMap::new();
        for &rule in enabled {
            let Some(target) = rule.action.target() else {
                continue;
            };
            if !condition_holds(&rule.condition, state) {
                continue;
            }
            by_target
                .entry(target)
                .and_modify(|winner| {
                    if rule.action.is_forbid() && winner.action.is_require() {
                        *winner = rule;
                    }
                })
                .or_insert(rule);
        }

        let mut decisions: Vec<&ComboRule> = by_target.into_values().collect();
        decisions.sort_by(|a, b| a.id.cmp(&b.id));
        decisions
    }
}

/// 应用单个变更动作
///
/// # 返回
/// - Some(removed_ids): 状态已改变
/// - None: 无变化 (require 已满足 / forbid 无可移除项)
fn apply_action(state: &mut NormalizedModuleState, action: &RuleAction) -> Option<Vec<String>> {
    match action {
        RuleAction::RequireAccessory { accessory_type } => {
            if state.has_accessory_type(*accessory_type) {
                return None;
            }
            state.required_accessory_types.insert(*accessory_type);
            Some(Vec::new())
        }
        RuleAction::RequireProcessing { processing_type } => {
            if state.has_processing_type(*processing_type) {
                return None;
            }
            state.required_processing_types.insert(*processing_type);
            Some(Vec::new())
        }
        RuleAction::ForbidAccessory { accessory_type } => {
            let was_required = state.required_accessory_types.remove(accessory_type);
            let mut removed = Vec::new();
            state.accessories.retain(|a| {
                if a.item.accessory_type == *accessory_type {
                    removed.push(a.item.id.clone());
                    false
                } else {
                    true
                }
            });
            (was_required || !removed.is_empty()).then_some(removed)
        }
        RuleAction::ForbidProcessing { processing_type } => {
            let was_required = state.required_processing_types.remove(processing_type);
            let mut removed = Vec::new();
            state.processing.retain(|p| {
                if p.option.processing_type == *processing_type {
                    removed.push(p.option.id.clone());
                    false
                } else {
                    true
                }
            });
            (was_required || !removed.is_empty()).then_some(removed)
        }
        RuleAction::FlagConflict { .. } => None,
    }
}

/// 以默认评估器评估
pub fn evaluate(
    state: &NormalizedModuleState,
    rules: &[ComboRule],
) -> Result<EvaluationResult, RuleError> {
    RuleEvaluator::new().evaluate(state, rules)
}
