// ==========================================
// 家具配置报价系统 - 组合规则 API
// ==========================================
// 职责: 规则 CRUD、启停 (唯一写入入口)、默认规则初始化、规则冲突审计
// 红线: 先写库,再写内存规则集; 内存规则集的每次写入都是原子替换
// ==========================================

use std::sync::Arc;

use tracing::{debug, info};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::rule::{ComboRule, RuleError};
use crate::engine::default_rules::default_rules;
use crate::engine::rule_audit::{RuleOverlap, RuleSetAuditor};
use crate::engine::rule_set::ComboRuleSet;
use crate::repository::ComboRuleRepository;

// ==========================================
// RuleApi - 组合规则 API
// ==========================================
pub struct RuleApi {
    rule_repo: Arc<ComboRuleRepository>,
    rule_set: Arc<ComboRuleSet>,
    auditor: RuleSetAuditor,
}

impl RuleApi {
    pub fn new(rule_repo: Arc<ComboRuleRepository>, rule_set: Arc<ComboRuleSet>) -> Self {
        Self {
            rule_repo,
            rule_set,
            auditor: RuleSetAuditor::new(),
        }
    }

    /// 从仓储重新加载规则集
    ///
    /// # 返回
    /// 加载的规则数
    pub fn reload(&self) -> ApiResult<usize> {
        let rules = self.rule_repo.list_all()?;
        let count = rules.len();
        self.rule_set.replace_all(rules)?;
        info!(count = count, "规则集已从数据库加载");
        Ok(count)
    }

    /// 规则表为空时写入默认规则
    ///
    /// # 返回
    /// 写入的默认规则数 (表非空时为 0)
    pub fn seed_defaults(&self) -> ApiResult<usize> {
        if self.rule_repo.count()? > 0 {
            debug!("规则表非空,跳过默认规则");
            return Ok(0);
        }
        let defaults = default_rules();
        for rule in &defaults {
            self.rule_repo.upsert(rule)?;
        }
        self.reload()?;
        info!(count = defaults.len(), "默认规则已写入");
        Ok(defaults.len())
    }

    /// 全部规则 (rule_id 升序)
    pub fn list_rules(&self) -> Vec<ComboRule> {
        self.rule_set.snapshot().to_vec()
    }

    pub fn get_rule(&self, rule_id: &str) -> ApiResult<ComboRule> {
        self.rule_set
            .snapshot()
            .get(rule_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("规则(id={})不存在", rule_id)))
    }

    /// 新增或修改规则
    pub fn upsert_rule(&self, rule: ComboRule) -> ApiResult<()> {
        if rule.name.trim().is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "规则名称不能为空 (rule_id={})",
                rule.id
            )));
        }
        self.rule_repo.upsert(&rule)?;
        self.rule_set.upsert(rule)?;
        Ok(())
    }

    pub fn delete_rule(&self, rule_id: &str) -> ApiResult<()> {
        self.rule_repo.delete(rule_id)?;
        match self.rule_set.remove(rule_id) {
            Ok(_) | Err(RuleError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// 规则启停
    ///
    /// # 返回
    /// - true: 状态已改变
    /// - false: 已是目标状态
    pub fn set_rule_enabled(&self, rule_id: &str, enabled: bool) -> ApiResult<bool> {
        self.rule_repo.set_enabled(rule_id, enabled)?;
        let changed = match self.rule_set.set_enabled(rule_id, enabled) {
            Ok(changed) => changed,
            // 库中存在而内存中缺失: 重新加载
            Err(RuleError::NotFound(_)) => {
                self.reload()?;
                true
            }
            Err(e) => return Err(e.into()),
        };
        Ok(changed)
    }

    /// 审计当前启用规则之间的重叠
    pub fn audit(&self) -> Vec<RuleOverlap> {
        self.auditor.audit_snapshot(&self.rule_set.snapshot())
    }
}
