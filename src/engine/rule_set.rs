// ==========================================
// 家具配置报价系统 - 组合规则集
// ==========================================
// 职责: rule_id → ComboRule 映射 + 启停开关
// 红线: 读时复制 (copy-on-read); evaluate 在调用开始时取快照,
//       并发的启停写入绝不会在评估中途被观察到
// 红线: 启停只经由唯一的写入口 set_enabled
// ==========================================

use crate::domain::rule::{ComboRule, RuleError};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

// ==========================================
// RuleSetSnapshot - 规则集不可变快照
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct RuleSetSnapshot {
    rules: Arc<BTreeMap<String, ComboRule>>,
}

impl RuleSetSnapshot {
    /// 按 rule_id 升序迭代全部规则
    pub fn iter(&self) -> impl Iterator<Item = &ComboRule> {
        self.rules.values()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &ComboRule> {
        self.rules.values().filter(|r| r.enabled)
    }

    pub fn get(&self, rule_id: &str) -> Option<&ComboRule> {
        self.rules.get(rule_id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn to_vec(&self) -> Vec<ComboRule> {
        self.rules.values().cloned().collect()
    }
}

// ==========================================
// ComboRuleSet - 组合规则集
// ==========================================
#[derive(Debug, Default)]
pub struct ComboRuleSet {
    current: RwLock<Arc<BTreeMap<String, ComboRule>>>,
}

impl ComboRuleSet {
    /// 由规则列表构造 (校验每条规则,rule_id 不得重复)
    pub fn new(rules: Vec<ComboRule>) -> Result<Self, RuleError> {
        let mut map = BTreeMap::new();
        for rule in rules {
            rule.validate()?;
            if map.contains_key(&rule.id) {
                return Err(RuleError::DuplicateRuleId(rule.id));
            }
            map.insert(rule.id.clone(), rule);
        }
        Ok(Self {
            current: RwLock::new(Arc::new(map)),
        })
    }

    // 锁只保护 Arc 指针的替换,中毒时内部数据仍然完整
    fn read(&self) -> RwLockReadGuard<'_, Arc<BTreeMap<String, ComboRule>>> {
        self.current.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arc<BTreeMap<String, ComboRule>>> {
        self.current.write().unwrap_or_else(|e| e.into_inner())
    }

    /// 取当前规则集快照
    pub fn snapshot(&self) -> RuleSetSnapshot {
        RuleSetSnapshot {
            rules: Arc::clone(&self.read()),
        }
    }

    /// 启停规则 (唯一写入口)
    ///
    /// # 返回
    /// - Ok(true): 状态已改变
    /// - Ok(false): 已是目标状态
    pub fn set_enabled(&self, rule_id: &str, enabled: bool) -> Result<bool, RuleError> {
        let mut guard = self.write();
        let current = guard
            .get(rule_id)
            .ok_or_else(|| RuleError::NotFound(rule_id.to_string()))?;
        if current.enabled == enabled {
            return Ok(false);
        }

        let mut next = (**guard).clone();
        if let Some(rule) = next.get_mut(rule_id) {
            rule.enabled = enabled;
        }
        *guard = Arc::new(next);

        info!(rule_id = %rule_id, enabled = enabled, "规则启停已更新");
        Ok(true)
    }

    /// 新增或替换规则
    pub fn upsert(&self, rule: ComboRule) -> Result<(), RuleError> {
        rule.validate()?;
        let mut guard = self.write();
        let mut next = (**guard).clone();
        debug!(rule_id = %rule.id, "规则写入规则集");
        next.insert(rule.id.clone(), rule);
        *guard = Arc::new(next);
        Ok(())
    }

    pub fn remove(&self, rule_id: &str) -> Result<ComboRule, RuleError> {
        let mut guard = self.write();
        let mut next = (**guard).clone();
        let removed = next
            .remove(rule_id)
            .ok_or_else(|| RuleError::NotFound(rule_id.to_string()))?;
        *guard = Arc::new(next);
        Ok(removed)
    }

    /// 整体替换 (例如从仓储重新加载)
    pub fn replace_all(&self, rules: Vec<ComboRule>) -> Result<(), RuleError> {
        let fresh = Self::new(rules)?;
        let map = Arc::clone(&fresh.read());
        *self.write() = map;
        Ok(())
    }
}
