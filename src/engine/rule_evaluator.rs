// ==========================================
// 家具配置报价系统 - 规则评估引擎
// ==========================================
// 职责: 对规范化模块状态运行已启用的组合规则,迭代至不动点
// 输入: NormalizedModuleState + 规则快照
// 输出: 下一状态 + 已应用动作 + 冲突
// ==========================================
// 红线: 迭代上限 = 启用规则数 + 1,振荡时报告 RuleCycleDetected,永不死循环
// 红线: 同一轮针对同一类型的动作按 rule_id 升序处理,forbid 胜出
// 红线: 业务冲突一律作为数据返回,只有畸形规则才是硬失败
// ==========================================

mod condition;
mod core;


pub use self::condition::condition_holds;
pub use self::core::{evaluate, AppliedAction, EvaluationResult, RuleEvaluator};
