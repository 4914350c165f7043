// ==========================================
// 家具配置报价系统 - 报价与导出模型
// ==========================================
// 职责: 物料清单 (BOM) / 报价 / 导出文档树
// 红线: 派生数据,从不单独持久化,从不原地修改 (按需重新生成)
// ==========================================

use crate::domain::rule::{ActionTarget, RuleConflict};
use crate::domain::types::{BomCategory, ExportFormat};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// BomLine - 清单行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomLine {
    pub category: BomCategory,
    pub module_id: String,
    pub module_name: String,
    /// 模块创建序号 (排序键)
    pub module_sequence: u64,
    /// 目录条目ID (板材/加工项/配件)
    pub item_id: String,
    pub description: String,
    pub quantity: f64,
    /// m2 / ml / pcs
    pub unit: String,
    pub unit_price: f64,
    /// 已按 2 位小数四舍五入 (half-up)
    pub line_total: f64,
}

// ==========================================
// 分类小计
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorySubtotals {
    pub material: f64,
    pub processing: f64,
    pub accessory: f64,
}

impl CategorySubtotals {
    pub fn get(&self, category: BomCategory) -> f64 {
        match category {
            BomCategory::Material => self.material,
            BomCategory::Processing => self.processing,
            BomCategory::Accessory => self.accessory,
        }
    }
}

/// 因阻断冲突被排除计价的模块
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedModule {
    pub module_id: String,
    pub module_name: String,
    pub reasons: Vec<RuleConflict>,
}

/// 规则要求的类型尚未选定具体条目的模块 (仍参与计价)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncompleteModule {
    pub module_id: String,
    pub pending_requirements: Vec<ActionTarget>,
}

// ==========================================
// BillOfMaterials - 物料清单 / 报价
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillOfMaterials {
    pub lines: Vec<BomLine>,
    pub subtotals: CategorySubtotals,
    pub total: f64,
    pub excluded_modules: Vec<ExcludedModule>,
    pub incomplete_modules: Vec<IncompleteModule>,
    /// 输入的模块总数 (= 排除数 + 有计价行的模块数)
    pub module_count: usize,
    pub generated_at: DateTime<Utc>,
}

/// 报价即物料清单
pub type Quote = BillOfMaterials;

impl BillOfMaterials {
    pub fn lines_in(&self, category: BomCategory) -> impl Iterator<Item = &BomLine> {
        self.lines.iter().filter(move |l| l.category == category)
    }

    /// 至少有一行计价的模块数
    pub fn priced_module_count(&self) -> usize {
        let mut ids: Vec<&str> = self.lines.iter().map(|l| l.module_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}

// ==========================================
// 导出选项
// ==========================================
fn default_true() -> bool {
    true
}

/// 导出选项 (缺省键一律为 true)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    #[serde(default = "default_true")]
    pub include_materials: bool,
    #[serde(default = "default_true")]
    pub include_accessories: bool,
    #[serde(default = "default_true")]
    pub include_processing: bool,
    #[serde(default = "default_true")]
    pub include_prices: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_materials: true,
            include_accessories: true,
            include_processing: true,
            include_prices: true,
        }
    }
}

impl ExportOptions {
    pub fn includes(&self, category: BomCategory) -> bool {
        match category {
            BomCategory::Material => self.include_materials,
            BomCategory::Processing => self.include_processing,
            BomCategory::Accessory => self.include_accessories,
        }
    }
}

// ==========================================
// ExportModel - 与格式无关的导出文档树
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorIdentity {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportHeader {
    pub project_id: String,
    pub project_name: String,
    pub project_type: String,
    pub generated_at: DateTime<Utc>,
    pub generator: GeneratorIdentity,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub module_id: String,
    pub module_name: String,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    /// include_prices=false 时为 None
    pub unit_price: Option<f64>,
    pub line_total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSection {
    pub category: BomCategory,
    pub title: String,
    pub rows: Vec<ExportRow>,
    pub subtotal: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: BomCategory,
    pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportTotals {
    pub by_category: Vec<CategoryTotal>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportModel {
    pub header: ExportHeader,
    pub sections: Vec<ExportSection>,
    /// 仅 include_prices=true 时存在
    pub totals: Option<ExportTotals>,
    pub excluded_modules: Vec<ExcludedModule>,
    pub incomplete_modules: Vec<IncompleteModule>,
}

// ==========================================
// 外部导出器接口数据
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub filename: String,
    pub format: ExportFormat,
    #[serde(default)]
    pub settings: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportOutcome {
    Download { reference: String },
    Failed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_options_missing_keys_default_true() {
        let opts: ExportOptions = serde_json::from_str(r#"{"includePrices": false}"#).unwrap();
        assert!(opts.include_materials);
        assert!(opts.include_accessories);
        assert!(opts.include_processing);
        assert!(!opts.include_prices);

        let empty: ExportOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, ExportOptions::default());
    }

    #[test]
    fn test_export_outcome_shape() {
        let ok = ExportOutcome::Download {
            reference: "files/q.pdf".to_string(),
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "download");
    }
}
