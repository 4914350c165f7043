// ==========================================
// 家具配置报价系统 - 报价/导出模型构建器
// ==========================================
// 职责: BOM + 项目元数据 → 与格式无关的导出文档树
// 红线: 不做任何字节级排版 (PDF/Excel/DXF 由外部导出器负责)
// ==========================================

use crate::domain::project::Project;
use crate::domain::quote::{
    BillOfMaterials, CategoryTotal, ExportHeader, ExportModel, ExportOptions, ExportOutcome,
    ExportRequest, ExportRow, ExportSection, ExportTotals, GeneratorIdentity,
};
use crate::domain::types::{BomCategory, ExportFormat};
use tracing::debug;

// ==========================================
// Exporter - 外部导出器接口
// ==========================================
/// 把导出模型渲染为具体格式 (由外部实现)
pub trait Exporter: Send + Sync {
    /// 支持的格式
    fn supports(&self, format: ExportFormat) -> bool;

    /// 渲染并返回下载引用或失败原因
    fn export(&self, model: &ExportModel, request: &ExportRequest) -> ExportOutcome;
}

// ==========================================
// ExportModelBuilder - 导出模型构建器
// ==========================================
#[derive(Debug, Clone)]
pub struct ExportModelBuilder {
    generator: GeneratorIdentity,
    currency: String,
}

impl ExportModelBuilder {
    pub fn new(generator: GeneratorIdentity, currency: impl Into<String>) -> Self {
        Self {
            generator,
            currency: currency.into(),
        }
    }

    /// 构建导出模型
    ///
    /// - 每个启用的分类一个 section (即使为空也保留,便于导出器输出固定版式)
    /// - include_prices=false 时行内不含单价/金额,且无 totals
    /// - totals 只覆盖已启用的分类
    pub fn build(
        &self,
        project: &Project,
        bom: &BillOfMaterials,
        options: &ExportOptions,
    ) -> ExportModel {
        let sections: Vec<ExportSection> = BomCategory::ALL
            .into_iter()
            .filter(|c| options.includes(*c))
            .map(|category| self.section(bom, options, category))
            .collect();

        let totals = options.include_prices.then(|| {
            let by_category: Vec<CategoryTotal> = sections
                .iter()
                .map(|s| CategoryTotal {
                    category: s.category,
                    subtotal: bom.subtotals.get(s.category),
                })
                .collect();
            // 按分累加,与 BOM 小计的口径一致
            let cents: i64 = by_category
                .iter()
                .map(|c| (c.subtotal * 100.0).round() as i64)
                .sum();
            ExportTotals {
                by_category,
                total: cents as f64 / 100.0,
            }
        });

        debug!(
            project_id = %project.id,
            sections = sections.len(),
            with_prices = options.include_prices,
            "导出模型构建完成"
        );

        ExportModel {
            header: ExportHeader {
                project_id: project.id.clone(),
                project_name: project.name.clone(),
                project_type: project.project_type.clone(),
                generated_at: bom.generated_at,
                generator: self.generator.clone(),
                currency: self.currency.clone(),
            },
            sections,
            totals,
            excluded_modules: bom.excluded_modules.clone(),
            incomplete_modules: bom.incomplete_modules.clone(),
        }
    }

    fn section(
        &self,
        bom: &BillOfMaterials,
        options: &ExportOptions,
        category: BomCategory,
    ) -> ExportSection {
        let rows = bom
            .lines_in(category)
            .map(|line| ExportRow {
                module_id: line.module_id.clone(),
                module_name: line.module_name.clone(),
                description: line.description.clone(),
                quantity: line.quantity,
                unit: line.unit.clone(),
                unit_price: options.include_prices.then_some(line.unit_price),
                line_total: options.include_prices.then_some(line.line_total),
            })
            .collect();

        ExportSection {
            category,
            title: section_title(category).to_string(),
            rows,
            subtotal: options
                .include_prices
                .then(|| bom.subtotals.get(category)),
        }
    }
}

fn section_title(category: BomCategory) -> &'static str {
    match category {
        BomCategory::Material => "板材",
        BomCategory::Processing => "加工",
        BomCategory::Accessory => "配件",
    }
}
