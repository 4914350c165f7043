// ==========================================
// 家具配置报价系统 - 面板几何
// ==========================================
// 职责: 由模块尺寸 (mm) 推导计价用的面积 (m²) 与封边延米 (m)
// 红线: 所有输入为毫米,先换算为米再与单价相乘
// ==========================================

use crate::domain::types::{ModuleType, PanelTarget};
use crate::engine::composer::NormalizedModuleState;

const MM_PER_M: f64 = 1_000.0;
const MM2_PER_M2: f64 = 1_000_000.0;

/// 柜体面积 (m²) = 宽 × 高
pub fn body_area_m2(width_mm: f64, height_mm: f64) -> f64 {
    width_mm * height_mm / MM2_PER_M2
}

/// 门板外露宽度 (mm)
///
/// - 转角柜: 宽减去被相邻柜体遮挡的深度,不小于 0
/// - 开放层架: 无门板
/// - 其余柜型: 整个正面
pub fn front_width_mm(module_type: ModuleType, width_mm: f64, depth_mm: f64) -> Option<f64> {
    match module_type {
        ModuleType::OpenShelf => None,
        ModuleType::CornerCabinet => Some((width_mm - depth_mm).max(0.0)),
        ModuleType::BaseCabinet
        | ModuleType::WallCabinet
        | ModuleType::TallCabinet
        | ModuleType::DrawerUnit => Some(width_mm),
    }
}

/// 门板外露面积 (m²),无门板的柜型返回 None
pub fn front_area_m2(
    module_type: ModuleType,
    width_mm: f64,
    height_mm: f64,
    depth_mm: f64,
) -> Option<f64> {
    front_width_mm(module_type, width_mm, depth_mm).map(|w| w * height_mm / MM2_PER_M2)
}

/// 柜体封边延米 (m)
///
/// 正面框 2 × (宽 + 高); 吊柜底板外露,额外计入两侧深度
pub fn body_edge_length_m(
    module_type: ModuleType,
    width_mm: f64,
    height_mm: f64,
    depth_mm: f64,
) -> f64 {
    let mut mm = 2.0 * (width_mm + height_mm);
    if module_type == ModuleType::WallCabinet {
        mm += 2.0 * depth_mm;
    }
    mm / MM_PER_M
}

/// 门板封边延米 (m) = 门板周长
pub fn front_edge_length_m(
    module_type: ModuleType,
    width_mm: f64,
    height_mm: f64,
    depth_mm: f64,
) -> Option<f64> {
    front_width_mm(module_type, width_mm, depth_mm).map(|w| 2.0 * (w + height_mm) / MM_PER_M)
}

// ==========================================
// PanelGeometry - 单个模块的几何量
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelGeometry {
    pub body_area_m2: f64,
    pub front_area_m2: Option<f64>,
    pub body_edge_m: f64,
    pub front_edge_m: Option<f64>,
}

impl PanelGeometry {
    pub fn of(state: &NormalizedModuleState) -> Self {
        let (t, w, h, d) = (
            state.module_type,
            state.width_mm,
            state.height_mm,
            state.depth_mm,
        );
        Self {
            body_area_m2: body_area_m2(w, h),
            front_area_m2: front_area_m2(t, w, h, d),
            body_edge_m: body_edge_length_m(t, w, h, d),
            front_edge_m: front_edge_length_m(t, w, h, d),
        }
    }

    /// 指定面板的面积; 门板不存在时为 0
    pub fn area_m2(&self, target: PanelTarget) -> f64 {
        match target {
            PanelTarget::Body => self.body_area_m2,
            PanelTarget::Front => self.front_area_m2.unwrap_or(0.0),
        }
    }

    /// 指定面板的封边延米; 门板不存在时为 0
    pub fn edge_m(&self, target: PanelTarget) -> f64 {
        match target {
            PanelTarget::Body => self.body_edge_m,
            PanelTarget::Front => self.front_edge_m.unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_body_area() {
        assert!(approx(body_area_m2(600.0, 720.0), 0.432));
        assert!(approx(body_area_m2(1000.0, 1000.0), 1.0));
    }

    #[test]
    fn test_front_area_by_module_type() {
        assert!(approx(
            front_area_m2(ModuleType::BaseCabinet, 600.0, 720.0, 560.0).unwrap(),
            0.432
        ));
        // 转角柜 900 宽 560 深 → 外露 340
        assert!(approx(
            front_area_m2(ModuleType::CornerCabinet, 900.0, 720.0, 560.0).unwrap(),
            0.2448
        ));
        assert_eq!(front_area_m2(ModuleType::CornerCabinet, 500.0, 720.0, 560.0), Some(0.0));
        assert_eq!(front_area_m2(ModuleType::OpenShelf, 800.0, 300.0, 250.0), None);
    }

    #[test]
    fn test_edge_lengths() {
        assert!(approx(
            body_edge_length_m(ModuleType::BaseCabinet, 600.0, 720.0, 560.0),
            2.64
        ));
        assert!(approx(
            body_edge_length_m(ModuleType::WallCabinet, 600.0, 720.0, 320.0),
            3.28
        ));
        assert!(approx(
            front_edge_length_m(ModuleType::DrawerUnit, 400.0, 720.0, 560.0).unwrap(),
            2.24
        ));
        assert_eq!(front_edge_length_m(ModuleType::OpenShelf, 400.0, 720.0, 300.0), None);
    }
}
