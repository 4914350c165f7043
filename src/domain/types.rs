// ==========================================
// 家具配置报价系统 - 领域类型定义
// ==========================================
// 职责: 封闭枚举 (兼容性键)
// 红线: 所有兼容性判断只基于这些枚举,不基于名称字符串
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 枚举字符串解析失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("未知的{kind}取值: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

fn parse_variant<T: Copy>(
    all: &[T],
    kind: &'static str,
    as_str: fn(&T) -> &'static str,
    s: &str,
) -> Result<T, UnknownVariant> {
    let needle = s.trim();
    all.iter()
        .copied()
        .find(|v| as_str(v).eq_ignore_ascii_case(needle))
        .ok_or_else(|| UnknownVariant {
            kind,
            value: needle.to_string(),
        })
}

// ==========================================
// 板材类型 (Material Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MaterialType {
    #[serde(rename = "PAL")]
    Pal, // 刨花板
    #[serde(rename = "MDF")]
    Mdf, // 中密度纤维板
    #[serde(rename = "MDF-AGT")]
    MdfAgt, // 高光 MDF
    #[serde(rename = "PFL")]
    Pfl, // 背板
    #[serde(rename = "GLASS")]
    Glass, // 玻璃
    #[serde(rename = "COUNTERTOP")]
    Countertop, // 台面
}

impl MaterialType {
    pub const ALL: [MaterialType; 6] = [
        MaterialType::Pal,
        MaterialType::Mdf,
        MaterialType::MdfAgt,
        MaterialType::Pfl,
        MaterialType::Glass,
        MaterialType::Countertop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialType::Pal => "PAL",
            MaterialType::Mdf => "MDF",
            MaterialType::MdfAgt => "MDF-AGT",
            MaterialType::Pfl => "PFL",
            MaterialType::Glass => "GLASS",
            MaterialType::Countertop => "COUNTERTOP",
        }
    }

    /// 是否属于 MDF 系列 (唯一允许喷漆的板材)
    pub fn is_mdf_family(&self) -> bool {
        matches!(self, MaterialType::Mdf | MaterialType::MdfAgt)
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(&Self::ALL, "板材类型", Self::as_str, s)
    }
}

// ==========================================
// 加工类型 (Processing Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingType {
    EdgeBanding,     // 封边
    Cnc,             // CNC 加工
    Painting,        // 喷漆
    GlassProcessing, // 玻璃加工
}

impl ProcessingType {
    pub const ALL: [ProcessingType; 4] = [
        ProcessingType::EdgeBanding,
        ProcessingType::Cnc,
        ProcessingType::Painting,
        ProcessingType::GlassProcessing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingType::EdgeBanding => "edge_banding",
            ProcessingType::Cnc => "cnc",
            ProcessingType::Painting => "painting",
            ProcessingType::GlassProcessing => "glass_processing",
        }
    }
}

impl fmt::Display for ProcessingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(&Self::ALL, "加工类型", Self::as_str, s)
    }
}

// ==========================================
// 五金配件类型 (Accessory Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessoryType {
    Handle,       // 拉手
    Hinge,        // 铰链
    PushSystem,   // 按压反弹器
    DrawerSlide,  // 抽屉滑轨
    LiftSystem,   // 上翻支撑
    Leg,          // 柜脚
    ShelfSupport, // 层板托
    Lighting,     // 灯具
}

impl AccessoryType {
    pub const ALL: [AccessoryType; 8] = [
        AccessoryType::Handle,
        AccessoryType::Hinge,
        AccessoryType::PushSystem,
        AccessoryType::DrawerSlide,
        AccessoryType::LiftSystem,
        AccessoryType::Leg,
        AccessoryType::ShelfSupport,
        AccessoryType::Lighting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessoryType::Handle => "handle",
            AccessoryType::Hinge => "hinge",
            AccessoryType::PushSystem => "push_system",
            AccessoryType::DrawerSlide => "drawer_slide",
            AccessoryType::LiftSystem => "lift_system",
            AccessoryType::Leg => "leg",
            AccessoryType::ShelfSupport => "shelf_support",
            AccessoryType::Lighting => "lighting",
        }
    }
}

impl fmt::Display for AccessoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessoryType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(&Self::ALL, "配件类型", Self::as_str, s)
    }
}

// ==========================================
// 柜体类型 (Module Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleType {
    BaseCabinet,   // 地柜
    WallCabinet,   // 吊柜
    TallCabinet,   // 高柜
    DrawerUnit,    // 抽屉柜
    CornerCabinet, // 转角柜
    OpenShelf,     // 开放格
}

impl ModuleType {
    pub const ALL: [ModuleType; 6] = [
        ModuleType::BaseCabinet,
        ModuleType::WallCabinet,
        ModuleType::TallCabinet,
        ModuleType::DrawerUnit,
        ModuleType::CornerCabinet,
        ModuleType::OpenShelf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleType::BaseCabinet => "base_cabinet",
            ModuleType::WallCabinet => "wall_cabinet",
            ModuleType::TallCabinet => "tall_cabinet",
            ModuleType::DrawerUnit => "drawer_unit",
            ModuleType::CornerCabinet => "corner_cabinet",
            ModuleType::OpenShelf => "open_shelf",
        }
    }

    /// 柜型是否带门板/抽面
    pub fn has_front(&self) -> bool {
        !matches!(self, ModuleType::OpenShelf)
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(&Self::ALL, "柜体类型", Self::as_str, s)
    }
}

// ==========================================
// 计价单位 (Price Unit)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceUnit {
    #[serde(rename = "m2", alias = "m²")]
    SquareMeter, // 按面积
    #[serde(rename = "ml")]
    LinearMeter, // 按延米
    #[serde(rename = "pcs")]
    Piece, // 按件
}

impl PriceUnit {
    pub const ALL: [PriceUnit; 3] = [
        PriceUnit::SquareMeter,
        PriceUnit::LinearMeter,
        PriceUnit::Piece,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceUnit::SquareMeter => "m2",
            PriceUnit::LinearMeter => "ml",
            PriceUnit::Piece => "pcs",
        }
    }
}

impl fmt::Display for PriceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceUnit {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == "m²" {
            return Ok(PriceUnit::SquareMeter);
        }
        parse_variant(&Self::ALL, "计价单位", Self::as_str, s)
    }
}

// ==========================================
// 加工面 (Panel Target)
// ==========================================
// 加工作用于柜体板还是门板
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelTarget {
    #[default]
    Body,
    Front,
}

impl fmt::Display for PanelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelTarget::Body => write!(f, "body"),
            PanelTarget::Front => write!(f, "front"),
        }
    }
}

// ==========================================
// 冲突严重度 (Conflict Severity)
// ==========================================
// 顺序: Informational < Warning < Blocking
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Informational, // 提示
    Warning,       // 警告
    Blocking,      // 阻断 (不参与计价/导出)
}

impl fmt::Display for ConflictSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictSeverity::Informational => write!(f, "informational"),
            ConflictSeverity::Warning => write!(f, "warning"),
            ConflictSeverity::Blocking => write!(f, "blocking"),
        }
    }
}

// ==========================================
// 项目状态 (Project Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Draft, // 草稿
    Saved,     // 已保存
    Completed, // 已完成
    Imported,  // 外部导入
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 4] = [
        ProjectStatus::Draft,
        ProjectStatus::Saved,
        ProjectStatus::Completed,
        ProjectStatus::Imported,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Saved => "saved",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Imported => "imported",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(&Self::ALL, "项目状态", Self::as_str, s)
    }
}

// ==========================================
// 清单分类 (BOM Category)
// ==========================================
// 顺序即输出顺序: material → processing → accessory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BomCategory {
    Material,
    Processing,
    Accessory,
}

impl BomCategory {
    pub const ALL: [BomCategory; 3] = [
        BomCategory::Material,
        BomCategory::Processing,
        BomCategory::Accessory,
    ];
}

impl fmt::Display for BomCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BomCategory::Material => write!(f, "material"),
            BomCategory::Processing => write!(f, "processing"),
            BomCategory::Accessory => write!(f, "accessory"),
        }
    }
}

// ==========================================
// 导出格式 (Export Format)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Pdf,
    Excel,
    Dxf,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Pdf => write!(f, "pdf"),
            ExportFormat::Excel => write!(f, "excel"),
            ExportFormat::Dxf => write!(f, "dxf"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_type_serde_names() {
        let json = serde_json::to_string(&MaterialType::MdfAgt).unwrap();
        assert_eq!(json, "\"MDF-AGT\"");
        let parsed: MaterialType = serde_json::from_str("\"GLASS\"").unwrap();
        assert_eq!(parsed, MaterialType::Glass);
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("pal".parse::<MaterialType>().unwrap(), MaterialType::Pal);
        assert_eq!(
            "EDGE_BANDING".parse::<ProcessingType>().unwrap(),
            ProcessingType::EdgeBanding
        );
        assert_eq!("m²".parse::<PriceUnit>().unwrap(), PriceUnit::SquareMeter);
    }

    #[test]
    fn test_unknown_variant_is_error() {
        let err = "OSB".parse::<MaterialType>().unwrap_err();
        assert_eq!(err.value, "OSB");
        assert!(serde_json::from_str::<AccessoryType>("\"magnet\"").is_err());
    }

    #[test]
    fn test_severity_and_category_ordering() {
        assert!(ConflictSeverity::Blocking > ConflictSeverity::Warning);
        assert!(BomCategory::Material < BomCategory::Processing);
        assert!(BomCategory::Processing < BomCategory::Accessory);
    }

    #[test]
    fn test_mdf_family() {
        assert!(MaterialType::Mdf.is_mdf_family());
        assert!(MaterialType::MdfAgt.is_mdf_family());
        assert!(!MaterialType::Pal.is_mdf_family());
    }
}
