// ==========================================
// 引擎流程集成测试
// ==========================================
// 测试目标: 目录 → 组装 → 规则评估 → 计价 的端到端性质
// ==========================================


use furniture_configurator::domain::{
    AccessoryType, ComboRule, ConflictKind, ConflictSeverity, FurnitureModule, MaterialType,
    ModuleType, ProcessingSelection, ProcessingType, Project, RuleAction, RuleCondition,
};
use furniture_configurator::engine::{
    default_rules, CatalogStore, ComboRuleSet, CompositionError, ConfiguratorEngine,
    ModuleComposer, RuleEvaluator, StockPolicy,
};
use furniture_configurator::logging;

fn catalog() -> CatalogStore {
    CatalogStore::new(test_helpers::sample_catalog()).expect("sample catalog must be valid")
}

fn base_cabinet(id: &str) -> FurnitureModule {
    FurnitureModule::new(ModuleType::BaseCabinet, 600.0, 720.0, 560.0, "PAL-W").with_id(id)
}

fn project_with(modules: Vec<FurnitureModule>) -> Project {
    let mut project = Project::new("designer-1", "Flow test", "kitchen");
    let space = project
        .add_space(test_helpers::kitchen_space())
        .expect("space");
    for module in modules {
        project.add_module(&space, module).expect("module");
    }
    project
}

// ==========================================
// 组装场景
// ==========================================

#[test]
fn test_compatible_edge_banding_yields_processing_line() {
    logging::init_test();
    let project = project_with(vec![
        base_cabinet("m1").with_processing(ProcessingSelection::body("EDGE-ABS"))
    ]);
    let rules = ComboRuleSet::new(default_rules()).unwrap();

    let quote = ConfiguratorEngine::default()
        .quote_project(&project, &catalog(), &rules.snapshot())
        .unwrap();

    let processing: Vec<_> = quote
        .bom
        .lines
        .iter()
        .filter(|l| l.item_id == "EDGE-ABS")
        .collect();
    assert_eq!(processing.len(), 1);
    // 2 × (600 + 720) mm = 2.64 m × 3.0
    assert_eq!(processing[0].line_total, 7.92);
    assert!(processing[0].line_total > 0.0);
}

#[test]
fn test_edge_banding_on_glass_is_rejected() {
    let draft = FurnitureModule::new(ModuleType::WallCabinet, 600.0, 720.0, 320.0, "GLASS-C")
        .with_id("g1")
        .with_processing(ProcessingSelection::body("EDGE-ABS"));

    let err = ModuleComposer::default()
        .compose(&draft, &catalog())
        .unwrap_err();
    match err {
        CompositionError::IncompatibleProcessing {
            module_id,
            processing_type,
            material_type,
            ..
        } => {
            assert_eq!(module_id, "g1");
            assert_eq!(processing_type, ProcessingType::EdgeBanding);
            assert_eq!(material_type, MaterialType::Glass);
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ==========================================
// 规则场景
// ==========================================

#[test]
fn test_push_to_open_removes_handle_only_when_enabled() {
    let draft = base_cabinet("m1")
        .with_accessory("PUSH", 1)
        .with_accessory("HANDLE", 2);
    let catalog = catalog();
    let rules = ComboRuleSet::new(default_rules()).unwrap();
    let engine = ConfiguratorEngine::default();

    let result = engine
        .evaluate_module(&draft, &catalog, &rules.snapshot())
        .unwrap();
    assert!(!result.next_state.has_accessory_type(AccessoryType::Handle));
    assert!(result.next_state.has_accessory_type(AccessoryType::PushSystem));
    assert!(result.conflicts.is_empty());

    rules.set_enabled("R001", false).unwrap();
    let result = engine
        .evaluate_module(&draft, &catalog, &rules.snapshot())
        .unwrap();
    assert!(result.next_state.has_accessory_type(AccessoryType::Handle));
    assert!(result.next_state.has_accessory_type(AccessoryType::PushSystem));
    assert!(result.conflicts.is_empty());
    assert!(result.applied_actions.is_empty());
}

#[test]
fn test_glass_front_requires_glass_processing() {
    let draft = base_cabinet("m1").with_front("GLASS-C");
    let rules = ComboRuleSet::new(default_rules()).unwrap();

    let result = ConfiguratorEngine::default()
        .evaluate_module(&draft, &catalog(), &rules.snapshot())
        .unwrap();
    assert!(result
        .next_state
        .required_processing_types
        .contains(&ProcessingType::GlassProcessing));
    assert!(!result.next_state.is_complete());

    let completed = draft.with_processing(ProcessingSelection::front("GLASS-POL"));
    let result = ConfiguratorEngine::default()
        .evaluate_module(&completed, &catalog(), &rules.snapshot())
        .unwrap();
    assert!(result.next_state.pending_requirements().is_empty());
}

// ==========================================
// 性质
// ==========================================

#[test]
fn test_evaluating_a_stable_state_twice_is_idempotent() {
    let draft = FurnitureModule::new(ModuleType::DrawerUnit, 400.0, 720.0, 560.0, "PAL-W")
        .with_id("d1")
        .with_accessory("PUSH", 1)
        .with_accessory("HANDLE", 1);
    let state = ModuleComposer::default().compose(&draft, &catalog()).unwrap();
    let rules = default_rules();
    let evaluator = RuleEvaluator::new();

    let first = evaluator.evaluate(&state, &rules).unwrap();
    let second = evaluator.evaluate(&first.next_state, &rules).unwrap();
    let third = evaluator.evaluate(&second.next_state, &rules).unwrap();

    assert_eq!(second.next_state, third.next_state);
    assert_eq!(second.conflicts, third.conflicts);
    assert_eq!(first.next_state, second.next_state);
}

#[test]
fn test_oscillating_rules_terminate_with_cycle_conflict() {
    let rules = vec![
        ComboRule::new(
            "A",
            "require hinge when absent",
            RuleCondition::negate(RuleCondition::has_accessory(AccessoryType::Hinge)),
            RuleAction::RequireAccessory {
                accessory_type: AccessoryType::Hinge,
            },
        ),
        ComboRule::new(
            "B",
            "forbid hinge when present",
            RuleCondition::has_accessory(AccessoryType::Hinge),
            RuleAction::ForbidAccessory {
                accessory_type: AccessoryType::Hinge,
            },
        ),
    ];
    let state = ModuleComposer::default()
        .compose(&base_cabinet("m1"), &catalog())
        .unwrap();

    let result = RuleEvaluator::new().evaluate(&state, &rules).unwrap();

    assert!(!result.converged);
    assert!(result.iterations <= rules.len() + 1);
    let cycle: Vec<_> = result
        .conflicts
        .iter()
        .filter(|c| c.kind == ConflictKind::RuleCycleDetected)
        .collect();
    assert_eq!(cycle.len(), 1);
    assert_eq!(cycle[0].severity, ConflictSeverity::Blocking);
    assert!(cycle[0].rule_id.is_none());
}

#[test]
fn test_rule_order_does_not_change_outcome() {
    let draft = base_cabinet("m1")
        .with_front("GLASS-C")
        .with_accessory("HANDLE", 2)
        .with_accessory("PUSH", 1)
        .with_processing(ProcessingSelection::front("GLASS-POL"));
    let state = ModuleComposer::default().compose(&draft, &catalog()).unwrap();

    let forward = default_rules();
    let mut reversed = forward.clone();
    reversed.reverse();
    let mut rotated = forward.clone();
    rotated.rotate_left(3);

    let evaluator = RuleEvaluator::new();
    let a = evaluator.evaluate(&state, &forward).unwrap();
    let b = evaluator.evaluate(&state, &reversed).unwrap();
    let c = evaluator.evaluate(&state, &rotated).unwrap();

    assert_eq!(a.next_state, b.next_state);
    assert_eq!(a.next_state, c.next_state);
    assert_eq!(a.conflicts, b.conflicts);
    assert_eq!(a.conflicts, c.conflicts);
}

#[test]
fn test_body_only_module_prices_to_area_times_price() {
    let project = project_with(vec![base_cabinet("m1")]);
    let rules = ComboRuleSet::new(default_rules()).unwrap();

    let quote = ConfiguratorEngine::default()
        .quote_project(&project, &catalog(), &rules.snapshot())
        .unwrap();

    // 0.6 × 0.72 = 0.432 m² × 45.5 = 19.656 → 19.66
    assert_eq!(quote.bom.lines.len(), 1);
    assert_eq!(quote.bom.total, 19.66);
}

#[test]
fn test_every_module_is_priced_or_excluded() {
    let project = project_with(vec![
        base_cabinet("m1"),
        FurnitureModule::new(ModuleType::TallCabinet, 600.0, 2100.0, 560.0, "PAL-OUT")
            .with_id("m2"),
        base_cabinet("m3").with_accessory("HINGE", 2),
    ]);
    let rules = ComboRuleSet::new(default_rules()).unwrap();

    let quote = ConfiguratorEngine::new(StockPolicy::Block)
        .quote_project(&project, &catalog(), &rules.snapshot())
        .unwrap();

    assert_eq!(quote.bom.excluded_modules.len(), 1);
    assert_eq!(quote.bom.excluded_modules[0].module_id, "m2");
    assert!(!quote.bom.excluded_modules[0].reasons.is_empty());
    assert_eq!(
        quote.bom.excluded_modules.len() + quote.bom.priced_module_count(),
        project.module_count()
    );

    // 缺货只提示时照常计价
    let quote = ConfiguratorEngine::new(StockPolicy::Warn)
        .quote_project(&project, &catalog(), &rules.snapshot())
        .unwrap();
    assert!(quote.bom.excluded_modules.is_empty());
    assert_eq!(quote.bom.priced_module_count(), 3);
}

#[test]
fn test_subtotals_equal_sum_of_displayed_lines() {
    let project = project_with(vec![
        base_cabinet("m1")
            .with_processing(ProcessingSelection::body("EDGE-ABS"))
            .with_processing(ProcessingSelection::body("CNC-HOLE").with_quantity(4))
            .with_accessory("HINGE", 2),
        FurnitureModule::new(ModuleType::WallCabinet, 800.0, 360.0, 320.0, "MDF-G")
            .with_id("m2")
            .with_front("MDF-G")
            .with_processing(ProcessingSelection::front("PAINT-MAT")),
    ]);
    let rules = ComboRuleSet::new(default_rules()).unwrap();

    let bom = ConfiguratorEngine::default()
        .quote_project(&project, &catalog(), &rules.snapshot())
        .unwrap()
        .bom;

    let cents = |v: f64| (v * 100.0).round() as i64;
    let line_sum: i64 = bom.lines.iter().map(|l| cents(l.line_total)).sum();
    assert_eq!(cents(bom.total), line_sum);
    assert_eq!(
        cents(bom.subtotals.material) + cents(bom.subtotals.processing) + cents(bom.subtotals.accessory),
        line_sum
    );

    // 分类顺序: material → processing → accessory
    let categories: Vec<_> = bom.lines.iter().map(|l| l.category).collect();
    let mut sorted = categories.clone();
    sorted.sort();
    assert_eq!(categories, sorted);
}
