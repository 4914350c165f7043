// ==========================================
// 家具配置报价系统 - 命令行入口
// ==========================================
// 用法:
//   furniture-configurator [--db <path>] quote <project_id>
//   furniture-configurator [--db <path>] export <project_id>
//   furniture-configurator [--db <path>] rules
//   furniture-configurator [--db <path>] import <materials|processing|accessories> <file.csv>
// ==========================================

use std::path::Path;

use anyhow::{bail, Context, Result};
use furniture_configurator::app::{get_default_db_path, AppState};
use furniture_configurator::logging;

const USAGE: &str = "用法: furniture-configurator [--db <path>] <quote <project_id> | export <project_id> | rules | import <materials|processing|accessories> <file.csv>>";

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let db_path = match args.iter().position(|a| a == "--db") {
        Some(idx) => {
            if idx + 1 >= args.len() {
                bail!("--db 缺少路径参数\n{}", USAGE);
            }
            let path = args.remove(idx + 1);
            args.remove(idx);
            path
        }
        None => get_default_db_path(),
    };

    tracing::info!("==================================================");
    tracing::info!("家具配置报价系统 {}", furniture_configurator::VERSION);
    tracing::info!(db_path = %db_path, "使用数据库");
    tracing::info!("==================================================");

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;
    let seeded = state.rule_api.seed_defaults()?;
    if seeded > 0 {
        tracing::info!(count = seeded, "已写入默认规则");
    }

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["quote", project_id] => {
            let quote = state.configurator_api.quote_project(project_id).await?;
            println!("{}", serde_json::to_string_pretty(&quote.bom)?);
        }
        ["export", project_id] => {
            let model = state
                .configurator_api
                .build_export_model(project_id, None)
                .await?;
            println!("{}", serde_json::to_string_pretty(&model)?);
        }
        ["rules"] => {
            for rule in state.rule_api.list_rules() {
                println!(
                    "{} [{}] {}",
                    rule.id,
                    if rule.enabled { "on" } else { "off" },
                    rule.name
                );
            }
            let findings = state.rule_api.audit();
            if !findings.is_empty() {
                println!();
                for finding in findings {
                    println!("! {}", finding.message);
                }
            }
        }
        ["import", entity, file] => {
            let path = Path::new(file);
            let summary = match *entity {
                "materials" => state.catalog_importer.import_materials_file(path),
                "processing" => state.catalog_importer.import_processing_file(path),
                "accessories" => state.catalog_importer.import_accessories_file(path),
                other => bail!("未知的导入类别: {}\n{}", other, USAGE),
            }
            .with_context(|| format!("导入失败: {}", file))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ => bail!("{}", USAGE),
    }

    Ok(())
}
