// ==========================================
// 羽绒拼配优化系统 - 命令行入口
// ==========================================
// 用法:
//   blend-optimizer [--config <config.json>] [--json-log] <inventory.json> <requirements.json>
//
// inventory.json:    LotRecord 数组
// requirements.json: Requirements 对象
// 结果 (OptimizationReport) 以 JSON 输出到 stdout，日志输出到 stderr
// ==========================================

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use blend_optimizer::{logging, BlendApi, LotRecord, OptimizerConfig, Requirements};

struct CliArgs {
    config: Option<PathBuf>,
    json_log: bool,
    inventory: PathBuf,
    requirements: PathBuf,
}

fn parse_args() -> Result<CliArgs> {
    let mut config = None;
    let mut json_log = false;
    let mut positional = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config 缺少文件路径")?;
                config = Some(PathBuf::from(path));
            }
            "--json-log" => json_log = true,
            flag if flag.starts_with("--") => bail!("未知参数: {}", flag),
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    match <[PathBuf; 2]>::try_from(positional) {
        Ok([inventory, requirements]) => Ok(CliArgs {
            config,
            json_log,
            inventory,
            requirements,
        }),
        Err(_) => bail!(
            "用法: blend-optimizer [--config <config.json>] [--json-log] <inventory.json> <requirements.json>"
        ),
    }
}

fn main() -> Result<()> {
    let args = parse_args()?;

    if args.json_log {
        logging::init_json();
    } else {
        logging::init();
    }

    tracing::info!("==================================================");
    tracing::info!("{} v{}", blend_optimizer::APP_NAME, blend_optimizer::VERSION);
    tracing::info!("==================================================");

    let config = match &args.config {
        Some(path) => OptimizerConfig::from_json_file(path)
            .with_context(|| format!("加载配置失败: {}", path.display()))?,
        None => OptimizerConfig::default(),
    };
    tracing::debug!(config = %config.snapshot()?, "生效配置");

    let inventory: Vec<LotRecord> =
        read_json(&args.inventory).context("读取库存快照失败")?;
    let requirements: Requirements =
        read_json(&args.requirements).context("读取拼配需求失败")?;
    tracing::info!(lots = inventory.len(), "库存快照已加载");

    let api = BlendApi::new(config)?;
    let report = api.optimize_with_report(&inventory, &requirements)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取文件: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("JSON 解析失败: {}", path.display()))
}
