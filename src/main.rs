use anyhow::{Context, Result};
use clap::Parser;
use pan_check::{
    batch::{self, BatchOutcome},
    config::AppConfig,
    logging, CheckerRegistry,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "config/pan-check.toml";

/// 网盘分享链接有效性检测
#[derive(Parser, Debug)]
#[command(name = "pan-check", version, about = "Check whether netdisk share links are still alive")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// 从文件读取链接（每行一个，# 开头为注释）
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// 以 JSON 输出检测结果
    #[arg(long)]
    json: bool,

    /// 待检测的分享链接
    links: Vec<String>,
}

#[tokio::main]
async fn main() {
    // 0 全部有效，1 存在无效链接，2 运行出错
    let exit_code = match run().await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            eprintln!("错误: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<bool> {
    let cli = Cli::parse();

    // 日志系统依赖配置，加载失败的原因在日志就绪后再输出
    let config_path = cli.config.to_string_lossy().into_owned();
    let (config, load_error) = AppConfig::load_or_default(&config_path).await;

    let _log_guard = logging::init_logging(&config.log);
    match load_error {
        Some(e) => warn!("配置文件加载失败，使用默认配置: {:#}", e),
        None => info!("使用配置: {}", config_path),
    }

    let mut links = cli.links.clone();
    if let Some(file) = &cli.file {
        links.extend(read_link_file(file).await?);
    }
    if links.is_empty() {
        anyhow::bail!("没有待检测的链接，请通过参数或 --file 指定");
    }

    let registry = CheckerRegistry::from_config(&config.checker).context("创建检测器失败")?;
    let outcome = batch::check_batch(&registry, 0, links, config.batch.max_in_flight).await;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("序列化检测结果失败")?
        );
    } else {
        print_table(&outcome);
    }

    Ok(outcome.all_valid())
}

/// 读取链接文件，跳过空行和注释行
async fn read_link_file(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("读取链接文件失败: {}", path.display()))?;

    Ok(parse_link_lines(&content))
}

fn parse_link_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn print_table(outcome: &BatchOutcome) {
    for item in &outcome.results {
        let status = if item.result.valid { "有效" } else { "无效" };
        println!(
            "{}\t{:>6}ms\t{}\t{}",
            status, item.result.duration_ms, item.link, item.result.failure_reason
        );
    }

    let execution = &outcome.execution;
    println!(
        "\n共 {} 条，有效 {}，无效 {}，耗时 {}ms",
        execution.checked_count,
        execution.valid_count,
        execution.invalid_count,
        execution.execution_duration_ms.unwrap_or_default()
    );
}
