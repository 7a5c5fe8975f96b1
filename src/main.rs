//! DARWIN-FORGE 命令行入口
//!
//! 用法：darwin-forge [--config <path>] [--device desktop|tablet|mobile] [--evolve] <prompt...>
//! 初始化日志、加载配置、选择生成器，跑一次生成周期（可选再进化一次），打印阶段与渲染结果。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use darwin_forge::config::load_config;
use darwin_forge::core::{CycleReport, GenerationOrchestrator, OrchestratorCallbacks};
use darwin_forge::generator::create_generator_from_config;
use darwin_forge::observability;
use darwin_forge::preview::DeviceFrame;

#[derive(Parser, Debug)]
#[command(name = "darwin-forge")]
#[command(about = "Materialize a generated UI from a natural-language prompt", long_about = None)]
#[command(version)]
struct Cli {
    /// 额外的 TOML 配置文件（覆盖 config/default.toml）
    #[arg(long)]
    config: Option<PathBuf>,
    /// 预览设备框：desktop / tablet / mobile
    #[arg(long)]
    device: Option<DeviceFrame>,
    /// 生成完成后再进化一次
    #[arg(long)]
    evolve: bool,
    /// 自然语言提示
    #[arg(required = true, num_args = 1..)]
    prompt: Vec<String>,
}

impl Cli {
    fn prompt(&self) -> String {
        self.prompt.join(" ")
    }
}

fn print_report(label: &str, report: &CycleReport) {
    println!("== {} : {} ({})", label, report.phase.kind, report.phase.message);
    for err in &report.degraded {
        println!("   degraded: {}", err);
    }
    if let Some(render) = &report.render {
        if let Some(origin) = render.origin {
            println!("   origin: {}", origin);
        }
        match &render.view {
            Some(view) => println!("{}", view.to_markup()),
            None => println!("   {}", render.status.error_message.as_deref().unwrap_or("no view")),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let args = Cli::parse();

    let mut cfg = load_config(args.config.clone()).context("Failed to load config")?;
    if let Some(device) = args.device {
        cfg.app.device = device;
    }

    let generator = create_generator_from_config(&cfg);
    let callbacks = OrchestratorCallbacks::default()
        .on_phase_change(|phase| println!("-> [{}] {}", phase.kind, phase.message))
        .on_history_append(|record| println!("+  history {} ({:?})", record.id, record.kind));
    let orchestrator = Arc::new(GenerationOrchestrator::from_config(&cfg, generator).with_callbacks(callbacks));

    let ctrl_c = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                orchestrator.cancel();
            }
        })
    };

    let report = orchestrator
        .generate(&args.prompt())
        .await
        .context("Generation failed")?;
    print_report("generate", &report);

    if args.evolve {
        match orchestrator.evolve().await {
            Ok(report) => print_report("evolve", &report),
            Err(e) => println!("== evolve : {} (previous version kept)", e),
        }
    }

    ctrl_c.abort();
    println!("history: {} record(s)", orchestrator.history_len().await);
    Ok(())
}
