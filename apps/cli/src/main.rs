//! # Actuator CLI
//!
//! 从 TOML 场景文件运行执行器仿真。
//!
//! ```bash
//! # 尽快跑完 250 个周期，最后打印各机构状态
//! actuator-cli simulate --scenario apps/cli/scenarios/demo.toml --ticks 250
//!
//! # 按 50 Hz 实时运行，每个周期每个机构输出一行 JSON 遥测帧
//! actuator-cli simulate --scenario demo.toml --realtime --json
//!
//! # 只检查场景文件
//! actuator-cli check --scenario demo.toml
//! ```
//!
//! 日志写到 stderr，由 `RUST_LOG` 控制。

use actuator_sdk::mechanism::SimulationRun;
use actuator_sdk::prelude::*;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Actuator CLI - 执行器仿真命令行工具
#[derive(Parser, Debug)]
#[command(name = "actuator-cli")]
#[command(about = "Run simulated actuator scenarios", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 运行场景
    Simulate {
        #[command(flatten)]
        args: SimulateArgs,
    },

    /// 解析并组装场景，不运行
    Check {
        /// 场景文件路径
        #[arg(short, long)]
        scenario: PathBuf,
    },
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// 场景文件路径
    #[arg(short, long)]
    scenario: PathBuf,

    /// 周期数（缺省取场景的 loop.max_iterations，再缺省则运行到 Ctrl+C）
    #[arg(short, long)]
    ticks: Option<u64>,

    /// 按标称周期对齐墙钟
    #[arg(long)]
    realtime: bool,

    /// 每个周期输出 JSON 行遥测帧
    #[arg(long)]
    json: bool,

    /// JSON 输出间隔（每 N 个周期输出一次）
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    every: u64,
}

fn main() -> Result<()> {
    actuator_sdk::init_logger_with("warn,actuator_cli=info,actuator_mechanism=info");

    let cli = Cli::parse();
    match cli.command {
        Commands::Simulate { args } => simulate(&args),
        Commands::Check { scenario } => check(&scenario),
    }
}

fn load(path: &Path) -> Result<(ScenarioConfig, SimulationRun)> {
    let scenario = ScenarioConfig::load(path)
        .with_context(|| format!("failed to load scenario {}", path.display()))?;
    let run = scenario
        .build()
        .with_context(|| format!("failed to build scenario {}", path.display()))?;
    Ok((scenario, run))
}

fn check(path: &Path) -> Result<()> {
    let (scenario, run) = load(path)?;

    println!("✅ {} OK", path.display());
    println!(
        "    {} mechanisms @ {} Hz, {} commands, {} tuning updates",
        run.scheduler.len(),
        scenario.loop_config.frequency_hz,
        scenario.commands.len(),
        scenario.tuning.len()
    );
    for spec in &scenario.mechanisms {
        println!("    - {} ({:?} x{})", spec.name, spec.motor, spec.motor_count);
    }
    Ok(())
}

fn simulate(args: &SimulateArgs) -> Result<()> {
    let (scenario, mut run) = load(&args.scenario)?;
    let ticks = args
        .ticks
        .or(scenario.loop_config.max_iterations)
        .unwrap_or(u64::MAX);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_on_signal = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        eprintln!("\nReceived interrupt signal. Stopping...");
        stop_on_signal.store(true, Ordering::Release);
    })
    .context("failed to set signal handler")?;

    let names: Vec<String> = run.scheduler.names().map(str::to_string).collect();
    let mut stdout = io::stdout().lock();
    let mut write_error: Option<io::Error> = None;
    let mut faulty_ticks = 0u64;

    let executed = run.run(ticks, args.realtime, &stop, |scheduler, report| {
        if !report.is_clean() {
            faulty_ticks += 1;
        }
        if !args.json || report.tick % args.every != 0 {
            return;
        }
        for name in &names {
            let Some(frame) = scheduler.mechanism(name).map(|m| m.draw()) else {
                continue;
            };
            let result = serde_json::to_string(&frame)
                .map_err(io::Error::other)
                .and_then(|line| writeln!(stdout, "{}", line));
            if let Err(err) = result {
                // 下游关闭管道时停止
                write_error.get_or_insert(err);
                stop.store(true, Ordering::Release);
                return;
            }
        }
    });

    if let Some(err) = write_error
        && err.kind() != io::ErrorKind::BrokenPipe
    {
        return Err(err).context("failed to write telemetry");
    }

    tracing::info!("Simulation finished after {} ticks", executed);
    if !args.json {
        print_summary(&run, &names, executed, faulty_ticks);
    }
    Ok(())
}

fn print_summary(run: &SimulationRun, names: &[String], executed: u64, faulty_ticks: u64) {
    println!("📊 {} ticks, {} with errors", executed, faulty_ticks);
    println!("    supply: {}", run.supply.voltage());
    for name in names {
        let Some(frame) = run.scheduler.mechanism(name).map(|m| m.draw()) else {
            continue;
        };
        let values: Vec<String> = frame
            .values
            .iter()
            .map(|v| format!("{}={:.3}", v.name, v.value))
            .collect();
        let marker = if frame.faulted { "❌" } else { "✅" };
        println!(
            "  {} {:<12} {:<12} {}",
            marker,
            frame.mechanism,
            frame.lifecycle.to_string(),
            values.join(" ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = include_str!("../scenarios/demo.toml");

    #[test]
    fn test_parse_simulate_args() {
        let cli = Cli::try_parse_from([
            "actuator-cli",
            "simulate",
            "--scenario",
            "demo.toml",
            "--ticks",
            "100",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Simulate { args } => {
                assert_eq!(args.scenario, PathBuf::from("demo.toml"));
                assert_eq!(args.ticks, Some(100));
                assert!(args.json);
                assert!(!args.realtime);
                assert_eq!(args.every, 1);
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_every_must_be_positive() {
        let result = Cli::try_parse_from([
            "actuator-cli",
            "simulate",
            "--scenario",
            "demo.toml",
            "--every",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_scenario_is_required() {
        assert!(Cli::try_parse_from(["actuator-cli", "simulate"]).is_err());
    }

    #[test]
    fn test_demo_scenario_runs() {
        let scenario = ScenarioConfig::from_toml_str(DEMO).unwrap();
        let mut run = scenario.build().unwrap();
        assert_eq!(run.scheduler.len(), 3);

        let stop = AtomicBool::new(false);
        let mut frames = 0;
        let executed = run.run(60, false, &stop, |scheduler, report| {
            assert!(report.is_clean());
            frames += scheduler.names().count();
        });

        assert_eq!(executed, 60);
        assert_eq!(frames, 180);
        let intake = run.scheduler.mechanism("intake").map(|m| m.draw()).unwrap();
        assert_eq!(intake.value("duty"), Some(0.8));
        let arm = run.scheduler.mechanism("arm").unwrap();
        assert_eq!(arm.lifecycle(), Lifecycle::Active);
    }
}
