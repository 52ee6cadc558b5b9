use clap::{Parser, Subcommand};
use fetchwatch::config::{ConfigLoader, ExecutionMode};
use fetchwatch::crawler::CrawlerEngine;
use fetchwatch::monitor::{Monitor, MonitorConfig};
use indicatif::MultiProgress;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fetchwatch")]
#[command(version = "0.1.0")]
#[command(about = "Monitored URL fetcher with retry and bounded concurrency", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every URL of a session config
    Run {
        /// Path to the configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Show a progress bar (stderr)
        #[arg(short, long)]
        progress: bool,
    },
    /// Validate a configuration file
    Check {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info"); }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let multi = MultiProgress::new();

    match cli.command {
        Commands::Run { config, progress } => {
            if progress {
                indicatif_log_bridge::LogWrapper::new(multi.clone(), logger).try_init()?;
            } else {
                let level = logger.filter();
                log::set_boxed_logger(Box::new(logger))?;
                log::set_max_level(level);
            }

            log::info!("Loading config from {:?}", config);
            let config_data = ConfigLoader::load(&config)?;
            log::info!("Loaded session: {}", config_data.name);

            let bars = progress.then(|| multi.clone());
            let output = ConfigLoader::create_output(&config_data, bars.clone())?;

            let mut monitor = Monitor::new(
                config_data.name.clone(),
                MonitorConfig::from(&config_data.monitoring),
            );
            if let Some(bars) = bars {
                monitor = monitor.with_progress_bars(bars);
            }

            let mut engine = CrawlerEngine::new(config_data)?
                .with_monitor(monitor)
                .with_output(output);
            let run = engine.run().await?;

            let metrics = &run.report.metrics;
            let stats = &run.executor_stats;
            println!("\n✅ Session Completed: {}", run.report.session_name);
            println!("   URLs: {}", run.outcomes.len());
            println!(
                "   Succeeded: {} | Failed: {} | Invalid: {}",
                metrics.successful_requests, metrics.failed_requests, stats.invalid_urls
            );
            println!("   Success Rate: {:.1}%", metrics.success_rate);
            println!("   Average Response: {:.3}s", metrics.average_response_time);
            println!("   Requests Made: {}", stats.requests_made);
            println!("   Delay Charged: {:.1}s", stats.total_delay_secs);
            println!(
                "   Total Time: {:.1}s",
                metrics.duration_seconds.unwrap_or_default()
            );
            if let Some(system) = &run.report.system_performance {
                println!(
                    "   CPU avg: {:.1}% | Memory avg: {:.1}%",
                    system.avg_cpu_percent, system.avg_memory_percent
                );
            }
            for alert in &run.report.alerts {
                println!("   ⚠ {}", alert);
            }
        }
        Commands::Check { config } => match ConfigLoader::load(&config) {
            Ok(cfg) => {
                println!("✅ Config is valid:");
                println!("   Name: {}", cfg.name);
                println!("   URLs: {}", cfg.urls.len());
                match cfg.mode {
                    ExecutionMode::Sequential => println!(
                        "   Mode: sequential (retries: {}, delay: {}ms)",
                        cfg.max_retries, cfg.delay_ms
                    ),
                    ExecutionMode::Concurrent => println!(
                        "   Mode: concurrent (max: {}, delay: {}ms)",
                        cfg.max_concurrent, cfg.delay_ms
                    ),
                }
            }
            Err(e) => {
                eprintln!("❌ Config error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
