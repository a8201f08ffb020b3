use anyhow::Context;
use biorempp::core::progress::ProgressTracker;
use biorempp::core::ConfigProvider;
use biorempp::utils::error::ErrorSeverity;
use biorempp::utils::{logger, validation::Validate};
use biorempp::{BioremPipeline, CliConfig, EtlEngine, LocalStorage, TomlConfig};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 有指定 TOML 時以檔案為主，命令列只覆蓋輸入檔與監控
    if let Some(path) = cli.config.clone() {
        let mut config = TomlConfig::from_file(&path)
            .with_context(|| format!("Failed to load config file '{}'", path))?;

        if let Some(input) = &cli.input {
            config.input.file = Some(input.clone());
        }

        init_logging(cli.verbose, cli.json_logs || config.json_logs());
        tracing::info!("📁 Loaded configuration from: {}", path);

        let monitor = cli.monitor || config.monitoring_enabled();
        run(config, monitor).await
    } else {
        init_logging(cli.verbose, cli.json_logs);
        if cli.verbose {
            tracing::debug!("CLI config: {:?}", cli);
        }

        let monitor = cli.monitor;
        run(cli, monitor).await
    }
}

fn init_logging(verbose: bool, json: bool) {
    if json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(verbose);
    }
}

async fn run<C>(config: C, monitor_enabled: bool) -> anyhow::Result<()>
where
    C: ConfigProvider + Validate + 'static,
{
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path());
    let tracker = ProgressTracker::with_monitoring(monitor_enabled);
    let pipeline = BioremPipeline::with_tracker(storage, config, tracker);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(report) => {
            tracing::info!("✅ Processing completed successfully!");
            println!("✅ Processing completed successfully!");
            println!("📁 Output saved to: {}", report.output_dir);
            for file in &report.written_files {
                println!("   • {}", file);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "❌ Processing failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
            Ok(())
        }
    }
}
