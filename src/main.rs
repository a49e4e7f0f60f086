use clap::Parser;
use comtrade_harvest::adapters::ui_download::{UiDownloadJob, UiDownloadOutcome};
use comtrade_harvest::config::Command;
use comtrade_harvest::core::country_export::CountryExportOptions;
use comtrade_harvest::core::normalize::Normalizer;
use comtrade_harvest::domain::model::{HarvestOutcome, QueryPartition};
use comtrade_harvest::utils::error::ErrorSeverity;
use comtrade_harvest::utils::{logger, validation::Validate};
use comtrade_harvest::{
    ApiEndpoint, CliConfig, CountryExport, HarvestConfig, HarvestError, HarvestOptions,
    LocalStorage, ReqwestTransport, RetryingFetcher, TokioClock, YearlyHarvest,
};
use std::path::PathBuf;
use std::time::Duration;

async fn run_yearly(config: &HarvestConfig) -> comtrade_harvest::Result<HarvestOutcome> {
    // 缺少金鑰在這裡就失敗，不會進入任何分割
    let endpoint = ApiEndpoint::resolve(
        config.source.mode(),
        &config.source.preview_url,
        &config.source.get_url,
    )?;
    let transport = ReqwestTransport::new(Duration::from_secs(config.source.timeout_seconds))?;
    let fetcher = RetryingFetcher::new(transport, TokioClock, config.retry.clone());

    let query = &config.query;
    let partitions = QueryPartition::for_years(
        &query.reporter_code,
        &query.cmd_code,
        &query.flow_code,
        &query.partner_code,
        query.start_year,
        query.end_year,
    );

    let harvest = YearlyHarvest::new(
        fetcher,
        endpoint,
        Normalizer::new().with_extra_fields(query.extra_fields.clone()),
        LocalStorage::new(config.output.dir.clone()),
        HarvestOptions {
            output_file: config.output_file(),
            courtesy_delay: config.courtesy_delay()?,
            max_partitions: config.output.max_partitions,
        },
    );
    harvest.run(&partitions).await
}

async fn run_by_country(config: &HarvestConfig) -> comtrade_harvest::Result<()> {
    let transport =
        ReqwestTransport::new(Duration::from_secs(config.source.csv_timeout_seconds))?;
    let export = CountryExport::new(
        RetryingFetcher::new(transport, TokioClock, config.retry.clone()),
        LocalStorage::new(config.output.dir.clone()),
        config.source.reporters_url.clone(),
        config.source.classic_csv_url.clone(),
        CountryExportOptions {
            hs_code: config.query.cmd_code.clone(),
            courtesy_delay: config.courtesy_delay()?,
            max_reporters: config.output.max_partitions,
        },
    );

    let summary = export.run().await?;
    tracing::info!(
        "✅ Country export finished: {} files, {} without data, {} failed",
        summary.ok(),
        summary.no_data,
        summary.failed
    );
    Ok(())
}

async fn run_ui_download(config: &HarvestConfig) -> comtrade_harvest::Result<()> {
    let ui = &config.ui_download;
    let job = UiDownloadJob {
        driver: ui.driver.clone(),
        target_url: ui.url.clone(),
        country: ui.country.clone(),
        years: ui.years.clone(),
        columns: ui.columns.clone(),
        hs_code: config.query.cmd_code.clone(),
        download_dir: PathBuf::from(&ui.download_dir),
        timeout: Duration::from_secs(ui.timeout_seconds),
        poll_interval: Duration::from_millis(500),
    };

    match job.run().await? {
        UiDownloadOutcome::Downloaded(path) => {
            tracing::info!("📦 Saved UI download to {}", path.display())
        }
        UiDownloadOutcome::NoNewFile => {
            tracing::warn!("⚠️ No new file appeared within {}s", ui.timeout_seconds)
        }
    }
    Ok(())
}

fn report_and_exit(e: &HarvestError) -> ! {
    tracing::error!(
        "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
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
    std::process::exit(exit_code);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    let run_id = format!("run_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"));
    tracing::info!("Starting comtrade-harvest ({})", run_id);
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    let config = match cli.resolve().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => config,
        Err(e) => report_and_exit(&e),
    };

    let result = match &cli.command {
        Command::Yearly(_) => run_yearly(&config).await.map(|outcome| {
            if let HarvestOutcome::Written {
                partitions_failed, ..
            } = outcome
            {
                if partitions_failed > 0 {
                    tracing::warn!("{} partitions failed and were skipped", partitions_failed);
                }
            }
        }),
        Command::ByCountry(_) => run_by_country(&config).await,
        Command::UiDownload(_) => run_ui_download(&config).await,
    };

    if let Err(e) = result {
        report_and_exit(&e);
    }

    tracing::info!("Finished {}", run_id);
    Ok(())
}
