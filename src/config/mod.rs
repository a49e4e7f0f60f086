pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli_args::*;

#[cfg(feature = "cli")]
mod cli_args {
    use super::toml_config::HarvestConfig;
    use crate::utils::error::Result;
    use clap::{Args, Parser, Subcommand};

    #[derive(Debug, Clone, Parser)]
    #[command(name = "comtrade-harvest")]
    #[command(about = "Download UN Comtrade trade statistics to CSV")]
    pub struct CliConfig {
        /// Path to a TOML configuration file
        #[arg(short, long, global = true)]
        pub config: Option<String>,

        #[arg(short, long, global = true, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, global = true, help = "Emit logs as JSON")]
        pub json_logs: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// One request per year, normalized into a single CSV
        Yearly(YearlyArgs),
        /// One raw CSV file per reporter country
        ByCountry(ByCountryArgs),
        /// Run an external browser driver and collect the file it downloads
        UiDownload(UiDownloadArgs),
    }

    #[derive(Debug, Clone, Default, Args)]
    pub struct YearlyArgs {
        /// Output directory
        #[arg(long = "out")]
        pub out_dir: Option<String>,

        /// Output file name inside the output directory
        #[arg(long)]
        pub output_file: Option<String>,

        /// HS code (e.g. 85, 8542, TOTAL)
        #[arg(long = "hs")]
        pub hs_code: Option<String>,

        #[arg(long)]
        pub reporter: Option<String>,

        /// M = imports, X = exports
        #[arg(long)]
        pub flow: Option<String>,

        #[arg(long)]
        pub start_year: Option<i32>,

        #[arg(long)]
        pub end_year: Option<i32>,

        /// Pause between requests, in seconds
        #[arg(long = "sleep")]
        pub delay_secs: Option<f64>,

        /// Only process the first N years (for testing)
        #[arg(long = "max")]
        pub max_partitions: Option<usize>,

        /// Use the keyed `get` endpoint (needs COMTRADE_API_KEY)
        #[arg(long)]
        pub authenticated: bool,
    }

    #[derive(Debug, Clone, Default, Args)]
    pub struct ByCountryArgs {
        #[arg(long = "out")]
        pub out_dir: Option<String>,

        #[arg(long = "hs")]
        pub hs_code: Option<String>,

        #[arg(long = "sleep")]
        pub delay_secs: Option<f64>,

        /// Only process the first N countries (for testing)
        #[arg(long = "max")]
        pub max_partitions: Option<usize>,
    }

    #[derive(Debug, Clone, Default, Args)]
    pub struct UiDownloadArgs {
        /// Driver command, e.g. --driver python3 --driver undata.py
        #[arg(long, allow_hyphen_values = true)]
        pub driver: Vec<String>,

        #[arg(long)]
        pub country: Option<String>,

        #[arg(long, value_delimiter = ',')]
        pub years: Vec<String>,

        #[arg(long, value_delimiter = '|')]
        pub columns: Vec<String>,

        #[arg(long)]
        pub download_dir: Option<String>,

        #[arg(long)]
        pub timeout: Option<u64>,
    }

    impl CliConfig {
        /// 載入 TOML (若有) 並套用命令列覆寫
        pub fn resolve(&self) -> Result<HarvestConfig> {
            let mut config = match &self.config {
                Some(path) => HarvestConfig::from_file(path)?,
                None => HarvestConfig::default(),
            };
            self.command.apply(&mut config);
            Ok(config)
        }
    }

    impl Command {
        pub fn apply(&self, config: &mut HarvestConfig) {
            match self {
                Command::Yearly(args) => {
                    if let Some(dir) = &args.out_dir {
                        config.output.dir = dir.clone();
                    }
                    if let Some(file) = &args.output_file {
                        config.output.file = Some(file.clone());
                    }
                    if let Some(hs) = &args.hs_code {
                        config.query.cmd_code = hs.clone();
                    }
                    if let Some(reporter) = &args.reporter {
                        config.query.reporter_code = reporter.clone();
                    }
                    if let Some(flow) = &args.flow {
                        config.query.flow_code = flow.clone();
                    }
                    if let Some(start) = args.start_year {
                        config.query.start_year = start;
                    }
                    if let Some(end) = args.end_year {
                        config.query.end_year = end;
                    }
                    if let Some(delay) = args.delay_secs {
                        config.output.courtesy_delay_secs = delay;
                    }
                    if args.max_partitions.is_some() {
                        config.output.max_partitions = args.max_partitions;
                    }
                    if args.authenticated {
                        config.source.authenticated = true;
                    }
                }
                Command::ByCountry(args) => {
                    match &args.out_dir {
                        Some(dir) => config.output.dir = dir.clone(),
                        None if config.output.dir == "." => {
                            config.output.dir = "data_comtrade".to_string()
                        }
                        None => {}
                    }
                    if let Some(hs) = &args.hs_code {
                        config.query.cmd_code = hs.clone();
                    }
                    if let Some(delay) = args.delay_secs {
                        config.output.courtesy_delay_secs = delay;
                    }
                    if args.max_partitions.is_some() {
                        config.output.max_partitions = args.max_partitions;
                    }
                }
                Command::UiDownload(args) => {
                    let ui = &mut config.ui_download;
                    if !args.driver.is_empty() {
                        ui.driver = args.driver.clone();
                    }
                    if let Some(country) = &args.country {
                        ui.country = country.clone();
                    }
                    if !args.years.is_empty() {
                        ui.years = args.years.clone();
                    }
                    if !args.columns.is_empty() {
                        ui.columns = args.columns.clone();
                    }
                    if let Some(dir) = &args.download_dir {
                        ui.download_dir = dir.clone();
                    }
                    if let Some(timeout) = args.timeout {
                        ui.timeout_seconds = timeout;
                    }
                }
            }
        }
    }

}
