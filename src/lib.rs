pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::cli::LocalStorage;
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::toml_config::HarvestConfig;

pub use adapters::clock::TokioClock;
pub use adapters::http::{ApiEndpoint, ReqwestTransport};
pub use crate::core::{
    country_export::CountryExport,
    fetcher::RetryingFetcher,
    harvest::{HarvestOptions, YearlyHarvest},
    retry::RetryPolicy,
};
pub use utils::error::{HarvestError, Result};
