use crate::adapters::http::{EndpointMode, GET_URL, PREVIEW_URL};
use crate::adapters::ui_download::DEFAULT_UNDATA_URL;
use crate::core::country_export::{CLASSIC_GET_URL, REPORTERS_URL};
use crate::core::retry::RetryPolicy;
use crate::utils::error::{HarvestError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub source: SourceConfig,
    pub query: QueryConfig,
    pub retry: RetryPolicy,
    pub output: OutputConfig,
    pub ui_download: UiDownloadConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub authenticated: bool,
    pub preview_url: String,
    pub get_url: String,
    pub reporters_url: String,
    pub classic_csv_url: String,
    pub timeout_seconds: u64,
    pub csv_timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            authenticated: false,
            preview_url: PREVIEW_URL.to_string(),
            get_url: GET_URL.to_string(),
            reporters_url: REPORTERS_URL.to_string(),
            classic_csv_url: CLASSIC_GET_URL.to_string(),
            timeout_seconds: 60,
            csv_timeout_seconds: 120,
        }
    }
}

impl SourceConfig {
    pub fn mode(&self) -> EndpointMode {
        if self.authenticated {
            EndpointMode::Authenticated
        } else {
            EndpointMode::Preview
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub reporter_code: String,
    pub cmd_code: String,
    /// M = imports, X = exports
    pub flow_code: String,
    /// 0 = World
    pub partner_code: String,
    pub start_year: i32,
    pub end_year: i32,
    pub extra_fields: Vec<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            reporter_code: "56".to_string(),
            cmd_code: "85".to_string(),
            flow_code: "M".to_string(),
            partner_code: "0".to_string(),
            start_year: 2010,
            end_year: 2024,
            extra_fields: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    /// 未指定時依查詢內容產生檔名
    pub file: Option<String>,
    pub courtesy_delay_secs: f64,
    pub max_partitions: Option<usize>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: ".".to_string(),
            file: None,
            courtesy_delay_secs: 1.2,
            max_partitions: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiDownloadConfig {
    pub driver: Vec<String>,
    pub url: String,
    pub country: String,
    pub years: Vec<String>,
    pub columns: Vec<String>,
    pub download_dir: String,
    pub timeout_seconds: u64,
}

impl Default for UiDownloadConfig {
    fn default() -> Self {
        Self {
            driver: Vec::new(),
            url: DEFAULT_UNDATA_URL.to_string(),
            country: "Greece".to_string(),
            years: vec!["2024".to_string(), "2023".to_string(), "2022".to_string()],
            columns: [
                "Country or Area",
                "Year",
                "Comm. Code",
                "Commodity",
                "Flow Code",
                "Flow",
                "Trade (USD)",
                "Weight (kg)",
                "Quantity Name",
                "Quantity",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            download_dir: "downloads_csv".to_string(),
            timeout_seconds: 120,
        }
    }
}

impl HarvestConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(HarvestError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| HarvestError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${COMTRADE_REPORTER})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| HarvestError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Output file name for the yearly harvest, e.g. `comtrade_56_M_HS85_2010_2024.csv`.
    pub fn output_file(&self) -> String {
        self.output.file.clone().unwrap_or_else(|| {
            format!(
                "comtrade_{}_{}_HS{}_{}_{}.csv",
                self.query.reporter_code,
                self.query.flow_code,
                self.query.cmd_code,
                self.query.start_year,
                self.query.end_year
            )
        })
    }

    pub fn courtesy_delay(&self) -> Result<std::time::Duration> {
        validation::seconds_to_duration("output.courtesy_delay_secs", self.output.courtesy_delay_secs)
    }
}

impl Validate for HarvestConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_endpoint_url("source.preview_url", &self.source.preview_url)?;
        validation::validate_endpoint_url("source.get_url", &self.source.get_url)?;
        validation::validate_endpoint_url("source.reporters_url", &self.source.reporters_url)?;
        validation::validate_endpoint_url("source.classic_csv_url", &self.source.classic_csv_url)?;
        validation::validate_at_least("source.timeout_seconds", self.source.timeout_seconds, 1)?;
        validation::validate_at_least(
            "source.csv_timeout_seconds",
            self.source.csv_timeout_seconds,
            1,
        )?;

        validation::validate_non_empty_string("query.reporter_code", &self.query.reporter_code)?;
        validation::validate_non_empty_string("query.partner_code", &self.query.partner_code)?;
        validation::validate_hs_code("query.cmd_code", &self.query.cmd_code)?;
        validation::validate_flow_code("query.flow_code", &self.query.flow_code)?;
        validation::validate_year_range(self.query.start_year, self.query.end_year)?;

        validation::validate_at_least(
            "retry.max_transient_attempts",
            u64::from(self.retry.max_transient_attempts),
            1,
        )?;

        validation::validate_path("output.dir", &self.output.dir)?;
        if let Some(file) = &self.output.file {
            validation::validate_path("output.file", file)?;
        }
        self.courtesy_delay()?;
        if let Some(max) = self.output.max_partitions {
            validation::validate_at_least("output.max_partitions", max as u64, 1)?;
        }

        validation::validate_at_least(
            "ui_download.timeout_seconds",
            self.ui_download.timeout_seconds,
            1,
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = HarvestConfig::from_toml_str("").unwrap();

        assert_eq!(config, HarvestConfig::default());
        assert_eq!(config.source.preview_url, PREVIEW_URL);
        assert_eq!(config.retry.max_transient_attempts, 3);
        assert_eq!(config.output_file(), "comtrade_56_M_HS85_2010_2024.csv");
        assert_eq!(
            config.courtesy_delay().unwrap(),
            std::time::Duration::from_millis(1200)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[source]
authenticated = true
timeout_seconds = 90

[query]
reporter_code = "251"
flow_code = "X"
start_year = 2015
end_year = 2016
extra_fields = ["customsDesc"]

[retry]
max_transient_attempts = 5
throttle_ceiling_secs = 120

[output]
dir = "./data"
file = "fr_exports.csv"
courtesy_delay_secs = 0.5
"#;

        let config = HarvestConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.source.mode(), EndpointMode::Authenticated);
        assert_eq!(config.source.timeout_seconds, 90);
        assert_eq!(config.query.reporter_code, "251");
        assert_eq!(config.query.cmd_code, "85");
        assert_eq!(config.query.extra_fields, vec!["customsDesc"]);
        assert_eq!(config.retry.max_transient_attempts, 5);
        assert_eq!(config.retry.throttle_ceiling_secs, 120);
        assert_eq!(config.retry.transient_ceiling_secs, 15);
        assert_eq!(config.output_file(), "fr_exports.csv");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_HARVEST_REPORTER", "300");

        let toml_content = r#"
[query]
reporter_code = "${TEST_HARVEST_REPORTER}"
partner_code = "${TEST_HARVEST_UNSET_VAR}"
"#;

        let config = HarvestConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.query.reporter_code, "300");
        assert_eq!(config.query.partner_code, "${TEST_HARVEST_UNSET_VAR}");

        std::env::remove_var("TEST_HARVEST_REPORTER");
    }

    #[test]
    fn test_config_validation() {
        let bad_url = HarvestConfig::from_toml_str("[source]\npreview_url = \"invalid-url\"\n").unwrap();
        assert!(bad_url.validate().is_err());

        let bad_years =
            HarvestConfig::from_toml_str("[query]\nstart_year = 2020\nend_year = 2010\n").unwrap();
        assert!(bad_years.validate().is_err());

        let bad_delay =
            HarvestConfig::from_toml_str("[output]\ncourtesy_delay_secs = -2.0\n").unwrap();
        assert!(bad_delay.validate().is_err());

        let bad_flow = HarvestConfig::from_toml_str("[query]\nflow_code = \"Z\"\n").unwrap();
        assert!(bad_flow.validate().is_err());
    }

    #[test]
    fn test_huge_courtesy_delay_is_rejected_not_panicking() {
        let config =
            HarvestConfig::from_toml_str("[output]\ncourtesy_delay_secs = 1e20\n").unwrap();

        assert!(matches!(
            config.validate(),
            Err(HarvestError::InvalidConfigValueError { .. })
        ));
        assert!(config.courtesy_delay().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = HarvestConfig::from_toml_str("[query\n").unwrap_err();
        assert!(matches!(err, HarvestError::ConfigError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[ui_download]\ncountry = \"Belgium\"\ndriver = [\"python3\", \"drive.py\"]\n")
            .unwrap();

        let config = HarvestConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.ui_download.country, "Belgium");
        assert_eq!(config.ui_download.driver, vec!["python3", "drive.py"]);
        assert_eq!(config.ui_download.timeout_seconds, 120);
    }
}
