//! One raw CSV file per reporter country, from the classic Comtrade CSV API.

use crate::core::fetcher::RetryingFetcher;
use crate::domain::model::{ExportSummary, Reporter};
use crate::domain::ports::{ApiRequest, Clock, Storage, Transport};
use crate::utils::error::{HarvestError, Result};
use serde::Deserialize;
use std::time::Duration;

pub const REPORTERS_URL: &str = "https://comtrade.un.org/Data/cache/reporterAreas.json";
pub const CLASSIC_GET_URL: &str = "https://comtrade.un.org/api/get";

#[derive(Debug, Deserialize)]
struct ReporterList {
    #[serde(default)]
    results: Vec<ReporterEntry>,
}

#[derive(Debug, Deserialize)]
struct ReporterEntry {
    id: serde_json::Value,
    #[serde(default)]
    text: String,
}

/// 過濾掉 id <= 0、空名稱與 "All" 之類的彙總項目，並依名稱排序
pub fn parse_reporters(body: &str) -> Result<Vec<Reporter>> {
    let list: ReporterList = serde_json::from_str(body)?;

    let mut reporters: Vec<Reporter> = list
        .results
        .into_iter()
        .filter_map(|entry| {
            let id = match &entry.id {
                serde_json::Value::Number(n) => n.as_i64(),
                serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            }?;
            let name = entry.text.trim().to_string();
            if id > 0 && !name.is_empty() && !name.to_lowercase().contains("all") {
                Some(Reporter { id, name })
            } else {
                None
            }
        })
        .collect();

    reporters.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(reporters)
}

pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if "<>:\"/\\|?*".contains(c) { '_' } else { c })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join("_")
}

/// 204、空白內容或明顯的 "No data" 回應都視為沒有資料
pub fn has_csv_data(status: u16, body: &str) -> bool {
    if status == 204 || body.trim().is_empty() {
        return false;
    }
    let first_line = body.lines().next().unwrap_or_default();
    if !first_line.contains("Classification")
        && (body.contains("No data") || body.contains("Error Message"))
    {
        return false;
    }
    true
}

#[derive(Debug, Clone)]
pub struct CountryExportOptions {
    pub hs_code: String,
    pub courtesy_delay: Duration,
    pub max_reporters: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CountryResult {
    Written(std::path::PathBuf),
    NoData,
}

pub struct CountryExport<T: Transport, C: Clock, S: Storage> {
    fetcher: RetryingFetcher<T, C>,
    storage: S,
    reporters_url: String,
    csv_url: String,
    options: CountryExportOptions,
}

impl<T: Transport, C: Clock, S: Storage> CountryExport<T, C, S> {
    pub fn new(
        fetcher: RetryingFetcher<T, C>,
        storage: S,
        reporters_url: impl Into<String>,
        csv_url: impl Into<String>,
        options: CountryExportOptions,
    ) -> Self {
        Self {
            fetcher,
            storage,
            reporters_url: reporters_url.into(),
            csv_url: csv_url.into(),
            options,
        }
    }

    pub async fn fetch_reporters(&self) -> Result<Vec<Reporter>> {
        let response = self
            .fetcher
            .fetch(&ApiRequest::get(self.reporters_url.clone()))
            .await?;
        parse_reporters(&response.body)
    }

    fn csv_request(&self, reporter: &Reporter) -> ApiRequest {
        let pairs = [
            ("type", "C"),
            ("freq", "A"),
            ("px", "HS"),
            ("ps", "all"),
            ("rg", "all"),
            ("p", "0"),
        ];
        let mut query: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        query.push(("r".to_string(), reporter.id.to_string()));
        query.push(("cc".to_string(), self.options.hs_code.clone()));
        query.push(("fmt".to_string(), "csv".to_string()));

        ApiRequest::get(self.csv_url.clone()).with_query(query)
    }

    async fn export_one(&self, reporter: &Reporter) -> Result<CountryResult> {
        let response = self.fetcher.fetch(&self.csv_request(reporter)).await?;
        if !has_csv_data(response.status, &response.body) {
            return Ok(CountryResult::NoData);
        }

        let filename = format!(
            "comtrade_HS{}_{}_{}.csv",
            self.options.hs_code,
            reporter.id,
            sanitize_filename(&reporter.name)
        );
        self.storage
            .write_file(&filename, response.body.as_bytes())
            .await?;
        Ok(CountryResult::Written(self.storage.full_path(&filename)))
    }

    pub async fn run(&self) -> Result<ExportSummary> {
        println!("Fetching the reporter list from Comtrade…");
        let mut reporters = self.fetch_reporters().await?;
        if reporters.is_empty() {
            return Err(HarvestError::NoReporters {
                url: self.reporters_url.clone(),
            });
        }
        if let Some(max) = self.options.max_reporters {
            reporters.truncate(max);
        }

        let total = reporters.len();
        println!(
            "{} countries to download | HS={}",
            total, self.options.hs_code
        );
        tracing::info!("🚀 Exporting HS {} for {} reporters", self.options.hs_code, total);

        let mut summary = ExportSummary::default();
        for (index, reporter) in reporters.iter().enumerate() {
            let progress = format!("[{}/{}]", index + 1, total);
            match self.export_one(reporter).await {
                Ok(CountryResult::Written(path)) => {
                    println!("{} ✓ {}", progress, reporter.name);
                    tracing::debug!("Wrote {}", path.display());
                    summary.written.push(path);
                }
                Ok(CountryResult::NoData) => {
                    println!("{} – {} (no data)", progress, reporter.name);
                    summary.no_data += 1;
                }
                Err(e) => {
                    println!("{} ✗ {} ({})", progress, reporter.name, e);
                    tracing::warn!("Reporter {} ({}) failed: {}", reporter.name, reporter.id, e);
                    summary.failed += 1;
                }
            }
            self.fetcher.clock().sleep(self.options.courtesy_delay).await;
        }

        println!(
            "Done. Files OK: {} | No data/errors: {}",
            summary.ok(),
            summary.not_ok()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reporters_filters_and_sorts() {
        let body = r#"{"results": [
            {"id": "all", "text": "All"},
            {"id": "0", "text": "World"},
            {"id": "56", "text": "Belgium"},
            {"id": 4, "text": "Afghanistan"},
            {"id": "899", "text": "Areas, nes"},
            {"id": "975", "text": "ASEAN (all)"},
            {"id": "12", "text": "  "}
        ]}"#;

        let reporters = parse_reporters(body).unwrap();
        let names: Vec<&str> = reporters.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Afghanistan", "Areas, nes", "Belgium"]);
        assert_eq!(reporters[2].id, 56);
    }

    #[test]
    fn test_parse_reporters_missing_results() {
        assert!(parse_reporters("{}").unwrap().is_empty());
        assert!(parse_reporters("<html>").is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Bosnia Herzegovina"), "Bosnia_Herzegovina");
        assert_eq!(sanitize_filename("China, Hong Kong SAR"), "China,_Hong_Kong_SAR");
        assert_eq!(sanitize_filename("a/b:c?"), "a_b_c_");
        assert_eq!(sanitize_filename("  two   spaces "), "two_spaces");
    }

    #[test]
    fn test_has_csv_data() {
        assert!(!has_csv_data(204, ""));
        assert!(!has_csv_data(200, "   \n"));
        assert!(!has_csv_data(200, "No data matches your query"));
        assert!(!has_csv_data(200, "Error Message,Something broke"));
        assert!(has_csv_data(200, "Classification,Year\nH4,2015\n"));
        assert!(has_csv_data(200, "Something,Else\n1,2\n"));
    }
}
