//! UNdata web UI download, driven by an external browser-automation command.
//!
//! The driver (Selenium, Playwright, ...) is a disposable adapter that lives
//! outside this crate. We hand it the selection through environment variables,
//! then watch the download directory for the file it produces.

use crate::utils::error::{HarvestError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::process::Command;

pub const DEFAULT_UNDATA_URL: &str = "https://data.un.org/Data.aspx?d=ComTrade&f=_l1Code%3a85";

#[derive(Debug, Clone)]
pub struct UiDownloadJob {
    /// Driver program followed by its arguments.
    pub driver: Vec<String>,
    pub target_url: String,
    pub country: String,
    pub years: Vec<String>,
    pub columns: Vec<String>,
    pub hs_code: String,
    pub download_dir: PathBuf,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiDownloadOutcome {
    Downloaded(PathBuf),
    NoNewFile,
}

impl UiDownloadJob {
    /// `undata_HS85_Bosnia_Herzegovina.csv`
    pub fn target_filename(&self) -> String {
        format!(
            "undata_HS{}_{}.csv",
            self.hs_code,
            self.country.replace(' ', "_")
        )
    }

    fn driver_command(&self) -> Result<Command> {
        let (program, args) = self.driver.split_first().ok_or_else(|| {
            HarvestError::MissingConfigError {
                field: "ui_download.driver".to_string(),
            }
        })?;

        let mut command = Command::new(program);
        command
            .args(args)
            .env("UI_TARGET_URL", &self.target_url)
            .env("UI_COUNTRY", &self.country)
            .env("UI_YEARS", self.years.join(","))
            .env("UI_COLUMNS", self.columns.join("|"))
            .env("UI_DOWNLOAD_DIR", &self.download_dir);
        Ok(command)
    }

    pub async fn run(&self) -> Result<UiDownloadOutcome> {
        std::fs::create_dir_all(&self.download_dir)?;
        let before = snapshot_dir(&self.download_dir)?;
        let started = SystemTime::now();
        tracing::info!(
            "🌐 Driving UI download for {} (started {})",
            self.country,
            DateTime::<Utc>::from(started).format("%Y-%m-%d %H:%M:%S")
        );

        // driver 失敗不代表沒有檔案，照樣等待
        match self.driver_command()?.status().await {
            Ok(status) if status.success() => tracing::debug!("Driver exited cleanly"),
            Ok(status) => tracing::warn!("⚠️ Driver exited with {}", status),
            Err(e) => {
                return Err(HarvestError::DownloadError {
                    message: format!("could not launch driver '{}': {}", self.driver[0], e),
                })
            }
        }

        println!("   ⏳ Waiting for file in: {}", self.download_dir.display());
        let found =
            wait_for_new_download(&self.download_dir, &before, self.timeout, self.poll_interval)
                .await?;

        match found {
            Some(path) => {
                let dest = self.download_dir.join(self.target_filename());
                std::fs::rename(&path, &dest)?;
                println!("   ✅ Downloaded → {}", dest.display());
                Ok(UiDownloadOutcome::Downloaded(dest))
            }
            None => {
                println!("   ⚠️ No new file appeared within timeout.");
                Ok(UiDownloadOutcome::NoNewFile)
            }
        }
    }
}

/// 下載目錄中每個一般檔案的修改時間
pub type DirSnapshot = HashMap<PathBuf, SystemTime>;

pub fn snapshot_dir(dir: &Path) -> Result<DirSnapshot> {
    let mut files = HashMap::new();
    if !dir.exists() {
        return Ok(files);
    }

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_file() {
            files.insert(entry.path(), metadata.modified()?);
        }
    }
    Ok(files)
}

/// Newest file that is new or modified compared to `before`.
pub fn newest_changed_file(dir: &Path, before: &DirSnapshot) -> Result<Option<PathBuf>> {
    let newest = snapshot_dir(dir)?
        .into_iter()
        .filter(|(path, modified)| before.get(path) != Some(modified))
        .max_by_key(|(_, modified)| *modified)
        .map(|(path, _)| path);
    Ok(newest)
}

fn is_complete(path: &Path) -> bool {
    if path.extension().is_some_and(|ext| ext == "part") {
        return false;
    }
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    !Path::new(&part).exists()
}

/// Polls `dir` until a completed file that was not in `before` shows up.
pub async fn wait_for_new_download(
    dir: &Path,
    before: &DirSnapshot,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Option<PathBuf>> {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if let Some(path) = newest_changed_file(dir, before)? {
            if is_complete(&path) {
                return Ok(Some(path));
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(poll_interval).await;
    }
}
