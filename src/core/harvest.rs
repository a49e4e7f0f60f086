use crate::adapters::http::ApiEndpoint;
use crate::core::fetcher::RetryingFetcher;
use crate::core::normalize::{column_order, Normalizer};
use crate::domain::model::{HarvestOutcome, QueryPartition, TradeRecord};
use crate::domain::ports::{Clock, Storage, Transport};
use crate::utils::error::{HarvestError, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// 相對於 storage 根目錄的輸出檔名
    pub output_file: String,
    pub courtesy_delay: Duration,
    pub max_partitions: Option<usize>,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            output_file: "comtrade_output.csv".to_string(),
            courtesy_delay: Duration::from_millis(1200),
            max_partitions: None,
        }
    }
}

/// Sequential fetch loop: one request per partition, all rows written once at the end.
pub struct YearlyHarvest<T: Transport, C: Clock, S: Storage> {
    fetcher: RetryingFetcher<T, C>,
    endpoint: ApiEndpoint,
    normalizer: Normalizer,
    storage: S,
    options: HarvestOptions,
}

impl<T: Transport, C: Clock, S: Storage> YearlyHarvest<T, C, S> {
    pub fn new(
        fetcher: RetryingFetcher<T, C>,
        endpoint: ApiEndpoint,
        normalizer: Normalizer,
        storage: S,
        options: HarvestOptions,
    ) -> Self {
        Self {
            fetcher,
            endpoint,
            normalizer,
            storage,
            options,
        }
    }

    async fn harvest_partition(&self, partition: &QueryPartition) -> Result<Vec<TradeRecord>> {
        let request = self.endpoint.request(partition);
        let response = self.fetcher.fetch(&request).await?;
        let payload: serde_json::Value = serde_json::from_str(&response.body)?;
        Ok(self.normalizer.normalize(&payload))
    }

    pub async fn run(&self, partitions: &[QueryPartition]) -> Result<HarvestOutcome> {
        let limit = self
            .options
            .max_partitions
            .unwrap_or(partitions.len())
            .min(partitions.len());
        let partitions = &partitions[..limit];
        let total = partitions.len();

        tracing::info!(
            "🚀 Harvesting {} partitions from {}{}",
            total,
            self.endpoint.url,
            if self.endpoint.is_authenticated() { " (authenticated)" } else { "" }
        );

        let mut records: Vec<TradeRecord> = Vec::new();
        let mut partitions_ok = 0;
        let mut partitions_failed = 0;

        for (index, partition) in partitions.iter().enumerate() {
            println!("[{}/{}] Downloading {}…", index + 1, total, partition.period);
            tracing::debug!("Partition {}", partition);

            match self.harvest_partition(partition).await {
                Ok(batch) => {
                    partitions_ok += 1;
                    tracing::info!("✓ {}: {} rows", partition.period, batch.len());
                    records.extend(batch);
                }
                Err(e) => {
                    partitions_failed += 1;
                    tracing::warn!("⚠️  {}: {}", partition.period, e);
                    println!("⚠️  {}: {}", partition.period, e);
                }
            }

            // 每個分割之後都等待，不論成功與否
            self.fetcher.clock().sleep(self.options.courtesy_delay).await;
        }

        if records.is_empty() {
            tracing::warn!("No data obtained ({} partitions failed)", partitions_failed);
            println!("No data obtained.");
            return Ok(HarvestOutcome::NoData { partitions_failed });
        }

        let bytes = render_csv(&records)?;
        self.storage
            .write_file(&self.options.output_file, &bytes)
            .await?;
        let path = self.storage.full_path(&self.options.output_file);

        println!("✅ File written: {} ({} rows)", path.display(), records.len());
        let outcome = HarvestOutcome::Written {
            path,
            rows: records.len(),
            partitions_ok,
            partitions_failed,
        };
        tracing::info!("✅ {}", outcome);
        Ok(outcome)
    }
}

/// 依 `column_order` 輸出 CSV；缺值為空欄位
pub fn render_csv(records: &[TradeRecord]) -> Result<Vec<u8>> {
    let columns = column_order(records);
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(&columns)?;
    for record in records {
        writer.write_record(
            columns
                .iter()
                .map(|c| record.get(c).map(|cell| cell.render()).unwrap_or_default()),
        )?;
    }

    writer
        .into_inner()
        .map_err(|e| HarvestError::IoError(e.into_error()))
}
