use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// 一次請求對應的查詢分割 (年度或申報國)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryPartition {
    pub reporter_code: String,
    pub cmd_code: String,
    pub flow_code: String,
    pub partner_code: String,
    pub period: String,
}

impl QueryPartition {
    /// One partition per calendar year in `start..=end`.
    pub fn for_years(
        reporter_code: &str,
        cmd_code: &str,
        flow_code: &str,
        partner_code: &str,
        start: i32,
        end: i32,
    ) -> Vec<QueryPartition> {
        (start..=end)
            .map(|year| QueryPartition {
                reporter_code: reporter_code.to_string(),
                cmd_code: cmd_code.to_string(),
                flow_code: flow_code.to_string(),
                partner_code: partner_code.to_string(),
                period: year.to_string(),
            })
            .collect()
    }

    /// 查詢參數，順序固定
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("cmdCode".to_string(), self.cmd_code.clone()),
            ("flowCode".to_string(), self.flow_code.clone()),
            ("partnerCode".to_string(), self.partner_code.clone()),
            ("reporterCode".to_string(), self.reporter_code.clone()),
            ("period".to_string(), self.period.clone()),
        ]
    }
}

impl fmt::Display for QueryPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reporter={} cmd={} flow={} partner={} period={}",
            self.reporter_code, self.cmd_code, self.flow_code, self.partner_code, self.period
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reporter {
    pub id: i64,
    pub name: String,
}

/// A source row exactly as the API returned it.
pub type RawRow = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Missing,
}

impl Cell {
    /// CSV 呈現：整數不帶小數點，缺值為空字串
    pub fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Missing => String::new(),
        }
    }
}

/// 正規化後的貿易紀錄，只包含來源中出現的欄位
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeRecord {
    fields: Vec<(String, Cell)>,
}

impl TradeRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, cell: Cell) {
        self.fields.push((column.into(), cell));
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    /// `None` when the column is absent or its value is missing.
    pub fn number(&self, column: &str) -> Option<f64> {
        match self.get(column) {
            Some(Cell::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        match self.get(column) {
            Some(Cell::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HarvestOutcome {
    Written {
        path: PathBuf,
        rows: usize,
        partitions_ok: usize,
        partitions_failed: usize,
    },
    NoData {
        partitions_failed: usize,
    },
}

impl fmt::Display for HarvestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarvestOutcome::Written { path, rows, .. } => {
                write!(f, "{} rows written to {}", rows, path.display())
            }
            HarvestOutcome::NoData { .. } => write!(f, "no data obtained"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub written: Vec<PathBuf>,
    pub no_data: usize,
    pub failed: usize,
}

impl ExportSummary {
    pub fn ok(&self) -> usize {
        self.written.len()
    }

    pub fn not_ok(&self) -> usize {
        self.no_data + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partitions_for_years_are_unique_and_ordered() {
        let parts = QueryPartition::for_years("56", "85", "M", "0", 2010, 2012);
        let periods: Vec<&str> = parts.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["2010", "2011", "2012"]);
        assert!(parts.iter().all(|p| p.reporter_code == "56" && p.flow_code == "M"));
    }

    #[test]
    fn test_empty_year_range() {
        assert!(QueryPartition::for_years("56", "85", "M", "0", 2012, 2010).is_empty());
    }

    #[test]
    fn test_query_pairs() {
        let part = QueryPartition::for_years("56", "85", "M", "0", 2015, 2015).remove(0);
        let pairs = part.query_pairs();
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["cmdCode", "flowCode", "partnerCode", "reporterCode", "period"]
        );
        assert_eq!(pairs[4].1, "2015");
    }

    #[test]
    fn test_cell_render() {
        assert_eq!(Cell::Number(2012.0).render(), "2012");
        assert_eq!(Cell::Number(1000.5).render(), "1000.5");
        assert_eq!(Cell::Missing.render(), "");
        assert_eq!(Cell::Text("Belgium".into()).render(), "Belgium");
    }

    #[test]
    fn test_outcome_display() {
        let written = HarvestOutcome::Written {
            path: PathBuf::from("out.csv"),
            rows: 2,
            partitions_ok: 1,
            partitions_failed: 0,
        };
        assert_eq!(written.to_string(), "2 rows written to out.csv");
        assert_eq!(
            HarvestOutcome::NoData { partitions_failed: 3 }.to_string(),
            "no data obtained"
        );
    }
}
