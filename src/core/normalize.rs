//! Normalization of Comtrade JSON rows into [`TradeRecord`]s.

use crate::domain::model::{Cell, RawRow, TradeRecord};
use serde_json::Value;

/// 保留的來源欄位及輸出名稱 (source, output)
pub const FIELD_MAP: &[(&str, &str)] = &[
    ("period", "year"),
    ("reporterDesc", "reporter"),
    ("partnerDesc", "partner"),
    ("cmdCode", "cmdCode"),
    ("cmdDesc", "hs_desc_en"),
    ("flowCode", "flowCode"),
    ("flowDesc", "flowDesc"),
    ("primaryValue", "trade_value_usd"),
    ("netWgt", "net_weight_kg"),
    ("qty", "qty"),
    ("qtyUnit", "qtyUnit"),
    ("reporterCode", "reporterCode"),
    ("reporterISO", "reporterISO"),
    ("partnerCode", "partnerCode"),
    ("partnerISO", "partnerISO"),
];

pub const NUMERIC_COLUMNS: &[&str] = &["year", "trade_value_usd", "net_weight_kg", "qty"];

pub const PREFERRED_ORDER: &[&str] = &[
    "year",
    "reporter",
    "partner",
    "flowDesc",
    "cmdCode",
    "hs_desc_en",
    "trade_value_usd",
    "net_weight_kg",
    "qty",
    "qtyUnit",
    "reporterCode",
    "reporterISO",
    "partnerCode",
    "partnerISO",
    "flowCode",
];

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    extra_fields: Vec<String>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also keep these source fields, under their own names, as text.
    pub fn with_extra_fields(mut self, extra_fields: Vec<String>) -> Self {
        self.extra_fields = extra_fields
            .into_iter()
            .filter(|f| !FIELD_MAP.iter().any(|(source, _)| *source == f.as_str()))
            .collect();
        self
    }

    pub fn normalize_row(&self, row: &RawRow) -> TradeRecord {
        let mut record = TradeRecord::new();

        for (source, output) in FIELD_MAP {
            if let Some(value) = row.get(*source) {
                let cell = if NUMERIC_COLUMNS.contains(output) {
                    parse_numeric(value)
                } else {
                    to_text(value)
                };
                record.push(*output, cell);
            }
        }

        for extra in &self.extra_fields {
            if let Some(value) = row.get(extra) {
                record.push(extra.clone(), to_text(value));
            }
        }

        record
    }

    pub fn normalize(&self, payload: &Value) -> Vec<TradeRecord> {
        extract_rows(payload)
            .into_iter()
            .map(|row| self.normalize_row(row))
            .collect()
    }
}

/// `data` 缺少、為 null 或非陣列時回傳空集合
pub fn extract_rows(payload: &Value) -> Vec<&RawRow> {
    match payload.get("data") {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    }
}

/// Lenient numeric parse: numbers and numeric strings, anything else is missing.
pub fn parse_numeric(value: &Value) -> Cell {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(n) if n.is_finite() => Cell::Number(n),
        _ => Cell::Missing,
    }
}

fn to_text(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Missing,
        Value::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

/// 偏好欄位在前 (僅限出現過的)，其餘依首次出現順序接在後面
pub fn column_order(records: &[TradeRecord]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for record in records {
        for column in record.columns() {
            if !seen.iter().any(|c| c == column) {
                seen.push(column.to_string());
            }
        }
    }

    let mut ordered: Vec<String> = PREFERRED_ORDER
        .iter()
        .filter(|c| seen.iter().any(|s| s.as_str() == **c))
        .map(|c| c.to_string())
        .collect();
    ordered.extend(
        seen.into_iter()
            .filter(|c| !PREFERRED_ORDER.contains(&c.as_str())),
    );
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> RawRow {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_known_fields_are_renamed_and_parsed() {
        let record = Normalizer::new().normalize_row(&row(json!({
            "period": 2012,
            "primaryValue": "1000.5",
            "netWgt": "abc",
            "reporterDesc": "Belgium",
            "reporterCode": 56
        })));

        assert_eq!(record.number("year"), Some(2012.0));
        assert_eq!(record.number("trade_value_usd"), Some(1000.5));
        assert_eq!(record.get("net_weight_kg"), Some(&Cell::Missing));
        assert_eq!(record.number("net_weight_kg"), None);
        assert_eq!(record.text("reporter"), Some("Belgium"));
        assert_eq!(record.text("reporterCode"), Some("56"));
    }

    #[test]
    fn test_unknown_fields_are_dropped() {
        let record = Normalizer::new().normalize_row(&row(json!({
            "period": "2015",
            "cifvalue": 12.0,
            "isAggregate": true,
            "cmdCode": "85"
        })));

        let columns: Vec<&str> = record.columns().collect();
        assert_eq!(columns, vec!["year", "cmdCode"]);
        for column in record.columns() {
            assert!(FIELD_MAP.iter().any(|(_, output)| *output == column));
        }
    }

    #[test]
    fn test_extra_fields_are_kept() {
        let normalizer = Normalizer::new().with_extra_fields(vec![
            "customsDesc".to_string(),
            "period".to_string(),
        ]);
        let record = normalizer.normalize_row(&row(json!({
            "period": 2020,
            "customsDesc": "TOTAL CPC"
        })));

        let columns: Vec<&str> = record.columns().collect();
        assert_eq!(columns, vec!["year", "customsDesc"]);
    }

    #[test]
    fn test_parse_numeric_is_lenient() {
        assert_eq!(parse_numeric(&json!(" 42 ")), Cell::Number(42.0));
        assert_eq!(parse_numeric(&json!("1e3")), Cell::Number(1000.0));
        assert_eq!(parse_numeric(&json!(7.25)), Cell::Number(7.25));
        assert_eq!(parse_numeric(&json!("")), Cell::Missing);
        assert_eq!(parse_numeric(&json!("NaN")), Cell::Missing);
        assert_eq!(parse_numeric(&json!(null)), Cell::Missing);
        assert_eq!(parse_numeric(&json!(true)), Cell::Missing);
        assert_eq!(parse_numeric(&json!({"v": 1})), Cell::Missing);
    }

    #[test]
    fn test_null_text_is_missing() {
        let record = Normalizer::new().normalize_row(&row(json!({"qtyUnit": null})));
        assert_eq!(record.get("qtyUnit"), Some(&Cell::Missing));
    }

    #[test]
    fn test_empty_or_absent_data_yields_no_records() {
        let normalizer = Normalizer::new();
        assert!(normalizer.normalize(&json!({"data": []})).is_empty());
        assert!(normalizer.normalize(&json!({"data": null})).is_empty());
        assert!(normalizer.normalize(&json!({"count": 0})).is_empty());
        assert!(normalizer.normalize(&json!({"data": "oops"})).is_empty());
    }

    #[test]
    fn test_rows_are_not_deduplicated() {
        let payload = json!({"data": [
            {"period": 2010, "primaryValue": 1},
            {"period": 2010, "primaryValue": 1},
            "not an object"
        ]});
        assert_eq!(Normalizer::new().normalize(&payload).len(), 2);
    }

    #[test]
    fn test_column_order_prefers_known_columns() {
        let normalizer = Normalizer::new().with_extra_fields(vec!["zExtra".to_string()]);
        let records = normalizer.normalize(&json!({"data": [
            {"flowCode": "M", "zExtra": "x", "partnerDesc": "World", "period": 2010},
            {"reporterDesc": "Belgium", "primaryValue": 5}
        ]}));

        assert_eq!(
            column_order(&records),
            vec!["year", "reporter", "partner", "trade_value_usd", "flowCode", "zExtra"]
        );
    }
}
