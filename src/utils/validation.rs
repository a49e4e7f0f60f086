use crate::utils::error::{HarvestError, Result};
use chrono::Datelike;
use std::time::Duration;
use url::Url;

/// Comtrade 最早的年度資料
pub const FIRST_COMTRADE_YEAR: i32 = 1962;

/// courtesy delay 與 timeout 的上限 (一小時)
pub const MAX_WAIT_SECS: f64 = 3600.0;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> HarvestError {
    HarvestError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Endpoint URLs must be absolute http(s) URLs with a host.
pub fn validate_endpoint_url(field_name: &str, url_str: &str) -> Result<()> {
    let url = Url::parse(url_str)
        .map_err(|e| invalid(field_name, url_str, format!("Invalid URL format: {}", e)))?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        "http" | "https" => Err(invalid(field_name, url_str, "URL has no host")),
        scheme => Err(invalid(
            field_name,
            url_str,
            format!("Unsupported URL scheme: {}", scheme),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }
    Ok(())
}

pub fn validate_at_least(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

/// 非負、有限且不超過 [`MAX_WAIT_SECS`] 的秒數轉成 `Duration`
pub fn seconds_to_duration(field_name: &str, value: f64) -> Result<Duration> {
    if value > MAX_WAIT_SECS {
        return Err(invalid(
            field_name,
            value,
            format!("Seconds must not exceed {}", MAX_WAIT_SECS),
        ));
    }
    Duration::try_from_secs_f64(value)
        .map_err(|_| invalid(field_name, value, "Seconds must be a finite, non-negative number"))
}

/// HS codes: `TOTAL`, `AG2`..`AG6`, or 2 to 6 digits; several may be comma-separated.
pub fn validate_hs_code(field_name: &str, value: &str) -> Result<()> {
    let valid = value.split(',').map(str::trim).all(|code| {
        code == "TOTAL"
            || matches!(code, "AG2" | "AG4" | "AG6")
            || ((2..=6).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit()))
    });
    if !valid {
        return Err(invalid(
            field_name,
            value,
            "Expected TOTAL, AG2/AG4/AG6 or a 2 to 6 digit HS code",
        ));
    }
    Ok(())
}

/// M = imports, X = exports, RM/RX = re-imports/re-exports
pub fn validate_flow_code(field_name: &str, value: &str) -> Result<()> {
    match value {
        "M" | "X" | "RM" | "RX" => Ok(()),
        _ => Err(invalid(field_name, value, "Flow must be one of M, X, RM, RX")),
    }
}

/// `start..=end` inside the years Comtrade can have data for.
pub fn validate_year_range(start: i32, end: i32) -> Result<()> {
    let latest = chrono::Utc::now().year();
    if !(FIRST_COMTRADE_YEAR..=latest).contains(&start) {
        return Err(invalid(
            "query.start_year",
            start,
            format!("Year must be between {} and {}", FIRST_COMTRADE_YEAR, latest),
        ));
    }
    if end < start || end > latest {
        return Err(invalid(
            "query.end_year",
            end,
            format!("Year must be between {} and {}", start, latest),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_endpoint_url() {
        assert!(validate_endpoint_url("source.preview_url", "https://comtradeapi.un.org/x").is_ok());
        assert!(validate_endpoint_url("source.preview_url", "http://127.0.0.1:8080/x").is_ok());
        assert!(validate_endpoint_url("source.preview_url", "").is_err());
        assert!(validate_endpoint_url("source.preview_url", "invalid-url").is_err());
        assert!(validate_endpoint_url("source.preview_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_seconds_to_duration() {
        let field = "output.courtesy_delay_secs";
        assert_eq!(
            seconds_to_duration(field, 1.2).unwrap(),
            Duration::from_millis(1200)
        );
        assert_eq!(seconds_to_duration(field, 0.0).unwrap(), Duration::ZERO);
        assert!(seconds_to_duration(field, -1.0).is_err());
        assert!(seconds_to_duration(field, f64::NAN).is_err());
        assert!(seconds_to_duration(field, f64::INFINITY).is_err());
        assert!(matches!(
            seconds_to_duration(field, 1e20),
            Err(HarvestError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_validate_hs_code() {
        for ok in ["85", "8542", "854231", "TOTAL", "AG2", "84,85"] {
            assert!(validate_hs_code("query.cmd_code", ok).is_ok(), "{}", ok);
        }
        for bad in ["", "8", "8542311", "HS85", "85,", "total"] {
            assert!(validate_hs_code("query.cmd_code", bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_validate_flow_code() {
        assert!(validate_flow_code("query.flow_code", "M").is_ok());
        assert!(validate_flow_code("query.flow_code", "X").is_ok());
        assert!(validate_flow_code("query.flow_code", "imports").is_err());
    }

    #[test]
    fn test_validate_year_range() {
        assert!(validate_year_range(2010, 2024).is_ok());
        assert!(validate_year_range(2015, 2015).is_ok());
        assert!(validate_year_range(1800, 2010).is_err());
        assert!(validate_year_range(2020, 2010).is_err());
        assert!(validate_year_range(2010, 3000).is_err());
    }

    #[test]
    fn test_validate_at_least_and_non_empty() {
        assert!(validate_at_least("output.max_partitions", 5, 1).is_ok());
        assert!(validate_at_least("output.max_partitions", 0, 1).is_err());
        assert!(validate_non_empty_string("query.reporter_code", "56").is_ok());
        assert!(validate_non_empty_string("query.reporter_code", "  ").is_err());
        assert!(validate_path("output.dir", "./data").is_ok());
        assert!(validate_path("output.dir", "").is_err());
    }
}
