use crate::errors::{DataSyncError, Result};
use chrono::NaiveDate;

// 日期转换工具：行情接口使用YYYYMMDD格式的紧凑日期
pub fn parse_compact_date(date_str: &str) -> Result<NaiveDate> {
    if date_str.len() != 8 {
        return Err(DataSyncError::DataError(format!(
            "Invalid date format: {}",
            date_str
        )));
    }

    let year = date_str[0..4]
        .parse::<i32>()
        .map_err(|e| DataSyncError::DataError(e.to_string()))?;
    let month = date_str[4..6]
        .parse::<u32>()
        .map_err(|e| DataSyncError::DataError(e.to_string()))?;
    let day = date_str[6..8]
        .parse::<u32>()
        .map_err(|e| DataSyncError::DataError(e.to_string()))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| DataSyncError::DataError(format!("Invalid date: {}-{}-{}", year, month, day)))
}

pub fn compact_date(date: &NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compact_dates() {
        let date = parse_compact_date("20240105").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(compact_date(&date), "20240105");
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(parse_compact_date("2024-01-05").is_err());
        assert!(parse_compact_date("202401").is_err());
        assert!(parse_compact_date("20241340").is_err());
    }
}
