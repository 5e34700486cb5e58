use crate::errors::{DataSyncError, Result};
use crate::models::market::{CompanyProfile, DailyBar, Instrument, TradeCalendarEntry};
use crate::provider::base::{MarketDataProvider, Pacer};
use crate::util;
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "http://api.tushare.pro";

const STOCK_BASIC_FIELDS: &str = "ts_code,symbol,name,area,industry,list_date";
const DAILY_FIELDS: &str = "ts_code,trade_date,open,high,low,close,pre_close,change,pct_chg,vol,amount";
const COMPANY_FIELDS: &str = "ts_code,exchange,chairman,manager,secretary,reg_capital,setup_date,province";
const CALENDAR_FIELDS: &str = "exchange,cal_date,is_open,pretrade_date";

/// Tushare Pro行情接口客户端
///
/// 所有请求共享同一个节流器；瞬时错误和频率限制错误按指数退避重试，
/// 认证错误直接返回。
pub struct TushareClient {
    client: Client,
    endpoint: String,
    token: String,
    pacer: Pacer,
    max_retries: u32,
    retry_backoff: Duration,
}

impl TushareClient {
    /// 创建新的Tushare客户端
    pub fn new(token: &str, pace_interval: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(DataSyncError::RequestError)?;

        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: token.to_string(),
            pacer: Pacer::new(pace_interval),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
        })
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = backoff;
        self
    }

    /// 调用一个接口并返回按字段名索引的结果表
    async fn query(&self, api_name: &str, params: Value, fields: &str) -> Result<ResultTable> {
        let mut attempt = 0u32;
        loop {
            self.pacer.pause().await;

            match self.query_once(api_name, &params, fields).await {
                Ok(table) => return Ok(table),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let backoff = self.retry_backoff * 2u32.saturating_pow(attempt);
                    warn!(
                        "{} request failed ({}), retry {}/{} in {:?}",
                        api_name,
                        e,
                        attempt + 1,
                        self.max_retries,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn query_once(&self, api_name: &str, params: &Value, fields: &str) -> Result<ResultTable> {
        debug!("Calling {} with params {}", api_name, params);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "api_name": api_name,
                "token": self.token,
                "params": params,
                "fields": fields,
            }))
            .send()
            .await
            .map_err(DataSyncError::RequestError)?
            .error_for_status()
            .map_err(DataSyncError::RequestError)?;

        let body: Value = response.json().await.map_err(DataSyncError::RequestError)?;
        parse_response(api_name, &body)
    }
}

#[async_trait]
impl MarketDataProvider for TushareClient {
    async fn fetch_stock_basic(&self) -> Result<Vec<Instrument>> {
        let table = self
            .query(
                "stock_basic",
                json!({"exchange": "", "list_status": "L"}),
                STOCK_BASIC_FIELDS,
            )
            .await?;

        let mut instruments = Vec::new();
        for row in &table.rows {
            let ts_code = match table.str_field(row, "ts_code") {
                Some(code) => code,
                None => continue,
            };
            instruments.push(Instrument {
                ts_code,
                symbol: table.str_field(row, "symbol"),
                name: table.str_field(row, "name"),
                area: table.str_field(row, "area"),
                industry: table.str_field(row, "industry"),
                list_date: table.date_field(row, "list_date"),
            });
        }

        info!("Fetched {} listed instruments", instruments.len());
        Ok(instruments)
    }

    async fn fetch_daily_bars(
        &self,
        ts_code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>> {
        let table = self
            .query(
                "daily",
                json!({
                    "ts_code": ts_code,
                    "start_date": util::compact_date(&start),
                    "end_date": util::compact_date(&end),
                }),
                DAILY_FIELDS,
            )
            .await?;

        let bars = bars_from_table(&table);
        debug!("Fetched {} bars for {}", bars.len(), ts_code);
        Ok(bars)
    }

    async fn fetch_daily_by_date(&self, trade_date: NaiveDate) -> Result<Vec<DailyBar>> {
        let table = self
            .query(
                "daily",
                json!({"trade_date": util::compact_date(&trade_date)}),
                DAILY_FIELDS,
            )
            .await?;

        let bars = bars_from_table(&table);
        debug!("Fetched {} bars for trade date {}", bars.len(), trade_date);
        Ok(bars)
    }

    async fn fetch_company_profiles(&self, exchange: &str) -> Result<Vec<CompanyProfile>> {
        let table = self
            .query(
                "stock_company",
                json!({"exchange": exchange}),
                COMPANY_FIELDS,
            )
            .await?;

        let mut profiles = Vec::new();
        for row in &table.rows {
            let ts_code = match table.str_field(row, "ts_code") {
                Some(code) => code,
                None => continue,
            };
            profiles.push(CompanyProfile {
                ts_code,
                exchange: table.str_field(row, "exchange"),
                chairman: table.str_field(row, "chairman"),
                manager: table.str_field(row, "manager"),
                secretary: table.str_field(row, "secretary"),
                reg_capital: table.str_field(row, "reg_capital"),
                setup_date: table.str_field(row, "setup_date"),
                province: table.str_field(row, "province"),
            });
        }

        info!("Fetched {} company profiles", profiles.len());
        Ok(profiles)
    }

    async fn fetch_trade_calendar(
        &self,
        exchange: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradeCalendarEntry>> {
        let table = self
            .query(
                "trade_cal",
                json!({
                    "exchange": exchange,
                    "start_date": util::compact_date(&start),
                    "end_date": util::compact_date(&end),
                }),
                CALENDAR_FIELDS,
            )
            .await?;

        let mut entries = Vec::new();
        for row in &table.rows {
            let cal_date = match table.date_field(row, "cal_date") {
                Some(date) => date,
                None => continue,
            };
            entries.push(TradeCalendarEntry {
                exchange: table.str_field(row, "exchange"),
                cal_date,
                is_open: table.i64_field(row, "is_open").unwrap_or(0) != 0,
                pretrade_date: table.date_field(row, "pretrade_date"),
            });
        }

        info!("Fetched {} calendar entries", entries.len());
        Ok(entries)
    }
}

/// 按列名索引的查询结果表，Tushare以fields+items的列式格式返回数据
struct ResultTable {
    index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl ResultTable {
    fn field<'a>(&self, row: &'a [Value], name: &str) -> Option<&'a Value> {
        self.index.get(name).and_then(|&i| row.get(i))
    }

    fn str_field(&self, row: &[Value], name: &str) -> Option<String> {
        self.field(row, name)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    }

    fn decimal_field(&self, row: &[Value], name: &str) -> Option<Decimal> {
        match self.field(row, name)? {
            // 经由字符串转换，避免二进制浮点引入的尾差
            Value::Number(n) => n.to_string().parse().ok(),
            Value::String(s) if !s.is_empty() => s.parse().ok(),
            _ => None,
        }
    }

    fn i64_field(&self, row: &[Value], name: &str) -> Option<i64> {
        match self.field(row, name)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64)),
            _ => None,
        }
    }

    fn date_field(&self, row: &[Value], name: &str) -> Option<NaiveDate> {
        self.field(row, name)
            .and_then(|v| v.as_str())
            .and_then(|s| util::parse_compact_date(s).ok())
    }
}

fn bars_from_table(table: &ResultTable) -> Vec<DailyBar> {
    let mut bars = Vec::new();
    for row in &table.rows {
        let ts_code = match table.str_field(row, "ts_code") {
            Some(code) => code,
            None => continue,
        };
        let trade_date = match table.date_field(row, "trade_date") {
            Some(date) => date,
            None => continue,
        };
        bars.push(DailyBar {
            ts_code,
            trade_date,
            open: table.decimal_field(row, "open"),
            high: table.decimal_field(row, "high"),
            low: table.decimal_field(row, "low"),
            close: table.decimal_field(row, "close"),
            pre_close: table.decimal_field(row, "pre_close"),
            change: table.decimal_field(row, "change"),
            pct_chg: table.decimal_field(row, "pct_chg"),
            vol: table.i64_field(row, "vol"),
            amount: table.decimal_field(row, "amount"),
        });
    }
    bars
}

fn parse_response(api_name: &str, body: &Value) -> Result<ResultTable> {
    let code = body.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
    if code != 0 {
        let msg = body
            .get("msg")
            .and_then(|m| m.as_str())
            .unwrap_or("no message")
            .to_string();
        return Err(classify_api_error(code, msg));
    }

    let data = body
        .get("data")
        .ok_or_else(|| DataSyncError::DataError(format!("{}: missing data section", api_name)))?;

    let index = data
        .get("fields")
        .and_then(|f| f.as_array())
        .ok_or_else(|| DataSyncError::DataError(format!("{}: missing fields list", api_name)))?
        .iter()
        .enumerate()
        .filter_map(|(i, f)| f.as_str().map(|s| (s.to_string(), i)))
        .collect();

    // 空结果集是合法返回，items缺失或为空都按零行处理
    let rows = data
        .get("items")
        .and_then(|i| i.as_array())
        .map(|items| items.iter().filter_map(|r| r.as_array().cloned()).collect())
        .unwrap_or_default();

    Ok(ResultTable { index, rows })
}

/// 返回码2002为认证/权限类错误，频率限制只能从消息文本识别
fn classify_api_error(code: i64, msg: String) -> DataSyncError {
    if code == 2002 || msg.contains("token") {
        DataSyncError::ProviderAuthError(msg)
    } else if msg.contains("每分钟") || msg.contains("频率") || msg.contains("访问该接口") {
        DataSyncError::RateLimitExceeded(msg)
    } else {
        DataSyncError::ProviderTransientError(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daily_body() -> Value {
        json!({
            "request_id": "1",
            "code": 0,
            "msg": "",
            "data": {
                "fields": ["ts_code", "trade_date", "open", "high", "low", "close",
                           "pre_close", "change", "pct_chg", "vol", "amount"],
                "items": [
                    ["000001.SZ", "20240105", 10.5, 10.8, 10.4, 10.75,
                     10.5, 0.25, 2.38, 216642.0, 232510.5],
                    ["000001.SZ", "20240108", null, null, null, 10.6,
                     10.75, null, null, null, null]
                ],
                "has_more": false
            }
        })
    }

    #[test]
    fn decodes_daily_bars_from_columnar_response() {
        let table = parse_response("daily", &daily_body()).unwrap();
        let bars = bars_from_table(&table);

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].ts_code, "000001.SZ");
        assert_eq!(
            bars[0].trade_date,
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert_eq!(bars[0].open, Some("10.5".parse().unwrap()));
        assert_eq!(bars[0].pct_chg, Some("2.38".parse().unwrap()));
        assert_eq!(bars[0].vol, Some(216642));
    }

    #[test]
    fn missing_values_stay_absent() {
        let table = parse_response("daily", &daily_body()).unwrap();
        let bars = bars_from_table(&table);

        assert_eq!(bars[1].open, None);
        assert_eq!(bars[1].vol, None);
        assert_eq!(bars[1].close, Some("10.6".parse().unwrap()));
    }

    #[test]
    fn empty_result_set_is_not_an_error() {
        let body = json!({
            "code": 0,
            "msg": "",
            "data": {"fields": ["ts_code"], "items": []}
        });
        let table = parse_response("daily", &body).unwrap();
        assert!(table.rows.is_empty());
    }

    #[test]
    fn auth_failures_are_fatal() {
        let err = classify_api_error(2002, "token无效".to_string());
        assert!(matches!(err, DataSyncError::ProviderAuthError(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn rate_limit_messages_are_retryable() {
        let err = classify_api_error(
            -1,
            "抱歉，您每分钟最多访问该接口500次".to_string(),
        );
        assert!(matches!(err, DataSyncError::RateLimitExceeded(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn other_api_failures_are_transient() {
        let err = classify_api_error(-1, "系统内部错误".to_string());
        assert!(matches!(err, DataSyncError::ProviderTransientError(_)));
        assert!(err.is_retryable());
    }
}
