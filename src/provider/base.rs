use crate::errors::Result;
use crate::models::market::{CompanyProfile, DailyBar, Instrument, TradeCalendarEntry};
use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Base trait for market data providers
#[async_trait]
pub trait MarketDataProvider {
    /// 获取全部上市股票的基础信息
    async fn fetch_stock_basic(&self) -> Result<Vec<Instrument>>;

    /// 获取单只股票指定日期区间的日线行情
    async fn fetch_daily_bars(
        &self,
        ts_code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>>;

    /// 获取指定交易日全市场的日线行情
    async fn fetch_daily_by_date(&self, trade_date: NaiveDate) -> Result<Vec<DailyBar>>;

    /// 获取上市公司基本信息
    async fn fetch_company_profiles(&self, exchange: &str) -> Result<Vec<CompanyProfile>>;

    /// 获取交易日历
    async fn fetch_trade_calendar(
        &self,
        exchange: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradeCalendarEntry>>;
}

/// 对外部接口的调用节流器，保证两次请求之间的最小间隔
pub struct Pacer {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// 不做任何等待的节流器，测试用
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// 等待请求频率限制
    pub async fn pause(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let now = Instant::now();
        let should_wait = {
            let mut last = self.last_request.lock().unwrap();
            let should_wait = if let Some(instant) = *last {
                let elapsed = instant.elapsed();
                if elapsed < self.min_interval {
                    Some(self.min_interval - elapsed)
                } else {
                    None
                }
            } else {
                None
            };
            *last = Some(now);
            should_wait
        };

        if let Some(wait_time) = should_wait {
            debug!("等待 {:?} 以遵守频率限制", wait_time);
            tokio::time::sleep(wait_time).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pacer_enforces_minimum_interval() {
        let pacer = Pacer::new(Duration::from_millis(40));
        let started = Instant::now();
        pacer.pause().await;
        pacer.pause().await;
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn disabled_pacer_does_not_wait() {
        let pacer = Pacer::disabled();
        let started = Instant::now();
        for _ in 0..10 {
            pacer.pause().await;
        }
        assert!(started.elapsed() < Duration::from_millis(40));
    }
}
