use crate::config::SyncConfig;
use crate::errors::Result;
use crate::models::market::SyncReport;
use crate::provider::base::MarketDataProvider;
use crate::store::MarketStore;
use chrono::NaiveDate;
use log::{info, warn};
use std::sync::Arc;

/// 数据同步服务，串联取数、批次聚合和入库的完整流程
///
/// 行情接口客户端和数据库句柄都由调用方构造后注入，本服务
/// 不持有任何全局资源；运行结束或出错时连接随析构释放。
pub struct SyncService {
    config: SyncConfig,
    provider: Arc<dyn MarketDataProvider + Send + Sync>,
    store: MarketStore,
}

impl SyncService {
    /// 创建新的同步服务实例
    pub fn new(
        config: SyncConfig,
        provider: Arc<dyn MarketDataProvider + Send + Sync>,
        store: MarketStore,
    ) -> Self {
        Self {
            config,
            provider,
            store,
        }
    }

    pub fn store(&self) -> &MarketStore {
        &self.store
    }

    /// 全量刷新股票基础信息表，返回写入的行数
    pub async fn sync_stock_basic(&mut self) -> Result<usize> {
        let instruments = self.provider.fetch_stock_basic().await?;
        let written = self.store.replace_instruments(&instruments)?;
        info!("Stock basic sync complete: {} instruments", written);
        Ok(written)
    }

    /// 按股票分批同步日线行情
    ///
    /// 股票清单取自stock_basic表并按代码顺序切分为固定大小的批次；
    /// 每个批次内逐只拉取、合并后在一个事务中提交，提交成功即清空
    /// 累积的数据，内存占用不超过一个批次。某个批次失败时此前已
    /// 提交的批次保持不变。
    pub async fn sync_daily_history(&mut self, start: NaiveDate, end: NaiveDate) -> Result<SyncReport> {
        let codes = self.store.list_instruments()?;
        if codes.is_empty() {
            warn!("Instrument universe is empty, nothing to sync");
            return Ok(SyncReport::default());
        }

        info!(
            "Syncing daily history for {} instruments from {} to {}",
            codes.len(),
            start,
            end
        );

        let mut report = SyncReport::default();
        let mut batch = Vec::new();
        for chunk in codes.chunks(self.config.batch_size.max(1)) {
            for ts_code in chunk {
                let bars = self.provider.fetch_daily_bars(ts_code, start, end).await?;
                batch.extend(bars);
            }

            let written = self
                .store
                .insert_daily_bars(&batch, self.config.on_conflict)?;
            report.batches += 1;
            report.rows += written;
            info!(
                "Committed batch {} ({} instruments, {} rows)",
                report.batches,
                chunk.len(),
                written
            );
            batch.clear();
        }

        info!(
            "Daily history sync complete: {} batches, {} rows",
            report.batches, report.rows
        );
        Ok(report)
    }

    /// 按交易日分批同步全市场日线行情
    ///
    /// 交易日取自已同步的交易日历表中区间内的开市日期，
    /// 批次划分和提交语义与按股票同步一致。
    pub async fn sync_daily_by_date(&mut self, start: NaiveDate, end: NaiveDate) -> Result<SyncReport> {
        let dates = self.store.list_open_dates(start, end)?;
        if dates.is_empty() {
            warn!(
                "No open trading dates between {} and {}, sync the trade calendar first",
                start, end
            );
            return Ok(SyncReport::default());
        }

        info!("Syncing daily history for {} trading dates", dates.len());

        let mut report = SyncReport::default();
        let mut batch = Vec::new();
        for chunk in dates.chunks(self.config.batch_size.max(1)) {
            for trade_date in chunk {
                let bars = self.provider.fetch_daily_by_date(*trade_date).await?;
                batch.extend(bars);
            }

            let written = self
                .store
                .insert_daily_bars(&batch, self.config.on_conflict)?;
            report.batches += 1;
            report.rows += written;
            info!(
                "Committed batch {} ({} dates, {} rows)",
                report.batches,
                chunk.len(),
                written
            );
            batch.clear();
        }

        info!(
            "Daily-by-date sync complete: {} batches, {} rows",
            report.batches, report.rows
        );
        Ok(report)
    }

    /// 全量刷新上市公司基本信息表，返回快照行数
    pub async fn sync_company_profiles(&mut self, exchange: &str) -> Result<usize> {
        let profiles = self.provider.fetch_company_profiles(exchange).await?;
        let written = self.store.replace_company_profiles(&profiles)?;
        info!("Company profile sync complete: {} rows", written);
        Ok(written)
    }

    /// 全量刷新交易日历表，返回快照行数
    pub async fn sync_trade_calendar(
        &mut self,
        exchange: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<usize> {
        let entries = self
            .provider
            .fetch_trade_calendar(exchange, start, end)
            .await?;
        let written = self.store.replace_trade_calendar(&entries)?;
        info!("Trade calendar sync complete: {} rows", written);
        Ok(written)
    }
}
