use super::MarketStore;
use crate::config::ConflictPolicy;
use crate::errors::{DataSyncError, Result};
use crate::models::market::{CompanyProfile, DailyBar, Instrument, TradeCalendarEntry};
use log::debug;
use rusqlite::{params, ErrorCode};
use rust_decimal::Decimal;

const INSERT_DAILY: &str = "INSERT INTO stock_daily_history \
    (ts_code, trade_date, open, high, low, close, pre_close, change_c, pct_chg, vol, amount) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

const INSERT_DAILY_SKIP: &str = "INSERT OR IGNORE INTO stock_daily_history \
    (ts_code, trade_date, open, high, low, close, pre_close, change_c, pct_chg, vol, amount) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

impl MarketStore {
    /// 以单个事务写入一批日线行情，返回实际写入的行数
    ///
    /// [`ConflictPolicy::Fail`]下主键冲突回滚整批，此前已提交的批次不受影响。
    pub fn insert_daily_bars(
        &mut self,
        bars: &[DailyBar],
        on_conflict: ConflictPolicy,
    ) -> Result<usize> {
        let sql = match on_conflict {
            ConflictPolicy::Fail => INSERT_DAILY,
            ConflictPolicy::Skip => INSERT_DAILY_SKIP,
        };

        let tx = self.conn.transaction()?;
        let mut written = 0usize;
        {
            let mut stmt = tx.prepare(sql)?;
            for bar in bars {
                written += stmt
                    .execute(params![
                        bar.ts_code,
                        bar.trade_date,
                        decimal_param(&bar.open),
                        decimal_param(&bar.high),
                        decimal_param(&bar.low),
                        decimal_param(&bar.close),
                        decimal_param(&bar.pre_close),
                        decimal_param(&bar.change),
                        decimal_param(&bar.pct_chg),
                        bar.vol,
                        decimal_param(&bar.amount),
                    ])
                    .map_err(|e| map_constraint(e, "stock_daily_history"))?;
            }
        }
        tx.commit()?;

        debug!("Committed {} daily bars", written);
        Ok(written)
    }

    /// 全量刷新股票基础信息：单事务内先清空再写入最新快照
    pub fn replace_instruments(&mut self, instruments: &[Instrument]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM stock_basic", [])?;
        let mut written = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO stock_basic \
                 (ts_code, symbol, name, area, industry, list_date) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for instrument in instruments {
                written += stmt.execute(params![
                    instrument.ts_code,
                    instrument.symbol,
                    instrument.name,
                    instrument.area,
                    instrument.industry,
                    instrument.list_date,
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// 全量刷新上市公司基本信息
    pub fn replace_company_profiles(&mut self, profiles: &[CompanyProfile]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM stock_company", [])?;
        let mut written = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO stock_company \
                 (ts_code, exchange, chairman, manager, secretary, reg_capital, setup_date, province) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for profile in profiles {
                written += stmt.execute(params![
                    profile.ts_code,
                    profile.exchange,
                    profile.chairman,
                    profile.manager,
                    profile.secretary,
                    profile.reg_capital,
                    profile.setup_date,
                    profile.province,
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// 全量刷新交易日历
    pub fn replace_trade_calendar(&mut self, entries: &[TradeCalendarEntry]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM stock_trade_calendar", [])?;
        let mut written = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO stock_trade_calendar \
                 (exchange, cal_date, is_open, pretrade_date) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for entry in entries {
                written += stmt.execute(params![
                    entry.exchange,
                    entry.cal_date,
                    entry.is_open,
                    entry.pretrade_date,
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }
}

fn decimal_param(value: &Option<Decimal>) -> Option<String> {
    value.as_ref().map(|d| d.to_string())
}

/// SQLite的约束冲突映射为主键冲突错误，其余数据库错误原样上抛
fn map_constraint(e: rusqlite::Error, table: &'static str) -> DataSyncError {
    if let rusqlite::Error::SqliteFailure(err, ref msg) = e {
        if err.code == ErrorCode::ConstraintViolation {
            return DataSyncError::PrimaryKeyViolation {
                table,
                detail: msg
                    .clone()
                    .unwrap_or_else(|| "constraint violation".to_string()),
            };
        }
    }
    DataSyncError::DataAccessError(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(ts_code: &str, date: NaiveDate) -> DailyBar {
        DailyBar {
            ts_code: ts_code.to_string(),
            trade_date: date,
            open: Some("10.50".parse().unwrap()),
            high: Some("10.80".parse().unwrap()),
            low: Some("10.40".parse().unwrap()),
            close: Some("10.75".parse().unwrap()),
            pre_close: Some("10.50".parse().unwrap()),
            change: Some("0.25".parse().unwrap()),
            pct_chg: Some("2.38".parse().unwrap()),
            vol: Some(216642),
            amount: Some("232510.5".parse().unwrap()),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn duplicate_bar_fails_and_rolls_back_the_batch() {
        let mut store = MarketStore::open_in_memory().unwrap();
        let first = vec![bar("000001.SZ", date(2024, 1, 5))];
        store
            .insert_daily_bars(&first, ConflictPolicy::Fail)
            .unwrap();

        // 第二批里第一行冲突，第二行是新日期，但整批都不应落库
        let second = vec![
            bar("000001.SZ", date(2024, 1, 5)),
            bar("000001.SZ", date(2024, 1, 8)),
        ];
        let err = store
            .insert_daily_bars(&second, ConflictPolicy::Fail)
            .unwrap_err();
        assert!(matches!(
            err,
            DataSyncError::PrimaryKeyViolation {
                table: "stock_daily_history",
                ..
            }
        ));
        assert_eq!(store.daily_bar_count().unwrap(), 1);
    }

    #[test]
    fn skip_policy_ignores_existing_keys() {
        let mut store = MarketStore::open_in_memory().unwrap();
        let first = vec![bar("000001.SZ", date(2024, 1, 5))];
        store
            .insert_daily_bars(&first, ConflictPolicy::Fail)
            .unwrap();

        let second = vec![
            bar("000001.SZ", date(2024, 1, 5)),
            bar("000001.SZ", date(2024, 1, 8)),
        ];
        let written = store
            .insert_daily_bars(&second, ConflictPolicy::Skip)
            .unwrap();
        assert_eq!(written, 1);
        assert_eq!(store.daily_bar_count().unwrap(), 2);
    }

    #[test]
    fn null_fields_survive_the_round_trip() {
        let mut store = MarketStore::open_in_memory().unwrap();
        let mut sparse = bar("600000.SH", date(2024, 1, 5));
        sparse.pre_close = None;
        sparse.change = None;
        sparse.vol = None;

        store
            .insert_daily_bars(&[sparse.clone()], ConflictPolicy::Fail)
            .unwrap();
        let stored = store.daily_bars("600000.SH", 10).unwrap();
        assert_eq!(stored, vec![sparse]);
    }

    #[test]
    fn full_refresh_replaces_prior_snapshot() {
        let mut store = MarketStore::open_in_memory().unwrap();
        let profile = |code: &str| CompanyProfile {
            ts_code: code.to_string(),
            exchange: Some("SSE".to_string()),
            chairman: Some("张三".to_string()),
            manager: None,
            secretary: None,
            reg_capital: Some("100000.0".to_string()),
            setup_date: Some("19990304".to_string()),
            province: Some("上海".to_string()),
        };

        let first: Vec<_> = (0..3)
            .map(|i| profile(&format!("60000{}.SH", i)))
            .collect();
        store.replace_company_profiles(&first).unwrap();
        assert_eq!(store.company_count().unwrap(), 3);

        let second = vec![profile("600000.SH")];
        store.replace_company_profiles(&second).unwrap();
        assert_eq!(store.company_count().unwrap(), 1);
        assert!(store.company_profile("600001.SH").unwrap().is_none());
    }
}
