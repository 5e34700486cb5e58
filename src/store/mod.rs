pub mod schema;
pub mod writer;

use crate::errors::Result;
use crate::models::market::{CompanyProfile, DailyBar, TradeCalendarEntry};
use chrono::NaiveDate;
use log::info;
use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;

/// 行情数据库，持有整个运行期间唯一的SQLite连接
///
/// 连接在创建时获取、随着实例析构释放；所有写入都通过
/// [`writer`](crate::store::writer)中的事务方法进行。
pub struct MarketStore {
    conn: Connection,
}

impl MarketStore {
    /// 打开数据库文件并确保表结构存在
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&path)?;
        info!("Opened market database at {}", path.as_ref().display());
        Self::from_connection(conn)
    }

    /// 内存数据库，测试用
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    /// 读取全部跟踪的股票代码，按代码升序保证批次划分可复现
    pub fn list_instruments(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT ts_code FROM stock_basic ORDER BY ts_code")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut codes = Vec::new();
        for code in rows {
            codes.push(code?);
        }
        Ok(codes)
    }

    /// 读取日历中指定区间内的交易日，按日期升序
    pub fn list_open_dates(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        let mut stmt = self.conn.prepare(
            "SELECT cal_date FROM stock_trade_calendar \
             WHERE is_open = 1 AND cal_date >= ?1 AND cal_date <= ?2 \
             ORDER BY cal_date",
        )?;
        let rows = stmt.query_map([start, end], |row| row.get(0))?;

        let mut dates = Vec::new();
        for date in rows {
            dates.push(date?);
        }
        Ok(dates)
    }

    pub fn instrument_count(&self) -> Result<usize> {
        self.count("stock_basic")
    }

    pub fn daily_bar_count(&self) -> Result<usize> {
        self.count("stock_daily_history")
    }

    pub fn company_count(&self) -> Result<usize> {
        self.count("stock_company")
    }

    pub fn calendar_count(&self) -> Result<usize> {
        self.count("stock_trade_calendar")
    }

    fn count(&self, table: &str) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
        Ok(n as usize)
    }

    /// 查询单只股票的日线行情，按交易日期降序
    pub fn daily_bars(&self, ts_code: &str, limit: usize) -> Result<Vec<DailyBar>> {
        let mut stmt = self.conn.prepare(
            "SELECT ts_code, trade_date, open, high, low, close, pre_close, \
                    change_c, pct_chg, vol, amount \
             FROM stock_daily_history WHERE ts_code = ?1 \
             ORDER BY trade_date DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![ts_code, limit as i64], daily_bar_from_row)?;

        let mut bars = Vec::new();
        for bar in rows {
            bars.push(bar?);
        }
        Ok(bars)
    }

    pub fn company_profile(&self, ts_code: &str) -> Result<Option<CompanyProfile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT ts_code, exchange, chairman, manager, secretary, \
                        reg_capital, setup_date, province \
                 FROM stock_company WHERE ts_code = ?1",
                [ts_code],
                |row| {
                    Ok(CompanyProfile {
                        ts_code: row.get(0)?,
                        exchange: row.get(1)?,
                        chairman: row.get(2)?,
                        manager: row.get(3)?,
                        secretary: row.get(4)?,
                        reg_capital: row.get(5)?,
                        setup_date: row.get(6)?,
                        province: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    pub fn calendar_entries(&self) -> Result<Vec<TradeCalendarEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT exchange, cal_date, is_open, pretrade_date \
             FROM stock_trade_calendar ORDER BY cal_date",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TradeCalendarEntry {
                exchange: row.get(0)?,
                cal_date: row.get(1)?,
                is_open: row.get::<_, Option<i64>>(2)?.unwrap_or(0) != 0,
                pretrade_date: row.get(3)?,
            })
        })?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }
}

fn daily_bar_from_row(row: &Row<'_>) -> rusqlite::Result<DailyBar> {
    Ok(DailyBar {
        ts_code: row.get(0)?,
        trade_date: row.get(1)?,
        open: decimal_column(row, 2)?,
        high: decimal_column(row, 3)?,
        low: decimal_column(row, 4)?,
        close: decimal_column(row, 5)?,
        pre_close: decimal_column(row, 6)?,
        change: decimal_column(row, 7)?,
        pct_chg: decimal_column(row, 8)?,
        vol: row.get(9)?,
        amount: decimal_column(row, 10)?,
    })
}

// 十进制字段在库中以文本存放，读取时解析回Decimal
fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}
