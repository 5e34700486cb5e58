use crate::errors::Result;
use rusqlite::Connection;

/// 股票基础信息表
pub const STOCK_BASIC_DDL: &str = "CREATE TABLE IF NOT EXISTS stock_basic (
    ts_code TEXT NOT NULL,
    symbol TEXT,
    name TEXT,
    area TEXT,
    industry TEXT,
    list_date DATE,
    PRIMARY KEY (ts_code)
)";

/// 股票日线行情数据表
pub const DAILY_HISTORY_DDL: &str = "CREATE TABLE IF NOT EXISTS stock_daily_history (
    ts_code TEXT NOT NULL,
    trade_date DATE NOT NULL,
    open TEXT,
    high TEXT,
    low TEXT,
    close TEXT,
    pre_close TEXT,
    change_c TEXT,
    pct_chg TEXT,
    vol INTEGER,
    amount TEXT,
    PRIMARY KEY (ts_code, trade_date)
)";

/// 上市公司基本信息表
pub const STOCK_COMPANY_DDL: &str = "CREATE TABLE IF NOT EXISTS stock_company (
    ts_code TEXT NOT NULL,
    exchange TEXT,
    chairman TEXT,
    manager TEXT,
    secretary TEXT,
    reg_capital TEXT,
    setup_date TEXT,
    province TEXT,
    PRIMARY KEY (ts_code)
)";

/// 交易日历表
pub const TRADE_CALENDAR_DDL: &str = "CREATE TABLE IF NOT EXISTS stock_trade_calendar (
    exchange TEXT,
    cal_date DATE NOT NULL,
    is_open INTEGER,
    pretrade_date DATE,
    PRIMARY KEY (cal_date)
)";

/// 建表（如果还没有创建）。可以在每次运行时重复调用；
/// 已存在但结构不兼容的表不在此处理。
pub fn ensure_table(conn: &Connection, ddl: &str) -> Result<()> {
    conn.execute(ddl, [])?;
    Ok(())
}

pub fn ensure_schema(conn: &Connection) -> Result<()> {
    for ddl in [
        STOCK_BASIC_DDL,
        DAILY_HISTORY_DDL,
        STOCK_COMPANY_DDL,
        TRADE_CALENDAR_DDL,
    ] {
        ensure_table(conn, ddl)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creation_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name LIKE 'stock_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
    }
}
