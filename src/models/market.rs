use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// 股票基础信息，对应stock_basic表
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instrument {
    pub ts_code: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub area: Option<String>,
    pub industry: Option<String>,
    pub list_date: Option<NaiveDate>,
}

/// 日线行情数据，对应stock_daily_history表
///
/// 价格和金额字段使用十进制类型，接口未返回的字段保持为None，
/// 不会被折算成0。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBar {
    pub ts_code: String,
    pub trade_date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    /// 昨收价【除权价，前复权】
    pub pre_close: Option<Decimal>,
    /// 涨跌额
    pub change: Option<Decimal>,
    /// 涨跌幅
    pub pct_chg: Option<Decimal>,
    /// 成交量（手）
    pub vol: Option<i64>,
    /// 成交额（千元）
    pub amount: Option<Decimal>,
}

/// 上市公司基本信息，对应stock_company表
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyProfile {
    pub ts_code: String,
    pub exchange: Option<String>,
    /// 法人代表
    pub chairman: Option<String>,
    /// 总经理
    pub manager: Option<String>,
    /// 董秘
    pub secretary: Option<String>,
    pub reg_capital: Option<String>,
    pub setup_date: Option<String>,
    pub province: Option<String>,
}

/// 交易日历条目，对应stock_trade_calendar表
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeCalendarEntry {
    pub exchange: Option<String>,
    pub cal_date: NaiveDate,
    pub is_open: bool,
    pub pretrade_date: Option<NaiveDate>,
}

/// 一次同步运行的统计结果
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SyncReport {
    /// 提交的批次数
    pub batches: usize,
    /// 写入的总行数
    pub rows: usize,
}
