use ashare_datasync::config::{ConflictPolicy, SyncConfig};
use ashare_datasync::provider::tushare::TushareClient;
use ashare_datasync::services::sync_service::SyncService;
use ashare_datasync::store::MarketStore;
use ashare_datasync::util;

use anyhow::Context;
use clap::{App, Arg, SubCommand};
use log::info;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init();

    let app = App::new("ashare-datasync")
        .version("0.3.0")
        .author("DataSync Team")
        .about("A-share market data synchronization pipeline")
        .arg(
            Arg::with_name("db")
                .long("db")
                .value_name("PATH")
                .help("SQLite database path")
                .takes_value(true)
                .default_value("data/stock.db")
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("basic")
                .about("Refresh the tracked instrument universe (stock_basic)"),
        )
        .subcommand(
            SubCommand::with_name("daily")
                .about("Sync daily bars for every tracked instrument")
                .arg(
                    Arg::with_name("start")
                        .short('s')
                        .long("start")
                        .value_name("DATE")
                        .help("Start date, inclusive (YYYYMMDD)")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("end")
                        .short('e')
                        .long("end")
                        .value_name("DATE")
                        .help("End date, inclusive (YYYYMMDD)")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("batch-size")
                        .long("batch-size")
                        .value_name("N")
                        .help("Number of instruments per commit")
                        .takes_value(true)
                        .default_value("100"),
                )
                .arg(
                    Arg::with_name("pace-ms")
                        .long("pace-ms")
                        .value_name("MS")
                        .help("Minimum delay between provider calls in milliseconds")
                        .takes_value(true)
                        .default_value("100"),
                )
                .arg(
                    Arg::with_name("skip-existing")
                        .long("skip-existing")
                        .help("Skip rows whose primary key already exists instead of failing")
                        .takes_value(false),
                )
                .arg(
                    Arg::with_name("by-date")
                        .long("by-date")
                        .help("Fetch whole-market bars per trading date instead of per instrument")
                        .takes_value(false),
                ),
        )
        .subcommand(
            SubCommand::with_name("company")
                .about("Full refresh of listed company profiles")
                .arg(
                    Arg::with_name("exchange")
                        .short('e')
                        .long("exchange")
                        .value_name("EXCHANGE")
                        .help("Exchange code (SSE, SZSE, BSE)")
                        .takes_value(true)
                        .default_value("SSE"),
                ),
        )
        .subcommand(
            SubCommand::with_name("calendar")
                .about("Full refresh of the trade calendar")
                .arg(
                    Arg::with_name("exchange")
                        .long("exchange")
                        .value_name("EXCHANGE")
                        .help("Exchange code, empty for all exchanges")
                        .takes_value(true)
                        .default_value(""),
                )
                .arg(
                    Arg::with_name("start")
                        .short('s')
                        .long("start")
                        .value_name("DATE")
                        .help("Start date, inclusive (YYYYMMDD)")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("end")
                        .short('e')
                        .long("end")
                        .value_name("DATE")
                        .help("End date, inclusive (YYYYMMDD)")
                        .required(true)
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("show")
                .about("Show stored daily bars for one instrument")
                .arg(
                    Arg::with_name("symbol")
                        .short('s')
                        .long("symbol")
                        .value_name("TS_CODE")
                        .help("Instrument code, e.g. 000001.SZ")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("limit")
                        .short('l')
                        .long("limit")
                        .value_name("LIMIT")
                        .help("Limit the number of records to display")
                        .takes_value(true)
                        .default_value("10"),
                ),
        );

    let matches = app.get_matches();
    let db_path = matches.value_of("db").unwrap();

    if let Some(_m) = matches.subcommand_matches("basic") {
        let config = SyncConfig::new();
        let mut service = build_service(db_path, &config)?;
        let written = service.sync_stock_basic().await?;
        info!("Done: {} instruments", written);
    } else if let Some(m) = matches.subcommand_matches("daily") {
        let start = util::parse_compact_date(m.value_of("start").unwrap())?;
        let end = util::parse_compact_date(m.value_of("end").unwrap())?;
        let batch_size = m
            .value_of("batch-size")
            .unwrap_or("100")
            .parse::<usize>()
            .unwrap_or(100);
        let pace_ms = m
            .value_of("pace-ms")
            .unwrap_or("100")
            .parse::<u64>()
            .unwrap_or(100);
        let on_conflict = if m.is_present("skip-existing") {
            ConflictPolicy::Skip
        } else {
            ConflictPolicy::Fail
        };

        let config = SyncConfig::new()
            .with_batch_size(batch_size)
            .with_pace_interval(Duration::from_millis(pace_ms))
            .with_on_conflict(on_conflict);
        let mut service = build_service(db_path, &config)?;

        let report = if m.is_present("by-date") {
            service.sync_daily_by_date(start, end).await?
        } else {
            service.sync_daily_history(start, end).await?
        };
        info!("Done: {} batches, {} rows", report.batches, report.rows);
    } else if let Some(m) = matches.subcommand_matches("company") {
        let exchange = m.value_of("exchange").unwrap();
        let config = SyncConfig::new();
        let mut service = build_service(db_path, &config)?;
        let written = service.sync_company_profiles(exchange).await?;
        info!("Done: {} company profiles", written);
    } else if let Some(m) = matches.subcommand_matches("calendar") {
        let exchange = m.value_of("exchange").unwrap();
        let start = util::parse_compact_date(m.value_of("start").unwrap())?;
        let end = util::parse_compact_date(m.value_of("end").unwrap())?;
        let config = SyncConfig::new();
        let mut service = build_service(db_path, &config)?;
        let written = service.sync_trade_calendar(exchange, start, end).await?;
        info!("Done: {} calendar entries", written);
    } else if let Some(m) = matches.subcommand_matches("show") {
        let symbol = m.value_of("symbol").unwrap();
        let limit = m
            .value_of("limit")
            .unwrap_or("10")
            .parse::<usize>()
            .unwrap_or(10);

        let store = MarketStore::open(db_path)?;
        let bars = store.daily_bars(symbol, limit)?;

        if bars.is_empty() {
            info!("No daily data stored for {}", symbol);
        } else {
            info!(
                "{:<12} {:<8} {:<8} {:<8} {:<8} {:<12} {:<14}",
                "Date", "Open", "High", "Low", "Close", "Volume", "Amount"
            );
            for bar in &bars {
                info!(
                    "{:<12} {:<8} {:<8} {:<8} {:<8} {:<12} {:<14}",
                    bar.trade_date.to_string(),
                    display_decimal(&bar.open),
                    display_decimal(&bar.high),
                    display_decimal(&bar.low),
                    display_decimal(&bar.close),
                    bar.vol.map_or("-".to_string(), |v| v.to_string()),
                    display_decimal(&bar.amount),
                );
            }
        }
    } else {
        info!("No command specified. Use --help for usage information.");
    }

    Ok(())
}

/// 构造行情客户端和数据库句柄并注入同步服务
fn build_service(db_path: &str, config: &SyncConfig) -> anyhow::Result<SyncService> {
    let token = std::env::var("TUSHARE_TOKEN")
        .context("TUSHARE_TOKEN environment variable is not set")?;

    let client = TushareClient::new(&token, config.pace_interval)?
        .with_retries(config.max_retries, config.retry_backoff);
    let store = MarketStore::open(db_path)?;

    Ok(SyncService::new(config.clone(), Arc::new(client), store))
}

fn display_decimal(value: &Option<rust_decimal::Decimal>) -> String {
    value
        .as_ref()
        .map_or("-".to_string(), |d| d.to_string())
}
