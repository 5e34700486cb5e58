// 公开导出的模块，供外部使用
pub mod config;
pub mod errors;
pub mod models;
pub mod provider;
pub mod services;
pub mod store;

// 内部工具模块，为了支持主程序保持公开
#[doc(hidden)]
pub mod util;

// 重新导出常用类型，方便使用
pub use config::{ConflictPolicy, SyncConfig};
pub use errors::{DataSyncError, Result};
pub use models::market::{CompanyProfile, DailyBar, Instrument, SyncReport, TradeCalendarEntry};
pub use provider::base::MarketDataProvider;
pub use provider::tushare::TushareClient;
pub use services::sync_service::SyncService;
pub use store::MarketStore;
