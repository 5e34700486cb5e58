use std::time::Duration;

/// 日线行情写入时主键冲突的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// 冲突时整批失败并回滚，和历史数据重叠的重跑会报错
    Fail,
    /// 跳过已存在的主键，重叠区间的重跑不写入任何新行
    Skip,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub batch_size: usize,
    pub pace_interval: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub on_conflict: ConflictPolicy,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self {
            batch_size: 100,
            pace_interval: Duration::from_millis(100),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            on_conflict: ConflictPolicy::Fail,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_pace_interval(mut self, interval: Duration) -> Self {
        self.pace_interval = interval;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_on_conflict(mut self, policy: ConflictPolicy) -> Self {
        self.on_conflict = policy;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
