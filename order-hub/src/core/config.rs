use chrono_tz::Tz;
use std::time::Duration;
use ticket_printer::Codepage;

use crate::availability::SyncConfig;
use crate::printing::{QueueConfig, ReceiptConfig};

/// 服务配置 - 订单中枢的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖（启动时先加载 `.env`）：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | LOG_LEVEL | info | 日志级别 (RUST_LOG 优先) |
/// | LOG_DIR | - | 日志目录 (存在时按天滚动写文件) |
/// | LOG_JSON | false | JSON 日志 |
/// | STORE_NAME | Order Hub | 小票抬头 |
/// | STORE_TIMEZONE | America/Sao_Paulo | 小票时间时区 |
/// | CURRENCY_SYMBOL | R$ | 货币符号 |
/// | RECEIPT_WIDTH | 42 | 每行字符数 |
/// | PRINTER_ADDR | 127.0.0.1:9100 | 网络打印机地址 |
/// | PRINTER_CODEPAGE | latin1 | utf8 / latin1 / gbk |
/// | PRINT_ATTEMPT_TIMEOUT_MS | 5000 | 单次打印超时 |
/// | PRINT_READY_TIMEOUT_MS | 5000 | 等待打印机就绪超时 |
/// | PRINT_MAX_ATTEMPTS | 3 | 最大尝试次数 |
/// | PRINT_RETRY_DELAY_MS | 500 | 重试基础延迟 |
/// | PRINT_BACKOFF_MS | 1000 | 每次失败追加的延迟 |
/// | AVAILABILITY_URL | - | 可用性快照地址 (未设置则不同步) |
/// | SYNC_GRACE_MS | 10000 | 等待首个推送的宽限期 |
/// | SYNC_POLL_MS | 5000 | 轮询间隔 |
/// | SYNC_FETCH_TIMEOUT_MS | 5000 | 单次拉取超时 |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | 关闭时等待打印队列清空的时间 |
///
/// Unparseable values fall back to the default.
///
/// # 示例
///
/// ```ignore
/// PRINTER_ADDR=192.168.1.50:9100 RECEIPT_WIDTH=48 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: Option<String>,
    pub log_json: bool,

    // === 小票 ===
    pub store_name: String,
    pub timezone: Tz,
    pub currency_symbol: String,
    pub receipt_width: usize,

    // === 打印 ===
    pub printer_addr: String,
    pub printer_codepage: Codepage,
    pub print_attempt_timeout_ms: u64,
    pub print_ready_timeout_ms: u64,
    pub print_max_attempts: u32,
    pub print_retry_delay_ms: u64,
    pub print_backoff_ms: u64,

    // === 可用性同步 ===
    pub availability_url: Option<String>,
    pub sync_grace_ms: u64,
    pub sync_poll_ms: u64,
    pub sync_fetch_timeout_ms: u64,

    pub shutdown_timeout_ms: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (environment, map in tests)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let num = |key: &str, default: u64| -> u64 {
            text(key).and_then(|v| v.parse().ok()).unwrap_or(default)
        };

        Self {
            log_level: text("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: text("LOG_DIR"),
            log_json: text("LOG_JSON")
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),

            store_name: text("STORE_NAME").unwrap_or_else(|| "Order Hub".into()),
            timezone: text("STORE_TIMEZONE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(chrono_tz::America::Sao_Paulo),
            currency_symbol: text("CURRENCY_SYMBOL").unwrap_or_else(|| "R$".into()),
            receipt_width: text("RECEIPT_WIDTH")
                .and_then(|v| v.parse().ok())
                .filter(|w: &usize| *w >= 16)
                .unwrap_or(42),

            printer_addr: text("PRINTER_ADDR").unwrap_or_else(|| "127.0.0.1:9100".into()),
            printer_codepage: text("PRINTER_CODEPAGE")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            print_attempt_timeout_ms: num("PRINT_ATTEMPT_TIMEOUT_MS", 5000),
            print_ready_timeout_ms: num("PRINT_READY_TIMEOUT_MS", 5000),
            print_max_attempts: text("PRINT_MAX_ATTEMPTS")
                .and_then(|v| v.parse().ok())
                .filter(|n: &u32| *n > 0)
                .unwrap_or(3),
            print_retry_delay_ms: num("PRINT_RETRY_DELAY_MS", 500),
            print_backoff_ms: num("PRINT_BACKOFF_MS", 1000),

            availability_url: text("AVAILABILITY_URL"),
            sync_grace_ms: num("SYNC_GRACE_MS", 10_000),
            sync_poll_ms: num("SYNC_POLL_MS", 5000).max(1),
            sync_fetch_timeout_ms: num("SYNC_FETCH_TIMEOUT_MS", 5000),

            shutdown_timeout_ms: num("SHUTDOWN_TIMEOUT_MS", 10_000),
        }
    }

    pub fn with_printer_addr(mut self, addr: impl Into<String>) -> Self {
        self.printer_addr = addr.into();
        self
    }

    pub fn with_availability_url(mut self, url: impl Into<String>) -> Self {
        self.availability_url = Some(url.into());
        self
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::default()
            .with_attempt_timeout(Duration::from_millis(self.print_attempt_timeout_ms))
            .with_ready_timeout(Duration::from_millis(self.print_ready_timeout_ms))
            .with_retry_delay(
                Duration::from_millis(self.print_retry_delay_ms),
                Duration::from_millis(self.print_backoff_ms),
            )
            .with_max_attempts(self.print_max_attempts)
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::default()
            .with_grace_period(Duration::from_millis(self.sync_grace_ms))
            .with_poll_interval(Duration::from_millis(self.sync_poll_ms))
            .with_fetch_timeout(Duration::from_millis(self.sync_fetch_timeout_ms))
    }

    pub fn receipt_config(&self) -> ReceiptConfig {
        ReceiptConfig {
            width: self.receipt_width,
            store_name: self.store_name.clone(),
            timezone: self.timezone,
            currency_symbol: self.currency_symbol.clone(),
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
