//! Order Hub - 订单中枢
//!
//! # 架构概述
//!
//! 订单后台的三个核心部分：
//!
//! - **订单状态机** (`orders`): 只允许 Received → Preparing → Completed
//! - **打印** (`printing`): 小票渲染 + 串行打印队列（有界重试）
//! - **可用性同步** (`availability`): 推送优先，宽限期后回退到轮询
//!
//! # 模块结构
//!
//! ```text
//! order-hub/src/
//! ├── core/          # 配置、服务状态、后台任务
//! ├── orders/        # 订单存储和状态推进
//! ├── printing/      # 小票渲染、打印队列、传输
//! ├── availability/  # 可用性同步器
//! └── utils/         # 错误、日志
//! ```

pub mod availability;
pub mod core;
pub mod orders;
pub mod printing;
pub mod utils;

// Re-export 公共类型
pub use availability::{AvailabilitySynchronizer, SyncConfig, SyncState};
pub use core::{BackgroundTasks, Config, HubState};
pub use orders::{OrderWorkflow, StatusChange};
pub use printing::{PrintDispatchQueue, QueueConfig, ReceiptFormatter};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Load `.env`, then initialize logging from the environment
pub fn setup_environment() -> Config {
    let _ = dotenv::dotenv();
    let config = Config::from_env();
    init_logger_with_file(
        Some(&config.log_level),
        Some(config.log_json),
        config.log_dir.as_deref(),
    );
    config
}

pub fn print_banner() {
    println!(
        r#"
   ____          __             __  __      __
  / __ \_________/ /__  _____   / / / /_  __/ /_
 / / / / ___/ __  / _ \/ ___/  / /_/ / / / / __ \
/ /_/ / /  / /_/ /  __/ /     / __  / /_/ / /_/ /
\____/_/   \__,_/\___/_/     /_/ /_/\__,_/_.___/
    "#
    );
}
