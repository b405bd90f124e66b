//! 核心模块 - 配置、服务状态和后台任务
//!
//! # 模块结构
//!
//! - [`Config`] - 服务配置
//! - [`HubState`] - 组件装配与生命周期
//! - [`BackgroundTasks`] - 周期性后台任务

pub mod config;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use state::HubState;
pub use tasks::BackgroundTasks;
