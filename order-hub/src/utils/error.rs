//! 统一错误处理
//!
//! 提供应用级错误类型 [`AppError`]，汇总各层错误。
//!
//! # 错误码规范
//!
//! | 前缀 | 分类 | 示例 |
//! |------|------|------|
//! | E0xxx | 业务错误 | E0002 验证失败 |
//! | E4xxx | 打印错误 | E4001 打印队列已关闭 |
//! | E5xxx | 同步错误 | E5001 可用性同步失败 |
//! | E9xxx | 系统错误 | E9002 订单存储错误 |
//!
//! # 使用示例
//!
//! ```ignore
//! Err(AppError::not_found(format!("Order {}", order_id)))
//! ```

use shared::ValidationError;
use ticket_printer::PrintError;
use tracing::error;

use crate::availability::SyncError;
use crate::orders::StoreError;
use crate::printing::QueueError;

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== 业务逻辑错误 ==========
    #[error("Resource not found: {0}")]
    /// 资源不存在
    NotFound(String),

    #[error("Validation failed: {0}")]
    /// 验证失败 (invalid transition, unknown status, bad snapshot)
    Validation(#[from] ValidationError),

    // ========== 子系统错误 ==========
    #[error("Print queue error: {0}")]
    Print(#[from] QueueError),

    #[error("Availability sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Order store error: {0}")]
    Store(StoreError),

    // ========== 系统错误 ==========
    #[error("Internal error: {0}")]
    /// 内部错误
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => AppError::NotFound(format!("Order {}", id)),
            other => AppError::Store(other),
        }
    }
}

impl From<PrintError> for AppError {
    fn from(e: PrintError) -> Self {
        AppError::internal(format!("Printer setup failed: {e}"))
    }
}

// ========== Helper Constructors ==========

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        error!(target: "internal", error = %msg, "Internal error occurred");
        Self::Internal(msg)
    }

    /// Stable error code for logs and callers
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "E0003",
            AppError::Validation(_) => "E0002",
            AppError::Print(QueueError::ShutDown) => "E4001",
            AppError::Print(QueueError::NoRuntime) => "E4002",
            AppError::Sync(_) => "E5001",
            AppError::Store(_) => "E9002",
            AppError::Internal(_) => "E9001",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

/// 应用结果类型
pub type AppResult<T> = Result<T, AppError>;
