//! 周期性后台任务
//!
//! 打印机探测、队列状态日志等定时任务共用一个取消令牌。
//! 单次执行 panic 只记录日志，任务继续按周期运行。

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// 后台任务管理器
///
/// ```ignore
/// let mut tasks = BackgroundTasks::new();
/// tasks.spawn_periodic("queue_status", Duration::from_secs(60), Duration::from_secs(60), || async {
///     tracing::info!("tick");
/// });
/// tasks.shutdown().await;
/// ```
pub struct BackgroundTasks {
    handles: Vec<(&'static str, JoinHandle<()>)>,
    shutdown: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Run `tick` every `period`, first after `first_run_in`.
    ///
    /// A slow tick delays the next one instead of bursting. A tick still
    /// running at shutdown is dropped.
    pub fn spawn_periodic<F, Fut>(
        &mut self,
        name: &'static str,
        first_run_in: Duration,
        period: Duration,
        mut tick: F,
    ) where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let period = period.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + first_run_in, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    result = AssertUnwindSafe(tick()).catch_unwind() => {
                        if let Err(panic) = result {
                            tracing::error!(task = name, panic = %panic_message(&*panic), "Periodic task tick panicked");
                        }
                    }
                }
            }
            tracing::debug!(task = name, "Periodic task stopped");
        });

        tracing::debug!(task = name, period_ms = period.as_millis() as u64, "Registered periodic task");
        self.handles.push((name, handle));
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cancel every task and wait for them to exit
    pub async fn shutdown(self) {
        tracing::info!("Shutting down {} background tasks...", self.handles.len());
        self.shutdown.cancel();

        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(task = name, error = ?e, "Background task failed");
            }
        }
        tracing::info!("All background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_schedule() {
        let mut tasks = BackgroundTasks::new();
        let immediate = counter();
        let delayed = counter();

        let c = immediate.clone();
        tasks.spawn_periodic("printer_check", Duration::ZERO, Duration::from_secs(10), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        let c = delayed.clone();
        tasks.spawn_periodic("status", Duration::from_secs(60), Duration::from_secs(60), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(tasks.len(), 2);

        tokio::time::sleep(Duration::from_millis(30_500)).await;
        // t = 0, 10, 20, 30
        assert_eq!(immediate.load(Ordering::SeqCst), 4);
        assert_eq!(delayed.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(delayed.load(Ordering::SeqCst), 1);

        tasks.shutdown().await;
        let after = immediate.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(immediate.load(Ordering::SeqCst), after);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_tick_keeps_schedule() {
        let mut tasks = BackgroundTasks::new();
        let runs = counter();

        let c = runs.clone();
        tasks.spawn_periodic("flaky", Duration::ZERO, Duration::from_secs(1), move || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("printer exploded");
                }
            }
        });

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        tasks.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_slow_tick() {
        let mut tasks = BackgroundTasks::new();
        let finished = counter();

        let c = finished.clone();
        tasks.spawn_periodic("slow", Duration::ZERO, Duration::from_secs(1), move || {
            let c = c.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        tasks.shutdown().await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }
}
