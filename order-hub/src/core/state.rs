use shared::AvailabilitySnapshot;
use std::sync::Arc;
use std::time::Duration;

use crate::availability::{
    AvailabilitySynchronizer, BroadcastPushSource, HttpSnapshotSource, SnapshotSource,
};
use crate::core::Config;
use crate::core::tasks::BackgroundTasks;
use crate::orders::{InMemoryOrderStore, OrderWorkflow};
use crate::printing::{NetworkTransport, PrintDispatchQueue, PrintTransport, ReceiptFormatter};
use crate::utils::AppResult;

/// 打印机探测间隔
const PRINTER_CHECK_INTERVAL: Duration = Duration::from_secs(10);
/// 队列状态日志间隔
const STATUS_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// 服务状态 - 持有所有组件的共享引用
///
/// | 字段 | 说明 |
/// |------|------|
/// | queue | 打印分发队列 |
/// | workflow | 订单状态推进 |
/// | store | 订单存储 |
/// | push | 进程内推送通道 |
/// | synchronizer | 可用性同步器 (未配置 AVAILABILITY_URL 时为空) |
pub struct HubState {
    config: Config,
    transport: Arc<dyn PrintTransport>,
    queue: PrintDispatchQueue,
    store: Arc<InMemoryOrderStore>,
    workflow: Arc<OrderWorkflow>,
    push: BroadcastPushSource,
    synchronizer: Option<Arc<AvailabilitySynchronizer>>,
}

impl HubState {
    /// Build all components from configuration
    pub fn initialize(config: &Config) -> AppResult<Self> {
        let transport = NetworkTransport::from_addr(
            &config.printer_addr,
            config.printer_codepage,
            Duration::from_millis(config.print_attempt_timeout_ms),
        )?;

        let pull: Option<Arc<dyn SnapshotSource>> = match &config.availability_url {
            Some(url) => Some(Arc::new(HttpSnapshotSource::new(
                url.clone(),
                config.sync_config().fetch_timeout,
            )?)),
            None => {
                tracing::warn!("AVAILABILITY_URL not set, availability sync disabled");
                None
            }
        };

        Ok(Self::with_components(config.clone(), Arc::new(transport), pull))
    }

    /// Wire components around a given transport and pull source
    pub fn with_components(
        config: Config,
        transport: Arc<dyn PrintTransport>,
        pull: Option<Arc<dyn SnapshotSource>>,
    ) -> Self {
        let queue = PrintDispatchQueue::new(transport.clone(), config.queue_config());
        let store = Arc::new(InMemoryOrderStore::new());
        let workflow = Arc::new(OrderWorkflow::new(
            store.clone(),
            ReceiptFormatter::new(config.receipt_config()),
            queue.clone(),
        ));
        let push = BroadcastPushSource::default();
        let synchronizer = pull.map(|pull| {
            Arc::new(AvailabilitySynchronizer::new(
                pull,
                Arc::new(push.clone()),
                config.sync_config(),
            ))
        });

        Self {
            config,
            transport,
            queue,
            store,
            workflow,
            push,
            synchronizer,
        }
    }

    /// Start the synchronizer and register the periodic tasks
    pub async fn start(&self, tasks: &mut BackgroundTasks) -> AppResult<()> {
        if let Some(sync) = &self.synchronizer {
            sync.start(|snapshot: &AvailabilitySnapshot| {
                tracing::info!(
                    channel = ?snapshot.channel,
                    products = snapshot.products.len(),
                    unavailable_ingredients = snapshot.unavailable_ingredients().len(),
                    "Availability updated"
                );
            })
            .await?;
        }

        let transport = self.transport.clone();
        let queue = self.queue.clone();
        tasks.spawn_periodic("printer_monitor", Duration::ZERO, PRINTER_CHECK_INTERVAL, move || {
            let transport = transport.clone();
            let queue = queue.clone();
            async move {
                queue.set_transport_ready(transport.is_ready().await);
            }
        });

        let queue = self.queue.clone();
        tasks.spawn_periodic("queue_status", STATUS_LOG_INTERVAL, STATUS_LOG_INTERVAL, move || {
            let status = queue.status();
            async move {
                tracing::info!(
                    queue_length = status.queue_length,
                    is_processing = status.is_processing,
                    transport_ready = status.transport_ready,
                    completed = status.completed_total,
                    failed = status.failed_total,
                    "Print queue status"
                );
            }
        });

        Ok(())
    }

    /// Stop sync, give the queue a bounded time to drain, then shut it down
    pub async fn shutdown(&self) {
        if let Some(sync) = &self.synchronizer {
            sync.stop();
        }

        let timeout = self.config.shutdown_timeout();
        if tokio::time::timeout(timeout, self.queue.wait_idle()).await.is_err() {
            tracing::warn!(
                pending = self.queue.status().queue_length,
                "Print queue not drained before shutdown timeout"
            );
        }
        self.queue.shutdown();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn queue(&self) -> &PrintDispatchQueue {
        &self.queue
    }

    pub fn store(&self) -> &Arc<InMemoryOrderStore> {
        &self.store
    }

    pub fn workflow(&self) -> &Arc<OrderWorkflow> {
        &self.workflow
    }

    /// Publisher side of the in-process push channel
    pub fn push(&self) -> &BroadcastPushSource {
        &self.push
    }

    pub fn synchronizer(&self) -> Option<&Arc<AvailabilitySynchronizer>> {
        self.synchronizer.as_ref()
    }

    /// Latest availability snapshot, if sync is enabled and has succeeded once
    pub fn availability(&self) -> Option<AvailabilitySnapshot> {
        self.synchronizer.as_ref().and_then(|s| s.snapshot())
    }
}

