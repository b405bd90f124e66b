//! Print transport
//!
//! 打印传输层：队列只依赖 `PrintTransport`，不关心具体打印机。

use async_trait::async_trait;
use std::time::Duration;
use ticket_printer::{Codepage, NetworkPrinter, PrintResult};
use tracing::instrument;

use super::types::PrintPayload;

/// Anything that can put a rendered ticket on paper
#[async_trait]
pub trait PrintTransport: Send + Sync {
    /// Deliver one payload. Errors are retried by the dispatch queue.
    async fn send(&self, payload: &PrintPayload) -> PrintResult<()>;

    /// Best-effort reachability check
    async fn is_ready(&self) -> bool {
        true
    }
}

/// Raw TCP thermal printer (port 9100)
#[derive(Debug, Clone)]
pub struct NetworkTransport {
    printer: NetworkPrinter,
}

impl NetworkTransport {
    pub fn new(printer: NetworkPrinter) -> Self {
        Self { printer }
    }

    /// `addr` is `host` or `host:port` (e.g., "192.168.1.100:9100")
    pub fn from_addr(addr: &str, codepage: Codepage, connect_timeout: Duration) -> PrintResult<Self> {
        let printer = NetworkPrinter::parse(addr)?
            .with_codepage(codepage)
            .with_connect_timeout(connect_timeout);
        Ok(Self::new(printer))
    }

    pub fn printer(&self) -> &NetworkPrinter {
        &self.printer
    }
}

#[async_trait]
impl PrintTransport for NetworkTransport {
    #[instrument(skip_all, fields(order_id = %payload.order_id, printer = %self.printer))]
    async fn send(&self, payload: &PrintPayload) -> PrintResult<()> {
        let bytes = self.printer.print_text(&payload.text).await?;
        tracing::debug!(bytes, "Payload delivered");
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.printer.is_online().await
    }
}
