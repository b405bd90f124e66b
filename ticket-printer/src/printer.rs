//! Raw TCP ticket printer
//!
//! 每张小票一次连接：连接 → 写入编码后的文本 → 关闭写端。

use crate::encoding::Codepage;
use crate::error::{PrintError, PrintResult};
use std::fmt;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, instrument, warn};

/// Raw printing port of most thermal printers
pub const DEFAULT_PORT: u16 = 9100;

/// Network thermal printer addressed by host and port
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    host: String,
    port: u16,
    codepage: Codepage,
    connect_timeout: Duration,
    ping_timeout: Duration,
}

impl NetworkPrinter {
    /// Parse `host`, `host:port` or `[v6]:port`. The port defaults to 9100.
    pub fn parse(addr: &str) -> PrintResult<Self> {
        let trimmed = addr.trim();
        let invalid = || PrintError::InvalidAddress(addr.to_string());

        let (host, port) = if let Some(rest) = trimmed.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            match tail.strip_prefix(':') {
                Some(port) => (host, port.parse().map_err(|_| invalid())?),
                None if tail.is_empty() => (host, DEFAULT_PORT),
                None => return Err(invalid()),
            }
        } else {
            match trimmed.split_once(':') {
                Some((host, port)) => (host, port.parse().map_err(|_| invalid())?),
                None => (trimmed, DEFAULT_PORT),
            }
        };

        if host.is_empty() || host.contains(char::is_whitespace) || port == 0 {
            return Err(invalid());
        }

        Ok(Self {
            host: host.to_string(),
            port,
            codepage: Codepage::default(),
            connect_timeout: Duration::from_secs(5),
            ping_timeout: Duration::from_millis(500),
        })
    }

    pub fn with_codepage(mut self, codepage: Codepage) -> Self {
        self.codepage = codepage;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Upper bound for [`is_online`](Self::is_online)
    pub fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn codepage(&self) -> Codepage {
        self.codepage
    }

    /// Encode `text` to the printer codepage and send it as one job.
    ///
    /// Returns the number of bytes written.
    #[instrument(skip(self, text), fields(addr = %self, codepage = ?self.codepage))]
    pub async fn print_text(&self, text: &str) -> PrintResult<usize> {
        let data = self.codepage.encode(text);
        self.print_bytes(&data).await?;
        Ok(data.len())
    }

    /// Send already-encoded bytes
    pub async fn print_bytes(&self, data: &[u8]) -> PrintResult<()> {
        let mut stream = self.connect(self.connect_timeout).await?;

        let mut written = 0;
        while written < data.len() {
            match stream.write(&data[written..]).await {
                Ok(0) => return Err(self.write_error(written, std::io::ErrorKind::WriteZero.into())),
                Ok(n) => written += n,
                Err(e) => return Err(self.write_error(written, e)),
            }
        }
        stream
            .flush()
            .await
            .map_err(|e| self.write_error(written, e))?;
        stream
            .shutdown()
            .await
            .map_err(|e| self.write_error(written, e))?;

        debug!(bytes = written, "Ticket sent");
        Ok(())
    }

    /// Connect check bounded by the ping timeout
    pub async fn ping(&self) -> PrintResult<()> {
        self.connect(self.ping_timeout).await.map(drop)
    }

    pub async fn is_online(&self) -> bool {
        match self.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(addr = %self, error = %e, "Printer ping failed");
                false
            }
        }
    }

    async fn connect(&self, timeout: Duration) -> PrintResult<TcpStream> {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(timeout, connect).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(PrintError::Unreachable {
                addr: self.to_string(),
                source,
            }),
            Err(_) => Err(PrintError::Timeout {
                addr: self.to_string(),
                timeout,
            }),
        }
    }

    fn write_error(&self, written: usize, source: std::io::Error) -> PrintError {
        PrintError::Write {
            addr: self.to_string(),
            written,
            source,
        }
    }
}

impl fmt::Display for NetworkPrinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
