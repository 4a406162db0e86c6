//! Source adapters for raw sentence lines.
//!
//! A source is anything that yields one sentence per call until it closes:
//! a bound UDP socket in production, a recorded line-per-sentence file for
//! replay and testing. Sources carry no decoding logic; they hand trimmed
//! lines to the pipeline and report end-of-stream exactly once.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tracing::{debug, info};

/// Trait for sources of raw sentence lines.
///
/// `next_line` returns:
/// - `Ok(Some(line))` - next line available
/// - `Ok(None)` - clean end of stream (no more lines will ever arrive)
/// - `Err(e)` - transport failure; the caller treats the source as dead
#[async_trait]
pub trait SentenceSource: Send {
    /// Establish the underlying transport. Must be called before the first
    /// `next_line`.
    async fn open(&mut self) -> Result<()>;

    /// Wait for the next line.
    async fn next_line(&mut self) -> Result<Option<String>>;

    /// Release the transport. In-flight reads are abandoned by the caller,
    /// not interrupted here.
    async fn close(&mut self);
}

/// UDP listener source: one datagram per sentence.
pub struct UdpSource {
    bind_addr: SocketAddr,
    socket: Option<UdpSocket>,
    recv_buf: Vec<u8>,
}

impl UdpSource {
    /// Conventional NMEA-over-UDP port.
    pub const DEFAULT_PORT: u16 = 10110;

    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            socket: None,
            recv_buf: vec![0u8; 2048],
        }
    }

    pub fn on_port(port: u16) -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], port)))
    }

    /// Address the socket actually bound to (useful when binding port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }
}

#[async_trait]
impl SentenceSource for UdpSource {
    async fn open(&mut self) -> Result<()> {
        let socket = UdpSocket::bind(self.bind_addr)
            .await
            .with_context(|| format!("failed to bind UDP source on {}", self.bind_addr))?;
        info!("Listening for sentences on udp://{}", self.bind_addr);
        self.socket = Some(socket);
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        let Some(socket) = self.socket.as_ref() else {
            bail!("UDP source read before open");
        };

        let (len, peer) = socket
            .recv_from(&mut self.recv_buf)
            .await
            .context("UDP receive failed")?;
        metrics::counter!("nmea.udp.datagrams_received_total").increment(1);

        let line = String::from_utf8_lossy(&self.recv_buf[..len])
            .trim_end()
            .to_string();
        debug!(peer = %peer, bytes = len, "datagram received");
        Ok(Some(line))
    }

    async fn close(&mut self) {
        if self.socket.take().is_some() {
            info!("UDP source on {} closed", self.bind_addr);
        }
    }
}

/// File-backed source that replays a recorded sentence log, one line per
/// sentence. Yields `None` at end of file.
pub struct FileReplaySource {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    line_buffer: String,
    lines_read: usize,
}

impl FileReplaySource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            reader: None,
            line_buffer: String::new(),
            lines_read: 0,
        }
    }

    pub fn lines_read(&self) -> usize {
        self.lines_read
    }
}

#[async_trait]
impl SentenceSource for FileReplaySource {
    async fn open(&mut self) -> Result<()> {
        let file = File::open(&self.path)
            .await
            .with_context(|| format!("failed to open replay file {:?}", self.path))?;
        info!("Replaying sentences from {:?}", self.path);
        self.reader = Some(BufReader::new(file));
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        let Some(reader) = self.reader.as_mut() else {
            bail!("replay source read before open");
        };

        self.line_buffer.clear();
        let bytes_read = reader
            .read_line(&mut self.line_buffer)
            .await
            .context("replay file read failed")?;

        if bytes_read == 0 {
            debug!("replay file exhausted after {} lines", self.lines_read);
            return Ok(None);
        }

        self.lines_read += 1;
        Ok(Some(self.line_buffer.trim_end().to_string()))
    }

    async fn close(&mut self) {
        self.reader.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn replay_source_yields_lines_then_end_of_stream() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47")
            .unwrap();
        writeln!(temp_file, "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A")
            .unwrap();
        temp_file.flush().unwrap();

        let mut source = FileReplaySource::new(temp_file.path());
        source.open().await.unwrap();

        let first = source.next_line().await.unwrap().unwrap();
        assert!(first.starts_with("$GPGGA"));
        assert!(!first.ends_with('\n'));

        let second = source.next_line().await.unwrap().unwrap();
        assert!(second.starts_with("$GPRMC"));
        assert_eq!(source.lines_read(), 2);

        assert!(source.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replay_source_fails_cleanly_on_missing_file() {
        let mut source = FileReplaySource::new("/nonexistent/voyage.log");
        assert!(source.open().await.is_err());
    }

    #[tokio::test]
    async fn udp_source_receives_a_datagram() {
        let mut source = UdpSource::new(SocketAddr::from(([127, 0, 0, 1], 0)));
        source.open().await.unwrap();
        let addr = source.local_addr().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender
            .send_to(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n", addr)
            .await
            .unwrap();

        let line = source.next_line().await.unwrap().unwrap();
        assert!(line.starts_with("$GPGGA"));
        assert!(!line.ends_with('\r') && !line.ends_with('\n'));

        source.close().await;
    }

    #[tokio::test]
    async fn udp_source_rejects_read_before_open() {
        let mut source = UdpSource::on_port(UdpSource::DEFAULT_PORT);
        assert!(source.next_line().await.is_err());
    }
}
