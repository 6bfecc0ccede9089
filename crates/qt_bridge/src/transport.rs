use cloudview::protocol::OutboundMessage;
use std::future;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, Interval};

const CHANNEL_CAPACITY: usize = 256;

/// Connection state published by the link task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub addr: String,
    pub retry_delay: Duration,
    /// Consecutive failed connects before giving up; `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Keep-alive period; a heartbeat is always sent right after connecting.
    pub heartbeat: Option<Duration>,
}

/// How a connected session ended.
enum SessionEnd {
    PeerClosed,
    /// The owning `Link` was dropped.
    Shutdown,
}

/// Newline-delimited TCP link to the controller, reconnecting in the background.
pub struct Link {
    inbound: mpsc::Receiver<String>,
    outbound: mpsc::Sender<String>,
    state: watch::Receiver<LinkState>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl Link {
    pub fn spawn(settings: LinkSettings) -> Self {
        let (inbound_tx, inbound) = mpsc::channel(CHANNEL_CAPACITY);
        let (outbound, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (state_tx, state) = watch::channel(LinkState::Connecting);

        let task = tokio::spawn(run_link(settings, inbound_tx, outbound_rx, state_tx));

        Self {
            inbound,
            outbound,
            state,
            task,
        }
    }

    /// Next line from the controller. `None` once the link task has stopped.
    pub async fn recv(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<LinkState> {
        self.state.clone()
    }

    /// Queues `message` for the controller. Dropped unless connected.
    pub fn send(&self, message: &OutboundMessage) -> bool {
        if self.state() != LinkState::Connected {
            tracing::debug!(kind = message.kind, "Link down, dropping outbound message");
            return false;
        }
        match self.outbound.try_send(message.to_line()) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(kind = message.kind, error = %e, "Outbound queue rejected message");
                false
            }
        }
    }

    /// Stops accepting traffic and waits for the link task to finish.
    pub async fn join(self) -> anyhow::Result<()> {
        let Link {
            inbound,
            outbound,
            task,
            ..
        } = self;
        drop(inbound);
        drop(outbound);
        task.await?
    }
}

async fn run_link(
    settings: LinkSettings,
    inbound_tx: mpsc::Sender<String>,
    mut outbound_rx: mpsc::Receiver<String>,
    state_tx: watch::Sender<LinkState>,
) -> anyhow::Result<()> {
    let mut failures: u32 = 0;

    loop {
        state_tx.send_replace(LinkState::Connecting);
        tracing::info!(addr = %settings.addr, "Connecting to controller");

        match TcpStream::connect(&settings.addr).await {
            Ok(stream) => {
                failures = 0;
                state_tx.send_replace(LinkState::Connected);
                tracing::info!(addr = %settings.addr, "Connected to controller");

                let end = serve(stream, &settings, &inbound_tx, &mut outbound_rx).await;
                state_tx.send_replace(LinkState::Disconnected);
                match end {
                    Ok(SessionEnd::Shutdown) => {
                        tracing::info!("Link shut down");
                        return Ok(());
                    }
                    Ok(SessionEnd::PeerClosed) => tracing::warn!("Controller closed the connection"),
                    Err(e) => tracing::warn!(error = %e, "Connection lost"),
                }
            }
            Err(e) => {
                failures += 1;
                state_tx.send_replace(LinkState::Disconnected);
                tracing::warn!(addr = %settings.addr, attempt = failures, error = %e, "Connect failed");
                if let Some(max) = settings.max_attempts {
                    if failures >= max {
                        anyhow::bail!("giving up on {} after {} attempts", settings.addr, failures);
                    }
                }
            }
        }

        if inbound_tx.is_closed() {
            return Ok(());
        }

        let mut dropped = 0usize;
        while outbound_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(dropped, "Discarded outbound lines queued while disconnected");
        }

        sleep(settings.retry_delay).await;
    }
}

async fn serve(
    stream: TcpStream,
    settings: &LinkSettings,
    inbound_tx: &mpsc::Sender<String>,
    outbound_rx: &mut mpsc::Receiver<String>,
) -> anyhow::Result<SessionEnd> {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(error = %e, "Could not disable Nagle on controller socket");
    }
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    writer
        .write_all(OutboundMessage::heartbeat().to_line().as_bytes())
        .await?;

    let mut heartbeat = settings
        .heartbeat
        .map(|period| interval_at(Instant::now() + period, period));

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    if inbound_tx.send(line).await.is_err() {
                        return Ok(SessionEnd::Shutdown);
                    }
                }
                None => return Ok(SessionEnd::PeerClosed),
            },
            out = outbound_rx.recv() => match out {
                Some(line) => writer.write_all(line.as_bytes()).await?,
                None => return Ok(SessionEnd::Shutdown),
            },
            _ = next_heartbeat(&mut heartbeat) => {
                writer
                    .write_all(OutboundMessage::heartbeat().to_line().as_bytes())
                    .await?;
            }
        }
    }
}

async fn next_heartbeat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufRead, Lines};
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn settings(addr: String) -> LinkSettings {
        LinkSettings {
            addr,
            retry_delay: Duration::from_millis(20),
            max_attempts: None,
            heartbeat: None,
        }
    }

    async fn read_line<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>) -> String {
        timeout(WAIT, lines.next_line())
            .await
            .expect("timed out")
            .unwrap()
            .expect("stream closed")
    }

    #[tokio::test]
    async fn exchanges_lines_and_reconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let mut link = Link::spawn(settings(addr));

        // First session: heartbeat on connect, then traffic both ways.
        let (socket, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        let (reader, mut writer) = socket.into_split();
        let mut lines = BufReader::new(reader).lines();
        assert!(read_line(&mut lines).await.contains("\"heartbeat\""));

        writer
            .write_all(b"{\"type\":\"clear_point_cloud\"}\n\n")
            .await
            .unwrap();
        let received = timeout(WAIT, link.recv()).await.unwrap().unwrap();
        assert_eq!(received, "{\"type\":\"clear_point_cloud\"}");

        let mut state = link.watch_state();
        timeout(WAIT, state.wait_for(|s| *s == LinkState::Connected))
            .await
            .unwrap()
            .unwrap();
        assert!(link.send(&OutboundMessage::point_cloud_cleared()));
        assert!(read_line(&mut lines).await.contains("point_cloud_cleared"));

        // Drop the session; the link must come back and greet again.
        drop(lines);
        drop(writer);
        let (socket, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        let mut lines = BufReader::new(socket).lines();
        assert!(read_line(&mut lines).await.contains("\"heartbeat\""));

        drop(lines);
        drop(listener);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut link = Link::spawn(LinkSettings {
            max_attempts: Some(2),
            ..settings(addr)
        });
        assert!(timeout(WAIT, link.recv()).await.unwrap().is_none());
        assert!(!link.send(&OutboundMessage::heartbeat()));
        assert!(timeout(WAIT, link.join()).await.unwrap().is_err());
    }

    #[tokio::test]
    async fn periodic_heartbeats() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let _link = Link::spawn(LinkSettings {
            heartbeat: Some(Duration::from_millis(30)),
            ..settings(addr)
        });

        let (socket, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        let mut lines = BufReader::new(socket).lines();
        for _ in 0..3 {
            assert!(read_line(&mut lines).await.contains("\"heartbeat\""));
        }
    }
}
