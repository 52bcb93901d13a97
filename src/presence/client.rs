use super::session::{Outcome, Session};
use super::{LinkState, PresenceEvent};
use crate::task::CancelToken;
use anyhow::{bail, Context, Result};
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use std::io;
use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Error as WsError, Message, WebSocket};

/// Sentinel shipped in the default config; the client never dials with it.
pub(crate) const PLACEHOLDER_USER_ID: &str = "YOUR_DISCORD_USER_ID_HERE";

pub(crate) fn is_placeholder(user_id: &str) -> bool {
    let id = user_id.trim();
    id.is_empty() || id == PLACEHOLDER_USER_ID
}

pub(crate) trait Connection {
    /// Waits up to `wait` for one text message. `Ok(None)` on timeout or a control frame.
    fn recv(&mut self, wait: Duration) -> Result<Option<String>>;
    fn send(&mut self, text: &str) -> Result<()>;
}

pub(crate) trait Connector {
    type Conn: Connection;
    fn connect(&mut self) -> Result<Self::Conn>;
}

#[derive(Debug, Clone)]
pub(crate) struct ClientOptions {
    pub(crate) user_id: String,
    pub(crate) url: String,
    pub(crate) reconnect_delay: Duration,
    /// Upper bound on one blocking read, so cancellation is noticed.
    pub(crate) poll: Duration,
}

pub(crate) struct WsConnector {
    url: String,
}

impl WsConnector {
    pub(crate) fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

pub(crate) struct WsConnection {
    ws: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl Connector for WsConnector {
    type Conn = WsConnection;

    fn connect(&mut self) -> Result<WsConnection> {
        let (ws, _resp) = tungstenite::connect(self.url.as_str())
            .with_context(|| format!("failed to connect to {}", self.url))?;
        Ok(WsConnection { ws })
    }
}

fn set_read_timeout(stream: &mut MaybeTlsStream<TcpStream>, wait: Duration) -> io::Result<()> {
    let wait = Some(wait.max(Duration::from_millis(1)));
    match stream {
        MaybeTlsStream::Plain(s) => s.set_read_timeout(wait),
        MaybeTlsStream::Rustls(s) => s.get_mut().set_read_timeout(wait),
        _ => Ok(()),
    }
}

impl Connection for WsConnection {
    fn recv(&mut self, wait: Duration) -> Result<Option<String>> {
        set_read_timeout(self.ws.get_mut(), wait).context("failed to set read timeout")?;
        match self.ws.read() {
            Ok(Message::Text(text)) => Ok(Some(text)),
            Ok(Message::Close(frame)) => bail!("server closed the channel: {frame:?}"),
            // pongs are queued by tungstenite and flushed on the next read or write
            Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {
                Ok(None)
            }
            Err(WsError::Io(ref e))
                if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
            {
                Ok(None)
            }
            Err(e) => Err(e).context("websocket read failed"),
        }
    }

    fn send(&mut self, text: &str) -> Result<()> {
        self.ws
            .send(Message::Text(text.to_owned()))
            .context("websocket write failed")
    }
}

/// Starts the background subscription. Demo mode (placeholder id) announces
/// itself on the channel and starts nothing.
pub(crate) fn spawn(
    opts: ClientOptions,
    tx: Sender<PresenceEvent>,
    cancel: CancelToken,
) -> Result<Option<thread::JoinHandle<()>>> {
    if is_placeholder(&opts.user_id) {
        info!("no user id configured, presence disabled");
        let _ = tx.send(PresenceEvent::Link(LinkState::Demo));
        return Ok(None);
    }
    let handle = thread::Builder::new()
        .name("presence".into())
        .spawn(move || {
            let mut connector = WsConnector::new(opts.url.clone());
            run(&mut connector, &opts, &tx, &cancel);
        })
        .context("failed to spawn presence thread")?;
    Ok(Some(handle))
}

/// Connect, subscribe, relay pushes; on any close wait out the fixed delay and go again.
pub(crate) fn run<C: Connector>(
    connector: &mut C,
    opts: &ClientOptions,
    tx: &Sender<PresenceEvent>,
    cancel: &CancelToken,
) {
    let mut session = Session::new(opts.user_id.clone(), opts.reconnect_delay, Instant::now());
    while !cancel.is_cancelled() {
        session.begin_connect();
        if !publish(tx, PresenceEvent::Link(LinkState::Connecting)) {
            break;
        }
        match connector.connect() {
            Ok(mut conn) => {
                info!("presence channel open (attempt {})", session.attempts());
                if let Err(e) = pump(&mut conn, &mut session, opts.poll, tx, cancel) {
                    warn!("presence channel lost: {e:#}");
                }
            }
            Err(e) => warn!("presence connect failed: {e:#}"),
        }
        session.on_close(Instant::now());
        if cancel.is_cancelled() {
            break;
        }
        let offline = LinkState::Offline {
            retry_in: opts.reconnect_delay,
        };
        if !publish(tx, PresenceEvent::Link(offline)) {
            break;
        }
        debug!("reconnecting in {:?}", opts.reconnect_delay);
        if let Some(at) = session.retry_at() {
            if !cancel.sleep_until(at) {
                break;
            }
        }
    }
    debug!("presence client stopped");
}

fn publish(tx: &Sender<PresenceEvent>, ev: PresenceEvent) -> bool {
    tx.send(ev).is_ok()
}

/// Runs one connection until it fails, closes, or the app goes away.
fn pump<C: Connection>(
    conn: &mut C,
    session: &mut Session,
    poll: Duration,
    tx: &Sender<PresenceEvent>,
    cancel: &CancelToken,
) -> Result<()> {
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }
        let now = Instant::now();
        if let Some(beat) = session.poll_heartbeat(now)? {
            conn.send(&beat)?;
            log::trace!("heartbeat sent");
        }
        let wait = session.until_heartbeat(now).map_or(poll, |d| d.min(poll));
        let Some(text) = conn.recv(wait)? else {
            continue;
        };
        match session.on_text(&text, Instant::now()) {
            Ok(Outcome::Subscribe(reply)) => {
                conn.send(&reply)?;
                if !publish(tx, PresenceEvent::Link(LinkState::Live)) {
                    return Ok(());
                }
            }
            Ok(Outcome::Publish(presence)) => {
                if !publish(tx, PresenceEvent::Presence(presence)) {
                    return Ok(());
                }
            }
            Ok(Outcome::Ignore) => {}
            Err(e) => warn!("dropping presence message: {e:#}"),
        }
    }
}
