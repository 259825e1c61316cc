use std::sync::Mutex;

use futures::{SinkExt, StreamExt};
use signage_shared::{realtime::Envelope, screen::ScreenId};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::reconnect::ReconnectPolicy;

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const EVENT_BUFFER: usize = 64;

/// Player side of the realtime channel.
///
/// Reconnects on its own and re-identifies after every connect, so
/// subscribers keep receiving events across drops without doing anything.
/// Outgoing messages are only delivered while a connection is up.
pub struct RealtimeClient {
    url: String,
    screen_id: ScreenId,
    auth_token: Option<String>,
    policy: ReconnectPolicy,
    events: broadcast::Sender<Envelope>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Envelope>>>,
}

impl RealtimeClient {
    pub fn new(
        url: impl Into<String>,
        screen_id: ScreenId,
        auth_token: Option<String>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            url: url.into(),
            screen_id,
            auth_token,
            policy,
            events,
            outbound: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.events.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.outbound
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    /// Returns `false` when the message was dropped because no connection is
    /// open.
    pub fn send(&self, envelope: Envelope) -> bool {
        let guard = self
            .outbound
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_ref() {
            Some(tx) if tx.send(envelope.clone()).is_ok() => true,
            _ => {
                warn!(kind = %envelope.kind, "realtime channel disconnected, message dropped");
                false
            }
        }
    }

    pub async fn run(&self, shutdown: CancellationToken) {
        let mut backoff = self.policy.backoff();
        loop {
            if shutdown.is_cancelled() {
                return;
            }

            match connect_async(self.url.as_str()).await {
                Ok((socket, _)) => {
                    info!(url = %self.url, "realtime channel connected");
                    backoff.reset();
                    self.run_session(socket, &shutdown).await;
                    if shutdown.is_cancelled() {
                        return;
                    }
                    warn!("realtime channel closed");
                }
                Err(e) => warn!(url = %self.url, "realtime connect failed: {e}"),
            }

            let delay = backoff.next_delay();
            debug!(?delay, attempt = backoff.failures(), "scheduling realtime reconnect");
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn run_session(&self, socket: Socket, shutdown: &CancellationToken) {
        let (mut sink, mut stream) = socket.split();

        let identify = Envelope::identify(self.screen_id.clone(), self.auth_token.clone());
        if let Err(e) = send_envelope(&mut sink, &identify).await {
            warn!("failed to identify screen: {e}");
            return;
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        self.set_outbound(Some(tx));

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    let _ = sink.close().await;
                    break;
                }
                Some(envelope) = rx.recv() => {
                    if let Err(e) = send_envelope(&mut sink, &envelope).await {
                        warn!("realtime send failed: {e}");
                        break;
                    }
                }
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.dispatch(text.as_str()),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("realtime connection error: {e}");
                        break;
                    }
                },
            }
        }

        self.set_outbound(None);
    }

    fn dispatch(&self, text: &str) {
        match serde_json::from_str::<Envelope>(text) {
            Ok(envelope) => {
                if envelope.kind == signage_shared::realtime::ERROR {
                    warn!(payload = ?envelope.payload, "server rejected a realtime message");
                }
                // no subscribers is fine
                let _ = self.events.send(envelope);
            }
            Err(e) => debug!("ignoring malformed realtime frame: {e}"),
        }
    }

    fn set_outbound(&self, tx: Option<mpsc::UnboundedSender<Envelope>>) {
        *self
            .outbound
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = tx;
    }
}

async fn send_envelope<S>(sink: &mut S, envelope: &Envelope) -> anyhow::Result<()>
where
    S: futures::Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let text = serde_json::to_string(envelope)?;
    sink.send(Message::text(text)).await?;
    Ok(())
}
