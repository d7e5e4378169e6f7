//! Push-channel subscription for one mounted board.

use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{ConnectionError, DecodeError};
use crate::live::frame::{Command, Frame};
use crate::types::Task;

const SUBSCRIPTION_ID: &str = "sub-0";
const DISCONNECT_RECEIPT: &str = "disconnect-0";
const RECEIPT_WAIT: Duration = Duration::from_secs(2);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerState {
    Disconnected,
    Connecting,
    Subscribed,
    Disconnecting,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiveConfig {
    pub url: String,
    pub topic: String,
}

/// Subscribes to task-change events and hands each decoded task to a callback.
#[derive(Clone, Debug)]
pub struct LiveUpdateListener {
    config: LiveConfig,
}

impl LiveUpdateListener {
    pub fn new(config: LiveConfig) -> Self {
        Self { config }
    }

    /// Start connecting in the background. The callback runs only once the
    /// subscription is confirmed, once per inbound task message.
    pub fn mount<F>(&self, on_update: F) -> ListenerHandle
    where
        F: FnMut(Task) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(ListenerState::Connecting);
        let task = tokio::spawn(run(
            self.config.clone(),
            on_update,
            cancel.clone(),
            state_tx,
        ));
        ListenerHandle {
            cancel,
            state: state_rx,
            task: Some(task),
        }
    }
}

/// Owner of a mounted listener. Dropping it cancels the listener too.
pub struct ListenerHandle {
    cancel: CancellationToken,
    state: watch::Receiver<ListenerState>,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    /// Wait until the listener reports `wanted`. False if it stopped first.
    pub async fn wait_for(&mut self, wanted: ListenerState) -> bool {
        self.state.wait_for(|s| *s == wanted).await.is_ok()
    }

    /// Tear the subscription down and wait for the listener to finish.
    pub async fn unmount(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            error!(error = %err, "push listener task failed");
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// How far the link got; decides what release has to do.
enum Link {
    Pending,
    Subscribed(Session),
    Lost,
}

enum Inbound {
    Frame(Frame),
    Idle,
    Closed,
}

enum PumpEnd {
    Unmounted,
    Lost,
}

struct Session {
    socket: Socket,
    subscription: String,
}

async fn run<F>(
    config: LiveConfig,
    mut on_update: F,
    cancel: CancellationToken,
    state: watch::Sender<ListenerState>,
) where
    F: FnMut(Task) + Send + 'static,
{
    info!(url = %config.url, topic = %config.topic, "connecting to push channel");

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = handshake(&config) => Some(result),
    };

    let link = match outcome {
        None => Link::Pending,
        Some(Err(err)) => {
            error!(url = %config.url, error = %err, "push channel handshake failed");
            state.send_replace(ListenerState::Disconnected);
            return;
        }
        Some(Ok(mut session)) => {
            state.send_replace(ListenerState::Subscribed);
            info!(topic = %config.topic, "subscribed to task updates");
            match session.pump(&cancel, &mut on_update).await {
                PumpEnd::Unmounted => Link::Subscribed(session),
                PumpEnd::Lost => Link::Lost,
            }
        }
    };

    release(link, &state).await;
}

async fn release(link: Link, state: &watch::Sender<ListenerState>) {
    match link {
        Link::Pending => {
            debug!("unmounted before the handshake completed; nothing to close");
        }
        Link::Lost => {
            debug!("push channel already gone; nothing to close");
        }
        Link::Subscribed(session) => {
            state.send_replace(ListenerState::Disconnecting);
            match session.close().await {
                Ok(()) => info!("push channel disconnected"),
                Err(err) => warn!(error = %err, "push channel did not close cleanly"),
            }
        }
    }
    state.send_replace(ListenerState::Disconnected);
}

async fn handshake(config: &LiveConfig) -> Result<Session, ConnectionError> {
    let (mut socket, _) = connect_async(config.url.as_str()).await?;
    let host = config
        .url
        .parse::<Uri>()
        .ok()
        .and_then(|uri| uri.host().map(str::to_string))
        .unwrap_or_else(|| "localhost".to_string());

    socket.send(Message::text(Frame::connect(&host).encode())).await?;

    loop {
        let message = socket.next().await.ok_or(ConnectionError::Closed)??;
        match classify(message) {
            Ok(Inbound::Frame(frame)) => match frame.command {
                Command::Connected => {
                    debug!(version = frame.get("version").unwrap_or("?"), "broker accepted connection");
                    break;
                }
                Command::Error => return Err(ConnectionError::Rejected(frame.error_message())),
                other => debug!(command = %other, "ignoring frame before CONNECTED"),
            },
            Ok(Inbound::Idle) => {}
            Ok(Inbound::Closed) => return Err(ConnectionError::Closed),
            Err(err) => return Err(ConnectionError::Rejected(err.to_string())),
        }
    }

    socket
        .send(Message::text(
            Frame::subscribe(SUBSCRIPTION_ID, &config.topic).encode(),
        ))
        .await?;

    Ok(Session {
        socket,
        subscription: SUBSCRIPTION_ID.to_string(),
    })
}

impl Session {
    async fn pump<F>(&mut self, cancel: &CancellationToken, on_update: &mut F) -> PumpEnd
    where
        F: FnMut(Task),
    {
        loop {
            let message = tokio::select! {
                biased;
                _ = cancel.cancelled() => return PumpEnd::Unmounted,
                message = self.socket.next() => message,
            };
            let message = match message {
                Some(Ok(message)) => message,
                Some(Err(err)) => {
                    warn!(error = %err, "push channel failed");
                    return PumpEnd::Lost;
                }
                None => {
                    warn!("push channel closed by the server");
                    return PumpEnd::Lost;
                }
            };

            match classify(message) {
                Ok(Inbound::Frame(frame)) => match frame.command {
                    Command::Message => match decode_task(&frame) {
                        Ok(task) => {
                            debug!(task_id = task.id, "task update received");
                            on_update(task);
                        }
                        Err(err) => warn!(error = %err, "skipping malformed task update"),
                    },
                    Command::Error => {
                        error!(message = %frame.error_message(), "broker reported an error");
                        return PumpEnd::Lost;
                    }
                    other => debug!(command = %other, "ignoring frame"),
                },
                Ok(Inbound::Idle) => {}
                Ok(Inbound::Closed) => {
                    warn!("push channel closed by the server");
                    return PumpEnd::Lost;
                }
                Err(err) => warn!(error = %err, "skipping unreadable frame"),
            }
        }
    }

    async fn close(mut self) -> Result<(), ConnectionError> {
        self.socket
            .send(Message::text(Frame::unsubscribe(&self.subscription).encode()))
            .await?;
        self.socket
            .send(Message::text(Frame::disconnect(DISCONNECT_RECEIPT).encode()))
            .await?;

        let socket = &mut self.socket;
        let receipt = tokio::time::timeout(RECEIPT_WAIT, async {
            while let Some(Ok(message)) = socket.next().await {
                if let Ok(Inbound::Frame(frame)) = classify(message)
                    && frame.command == Command::Receipt
                {
                    return true;
                }
            }
            false
        })
        .await;
        if !matches!(receipt, Ok(true)) {
            debug!("no DISCONNECT receipt from broker");
        }

        if let Err(err) = self.socket.close(None).await {
            debug!(error = %err, "websocket close after DISCONNECT");
        }
        Ok(())
    }
}

fn classify(message: Message) -> Result<Inbound, DecodeError> {
    let frame = match message {
        Message::Text(text) => Frame::parse(text.as_str())?,
        Message::Binary(bytes) => {
            let text = std::str::from_utf8(&bytes).map_err(|_| DecodeError::Binary(bytes.len()))?;
            Frame::parse(text)?
        }
        Message::Close(_) => return Ok(Inbound::Closed),
        _ => None,
    };
    Ok(frame.map(Inbound::Frame).unwrap_or(Inbound::Idle))
}

fn decode_task(frame: &Frame) -> Result<Task, DecodeError> {
    Ok(serde_json::from_str(&frame.body)?)
}
