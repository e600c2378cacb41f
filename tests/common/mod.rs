//! Shared helpers for integration tests.
//!
//! [`MockServer`] is an in-process window service on `127.0.0.1:0`. It
//! records every request frame, answers through a pluggable responder, and
//! lets a test push arbitrary frames or drop the live socket.
//!
//! [`EventRecorder`] forwards every client event into a channel so tests
//! can await lifecycle transitions instead of sleeping.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;

use window_relay::{ClientEvent, EventBus, EventKind};

/// How long helpers wait before failing a test.
pub const WAIT: Duration = Duration::from_secs(5);

/// Installs a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// ============================================================================
// MockServer
// ============================================================================

/// Maps a request frame to an optional reply frame.
pub type Responder = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

enum Control {
    Push(String),
    Drop,
}

pub struct MockServer {
    addr: SocketAddr,
    requests: mpsc::UnboundedReceiver<Value>,
    current: Arc<Mutex<Option<mpsc::UnboundedSender<Control>>>>,
    accepted: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl MockServer {
    /// Starts a server that answers every request with `success: true`.
    pub async fn start() -> anyhow::Result<Self> {
        Self::with_responder(Arc::new(|request: &Value| Some(ok_reply(request, Value::Null)))).await
    }

    /// Starts a server that never answers.
    pub async fn silent() -> anyhow::Result<Self> {
        Self::with_responder(Arc::new(|_: &Value| None)).await
    }

    /// Starts a server with a custom responder.
    pub async fn with_responder(responder: Responder) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (requests_tx, requests) = mpsc::unbounded_channel();
        let current = Arc::new(Mutex::new(None));
        let accepted = Arc::new(AtomicUsize::new(0));

        let task = tokio::spawn(accept_loop(
            listener,
            requests_tx,
            Arc::clone(&current),
            Arc::clone(&accepted),
            responder,
        ));

        Ok(Self {
            addr,
            requests,
            current,
            accepted,
            task,
        })
    }

    pub fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Number of sockets accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Waits for the next request frame.
    pub async fn next_request(&mut self) -> anyhow::Result<Value> {
        timeout(WAIT, self.requests.recv())
            .await?
            .ok_or_else(|| anyhow::anyhow!("mock server stopped"))
    }

    /// Sends a raw text frame on the live socket.
    pub fn push(&self, text: impl Into<String>) {
        if let Some(tx) = self.current.lock().as_ref() {
            let _ = tx.send(Control::Push(text.into()));
        }
    }

    /// Sends a JSON frame on the live socket.
    pub fn push_json(&self, frame: Value) {
        self.push(frame.to_string());
    }

    /// Closes the live socket from the server side.
    pub fn drop_connection(&self) {
        if let Some(tx) = self.current.lock().take() {
            let _ = tx.send(Control::Drop);
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    requests_tx: mpsc::UnboundedSender<Value>,
    current: Arc<Mutex<Option<mpsc::UnboundedSender<Control>>>>,
    accepted: Arc<AtomicUsize>,
    responder: Responder,
) {
    while let Ok((stream, _)) = listener.accept().await {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        *current.lock() = Some(control_tx);
        accepted.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(serve(
            stream,
            control_rx,
            requests_tx.clone(),
            Arc::clone(&responder),
        ));
    }
}

async fn serve(
    stream: TcpStream,
    mut control_rx: mpsc::UnboundedReceiver<Control>,
    requests_tx: mpsc::UnboundedSender<Value>,
    responder: Responder,
) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };

    loop {
        tokio::select! {
            message = ws.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let Ok(request) = serde_json::from_str::<Value>(text.as_str()) else {
                        continue;
                    };
                    let reply = responder(&request);
                    let _ = requests_tx.send(request);
                    if let Some(reply) = reply {
                        let _ = ws.send(Message::text(reply.to_string())).await;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            },

            control = control_rx.recv() => match control {
                Some(Control::Push(text)) => {
                    let _ = ws.send(Message::text(text)).await;
                }
                Some(Control::Drop) | None => {
                    let _ = ws.close(None).await;
                    return;
                }
            },
        }
    }
}

/// Builds `{"success": true, "message": "ok", "action": <request action>, "data": ...}`.
pub fn ok_reply(request: &Value, data: Value) -> Value {
    let mut reply = json!({
        "success": true,
        "message": "ok",
        "action": request["action"],
    });
    if !data.is_null() {
        reply["data"] = data;
    }
    reply
}

/// Returns a `127.0.0.1` URL nothing is listening on.
pub async fn closed_port_url() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("ws://{addr}/ws"))
}

// ============================================================================
// EventRecorder
// ============================================================================

pub struct EventRecorder {
    rx: mpsc::UnboundedReceiver<ClientEvent>,
}

impl EventRecorder {
    /// Subscribes to every event kind on `events`.
    pub fn attach(events: &EventBus) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        for kind in [
            EventKind::Connected,
            EventKind::Disconnected,
            EventKind::Error,
            EventKind::Message,
        ] {
            let tx = tx.clone();
            events.subscribe(kind, move |event| {
                let _ = tx.send(event.clone());
            });
        }
        Self { rx }
    }

    /// Waits for the next event matching `predicate`, skipping others.
    pub async fn wait_for(
        &mut self,
        predicate: impl Fn(&ClientEvent) -> bool,
    ) -> anyhow::Result<ClientEvent> {
        timeout(WAIT, async {
            while let Some(event) = self.rx.recv().await {
                if predicate(&event) {
                    return Ok(event);
                }
            }
            Err(anyhow::anyhow!("event bus dropped"))
        })
        .await?
    }

    pub async fn connected(&mut self) -> anyhow::Result<()> {
        self.wait_for(|e| matches!(e, ClientEvent::Connected { .. }))
            .await
            .map(|_| ())
    }

    pub async fn disconnected(&mut self) -> anyhow::Result<()> {
        self.wait_for(|e| matches!(e, ClientEvent::Disconnected { .. }))
            .await
            .map(|_| ())
    }

    /// Returns everything received so far without waiting.
    pub fn drain(&mut self) -> Vec<ClientEvent> {
        std::iter::from_fn(|| self.rx.try_recv().ok()).collect()
    }
}

/// Polls `condition` until it holds or [`WAIT`] elapses.
pub async fn eventually(condition: impl Fn() -> bool) -> anyhow::Result<()> {
    timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(())
}
