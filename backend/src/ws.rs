use crate::client::{decode_request, Client, Connection, ConnectionError};
use crate::error::MatchmakingError;
use crate::pairing::WRONG_ACTION;
use crate::queue::QueueService;
use crate::services::{ServiceError, UserId};
use async_trait::async_trait;
use common::{status, Action, Request, Response};
use futures::stream::SplitStream;
use futures::{FutureExt, StreamExt};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, info, warn};
use warp::ws::{Message, WebSocket};

pub const ADDED: &str = "you added!";
pub const LEFT: &str = "you left!";
pub const NOT_IN_SEARCH: &str = "you are not in search";
pub const SQUAD_REQUIRED: &str = "squad id is required";

#[derive(Debug, Clone)]
pub struct Sender(pub mpsc::UnboundedSender<Result<Message, warp::Error>>);

/// A warp WebSocket seen as a [`Connection`]. Writes go through a channel
/// drained into the socket by a spawned task, reads take the stream half.
pub struct WsConnection {
    sender: Sender,
    receiver: Mutex<SplitStream<WebSocket>>,
    closed: AtomicBool,
}

impl WsConnection {
    pub fn new(ws: WebSocket) -> Self {
        let (client_ws_sender, client_ws_rcv) = ws.split();
        let (client_sender, client_rcv) = mpsc::unbounded_channel();

        let client_rcv = UnboundedReceiverStream::new(client_rcv);
        tokio::task::spawn(client_rcv.forward(client_ws_sender).map(|result| {
            if let Err(e) = result {
                error!("error sending websocket msg: {}", e);
            }
        }));

        WsConnection {
            sender: Sender(client_sender),
            receiver: Mutex::new(client_ws_rcv),
            closed: AtomicBool::new(false),
        }
    }
}

impl fmt::Debug for WsConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsConnection")
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connection for WsConnection {
    async fn read_request(&self) -> Result<Request, ConnectionError> {
        let mut receiver = self.receiver.lock().await;
        while let Some(result) = receiver.next().await {
            let msg = result.map_err(|e| ConnectionError::Read(e.to_string()))?;
            if msg.is_close() {
                return Err(ConnectionError::Closed);
            }
            // Pings, pongs and binary frames carry no request
            let text = match msg.to_str() {
                Ok(v) => v.trim(),
                Err(_) => continue,
            };
            if text == "ping" {
                continue;
            }
            return decode_request(self, text).await;
        }
        Err(ConnectionError::Closed)
    }

    async fn write_response(&self, status: u16, message: Value) -> Result<(), ConnectionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConnectionError::Write("connection is closed".to_string()));
        }
        let text = serde_json::to_string(&Response::new(status, message))
            .map_err(|e| ConnectionError::Write(e.to_string()))?;
        self.sender
            .0
            .send(Ok(Message::text(text)))
            .map_err(|_| ConnectionError::Write("websocket is gone".to_string()))
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            // Fails only when the socket is already gone
            let _ = self.sender.0.send(Ok(Message::close()));
        }
    }
}

pub async fn client_connection(ws: WebSocket, user_id: UserId, queue: QueueService) {
    let connection = Arc::new(WsConnection::new(ws));
    info!(%user_id, "connected");

    let request = match connection.read_request().await {
        Ok(request) => request,
        Err(err) => {
            error!(%user_id, "error receiving first request: {}", err);
            connection.close().await;
            return;
        }
    };

    match request.action {
        Action::StartSearch => start_search(user_id, connection, request, &queue).await,
        Action::FinishSearch => finish_search(user_id, connection, &queue).await,
        action => {
            warn!(%user_id, ?action, "unexpected first request");
            respond(&connection, status::BAD_REQUEST, WRONG_ACTION).await;
            connection.close().await;
        }
    }
}

async fn start_search(
    user_id: UserId,
    connection: Arc<WsConnection>,
    request: Request,
    queue: &QueueService,
) {
    let Some(squad_id) = request.squad_id else {
        respond(&connection, status::BAD_REQUEST, SQUAD_REQUIRED).await;
        connection.close().await;
        return;
    };

    let client = Client::new(user_id, connection.clone(), squad_id, request.wallet());
    match queue.create(client).await {
        // From here on the queue owns the connection
        Ok(()) => respond(&connection, status::OK, ADDED).await,
        Err(err) => {
            error!(%user_id, "could not start search: {}", err);
            let code = match err {
                MatchmakingError::Downstream(ServiceError::NotFound { .. }) => status::NOT_FOUND,
                _ => status::INTERNAL_SERVER_ERROR,
            };
            respond(&connection, code, err.to_string()).await;
            connection.close().await;
        }
    }
}

async fn finish_search(user_id: UserId, connection: Arc<WsConnection>, queue: &QueueService) {
    match queue.finish(user_id).await {
        Ok(client) => {
            client.connection.close().await;
            respond(&connection, status::OK, LEFT).await;
        }
        Err(err) if err.is_not_found() => {
            respond(&connection, status::NOT_FOUND, NOT_IN_SEARCH).await;
        }
        Err(err) => {
            error!(%user_id, "could not finish search: {}", err);
            respond(&connection, status::INTERNAL_SERVER_ERROR, err.to_string()).await;
        }
    }
    connection.close().await;
}

async fn respond(connection: &WsConnection, status: u16, message: impl Into<Value>) {
    if let Err(err) = connection.write_response(status, message.into()).await {
        warn!("could not respond: {}", err);
    }
}
