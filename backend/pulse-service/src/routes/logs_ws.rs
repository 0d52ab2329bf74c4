use actix::prelude::SendError;
use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, Recipient, StreamHandler};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{PulseError, Result};
use crate::services::{FrameSink, SubscriberId, SubscriberRegistry};
use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);
const MAILBOX_CAPACITY: usize = 1024;

/// One serialized log record on its way to a socket
#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct LogFrame(pub String);

/// Frame sink backed by a session actor's mailbox
///
/// Writes never wait on the socket: a full or closed mailbox is reported as a
/// failed write.
pub struct ActorSink {
    recipient: Recipient<LogFrame>,
}

impl ActorSink {
    pub fn new(recipient: Recipient<LogFrame>) -> Self {
        Self { recipient }
    }
}

#[async_trait]
impl FrameSink for ActorSink {
    async fn write_frame(&self, frame: &str) -> Result<()> {
        self.recipient
            .try_send(LogFrame(frame.to_string()))
            .map_err(|e| match e {
                SendError::Full(_) => PulseError::Sink("session mailbox full".to_string()),
                SendError::Closed(_) => PulseError::Sink("session closed".to_string()),
            })
    }
}

/// Read-only log stream for one dashboard connection
pub struct LogStreamSession {
    id: SubscriberId,
    registry: SubscriberRegistry,
    hb: Instant,
}

impl LogStreamSession {
    pub fn new(registry: SubscriberRegistry) -> Self {
        Self {
            id: SubscriberId::new(),
            registry,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(subscriber = %act.id, "Log stream heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for LogStreamSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(subscriber = %self.id, "Log stream session started");

        ctx.set_mailbox_capacity(MAILBOX_CAPACITY);
        self.hb(ctx);

        let sink = ActorSink::new(ctx.address().recipient());
        self.registry.register(self.id, Arc::new(sink));
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(subscriber = %self.id, "Log stream session stopped");
        self.registry.unregister(self.id);
    }
}

impl Handler<LogFrame> for LogStreamSession {
    type Result = ();

    fn handle(&mut self, msg: LogFrame, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<std::result::Result<ws::Message, ws::ProtocolError>> for LogStreamSession {
    fn handle(
        &mut self,
        msg: std::result::Result<ws::Message, ws::ProtocolError>,
        ctx: &mut Self::Context,
    ) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(_)) | Ok(ws::Message::Binary(_)) => {
                // Stream is one-way
                tracing::debug!(subscriber = %self.id, "Ignoring inbound message on log stream");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("Log stream close received: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                tracing::warn!(subscriber = %self.id, "Log stream protocol error: {}", e);
                ctx.stop();
            }
            _ => {}
        }
    }
}

#[get("/ws/logs")]
pub async fn logs_ws(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> std::result::Result<HttpResponse, Error> {
    let session = LogStreamSession::new(state.registry.clone());
    ws::start(session, &req, stream)
}
