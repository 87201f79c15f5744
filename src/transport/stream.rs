//! Framed MsgPack transport over a Unix socket.
//!
//! One background task owns the connection for as long as the session
//! holds the binding:
//!
//! 1. Connect to the service socket
//! 2. Spawn the writer task and hand a [`StreamService`] to the session
//! 3. Read frames: replies complete pending calls, events go to the sink
//! 4. On EOF or error, fail pending calls and report the release
//! 5. Retry with a doubling delay until the binding is released
//!
//! # Example
//!
//! ```ignore
//! use extphone_client::transport::StreamTransport;
//! use extphone_client::Session;
//!
//! let transport = StreamTransport::builder()
//!     .socket_path("/run/extphone/service.sock")
//!     .call_timeout(std::time::Duration::from_secs(2))
//!     .build();
//! let session = Session::builder().build(transport);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::UnixStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::socket::connect_socket;
use super::{BoxFuture, DirectCall, DirectReply, Registration, RemoteService, Request, Transport};
use crate::codec::MsgPackCodec;
use crate::config::StreamTransportConfig;
use crate::connection::{EventSink, SessionLink};
use crate::error::{ExtPhoneError, Result};
use crate::protocol::{
    checked_payload_length, kind, Frame, FrameBuffer, Header, WireCall, WireReply,
};
use crate::types::{Client, InboundEvent, Token};
use crate::writer::{spawn_writer_task, OutboundFrame, WriterHandle};

const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Builder for [`StreamTransport`].
#[derive(Debug, Clone, Default)]
pub struct StreamTransportBuilder {
    config: StreamTransportConfig,
}

impl StreamTransportBuilder {
    /// Start from defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded config.
    pub fn from_config(config: StreamTransportConfig) -> Self {
        Self { config }
    }

    /// Socket the service listens on.
    pub fn socket_path(mut self, path: impl Into<String>) -> Self {
        self.config.socket_path = path.into();
        self
    }

    /// How long a call may wait for its reply.
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Largest inbound payload accepted before the connection is dropped.
    pub fn max_payload_size(mut self, size: u32) -> Self {
        self.config.max_payload_size = size;
        self
    }

    /// Outbound frames in flight before senders wait.
    pub fn max_pending_frames(mut self, max: usize) -> Self {
        self.config.max_pending_frames = max;
        self
    }

    /// How long a sender waits for a pending slot.
    pub fn backpressure_timeout(mut self, timeout: Duration) -> Self {
        self.config.backpressure_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Reconnect delay bounds; the delay doubles from `initial` up to `max`.
    pub fn reconnect_delay(mut self, initial: Duration, max: Duration) -> Self {
        self.config.reconnect_initial_ms = initial.as_millis() as u64;
        self.config.reconnect_max_ms = max.as_millis() as u64;
        self
    }

    pub fn build(self) -> StreamTransport {
        StreamTransport::new(self.config)
    }
}

/// [`Transport`] that keeps a socket connection to the service alive while
/// the binding is held.
pub struct StreamTransport {
    config: StreamTransportConfig,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamTransport {
    pub fn new(config: StreamTransportConfig) -> Self {
        Self {
            config,
            task: Mutex::new(None),
        }
    }

    pub fn builder() -> StreamTransportBuilder {
        StreamTransportBuilder::new()
    }

    pub fn config(&self) -> &StreamTransportConfig {
        &self.config
    }
}

impl Transport for StreamTransport {
    fn acquire(&self, link: SessionLink) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            tracing::warn!("no tokio runtime, cannot start the service connection");
            ExtPhoneError::NotConnected
        })?;

        // Held across the spawn so a release racing the new task waits for the handle.
        let mut slot = self.task.lock();
        let task = runtime.spawn(connection_loop(self.config.clone(), link));
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
        Ok(())
    }

    fn release(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            tracing::debug!(path = %self.config.socket_path, "service connection released");
        }
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

async fn connection_loop(config: StreamTransportConfig, link: SessionLink) {
    let (initial_delay, max_delay) = config.reconnect_delays();
    let mut delay = initial_delay;

    loop {
        tracing::debug!(
            path = %config.socket_path,
            binding = link.binding(),
            "connecting to service"
        );

        match connect_socket(&config.socket_path).await {
            Ok(stream) => {
                delay = initial_delay;
                serve_connection(stream, &config, &link).await;
            }
            Err(e) => {
                tracing::warn!(
                    path = %config.socket_path,
                    error = %e,
                    "service socket unavailable"
                );
            }
        }

        link.on_released();

        tracing::debug!(retry_in = ?delay, "reconnecting to service");
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(max_delay);
    }
}

/// Run one connection until the service goes away.
async fn serve_connection(stream: UnixStream, config: &StreamTransportConfig, link: &SessionLink) {
    let (reader, writer) = stream.into_split();
    let (writer, writer_task) = spawn_writer_task(writer, config.writer_config());
    let service = Arc::new(StreamService::new(
        writer,
        config.call_timeout(),
        config.max_payload_size,
    ));
    let _teardown = Teardown {
        service: service.clone(),
        writer_task,
    };

    tracing::info!(path = %config.socket_path, "connected to service");
    let sink = link.on_acquired(service.clone());

    match read_loop(reader, &service, &sink, config.max_payload_size).await {
        Ok(()) => tracing::info!("service closed the connection"),
        Err(e) => tracing::warn!(error = %e, "service connection failed"),
    }
}

/// Fails outstanding calls and stops the writer, also when the connection
/// task is aborted mid-read.
struct Teardown {
    service: Arc<StreamService>,
    writer_task: JoinHandle<Result<()>>,
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.service.close();
        self.writer_task.abort();
    }
}

async fn read_loop<R: AsyncRead + Unpin>(
    mut reader: R,
    service: &StreamService,
    sink: &EventSink,
    max_payload_size: u32,
) -> Result<()> {
    let mut frames = FrameBuffer::with_max_payload(max_payload_size);
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }

        for frame in frames.push(&buf[..n])? {
            match frame.kind() {
                kind::REPLY => service.complete(frame),
                kind::EVENT => match MsgPackCodec::decode::<InboundEvent>(frame.payload()) {
                    Ok(event) => sink.deliver(event),
                    Err(e) => tracing::warn!(error = %e, "dropping undecodable event"),
                },
                other => tracing::warn!(kind = other, "unexpected frame from service"),
            }
        }
    }
}

/// [`RemoteService`] speaking to the service over one socket connection.
///
/// Calls are correlated with replies by call id. A call fails with
/// [`ExtPhoneError::TransportFailure`] when the connection drops, the
/// reply times out or the service answers with an error.
pub struct StreamService {
    writer: WriterHandle,
    pending: Mutex<HashMap<u32, oneshot::Sender<Frame>>>,
    next_call_id: AtomicU32,
    call_timeout: Duration,
    max_payload_size: u32,
    closed: AtomicBool,
}

impl StreamService {
    fn new(writer: WriterHandle, call_timeout: Duration, max_payload_size: u32) -> Self {
        Self {
            writer,
            pending: Mutex::new(HashMap::new()),
            next_call_id: AtomicU32::new(1),
            call_timeout,
            max_payload_size,
            closed: AtomicBool::new(false),
        }
    }

    /// Calls still waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.pending.lock().len()
    }

    fn allocate_call_id(&self) -> u32 {
        loop {
            let id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }

    async fn roundtrip(&self, call: WireCall) -> Result<WireReply> {
        self.send_call(call).await.map_err(ExtPhoneError::into_transport_failure)
    }

    async fn send_call(&self, call: WireCall) -> Result<WireReply> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ExtPhoneError::ConnectionClosed);
        }

        let payload = MsgPackCodec::encode(&call)?;
        let length = checked_payload_length(payload.len(), self.max_payload_size)?;
        let call_id = self.allocate_call_id();
        let frame = OutboundFrame::new(&Header::call(call_id, length), Bytes::from(payload))?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(call_id, tx);
        if let Err(e) = self.writer.send(frame).await {
            self.pending.lock().remove(&call_id);
            return Err(e);
        }

        let frame = match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(frame)) => frame,
            Ok(Err(_)) => return Err(ExtPhoneError::ConnectionClosed),
            Err(_) => {
                self.pending.lock().remove(&call_id);
                return Err(ExtPhoneError::TransportFailure(format!(
                    "no reply to call {} within {:?}",
                    call_id, self.call_timeout
                )));
            }
        };

        if frame.is_error() {
            let message: String = MsgPackCodec::decode(frame.payload())
                .unwrap_or_else(|_| "unreadable error reply".to_string());
            return Err(ExtPhoneError::TransportFailure(message));
        }
        MsgPackCodec::decode(frame.payload())
    }

    fn complete(&self, frame: Frame) {
        let waiter = self.pending.lock().remove(&frame.call_id());
        match waiter {
            Some(tx) => {
                let _ = tx.send(frame);
            }
            None => tracing::debug!(call_id = frame.call_id(), "reply for unknown call"),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let failed = std::mem::take(&mut *self.pending.lock());
        if !failed.is_empty() {
            tracing::debug!(count = failed.len(), "failing calls on closed connection");
        }
    }
}

fn unexpected(call: &str, reply: WireReply) -> ExtPhoneError {
    ExtPhoneError::TransportFailure(format!("unexpected reply to {}: {:?}", call, reply))
}

impl RemoteService for StreamService {
    fn register(&self, registration: Registration) -> BoxFuture<'_, Result<Client>> {
        Box::pin(async move {
            match self.roundtrip(WireCall::Register(registration)).await? {
                WireReply::Registered(client) => Ok(client),
                other => Err(unexpected("register", other)),
            }
        })
    }

    fn unregister(&self, client: Client) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            match self.roundtrip(WireCall::Unregister(client)).await? {
                WireReply::Unregistered => Ok(()),
                other => Err(unexpected("unregister", other)),
            }
        })
    }

    fn request(&self, client: Client, request: Request) -> BoxFuture<'_, Result<Token>> {
        Box::pin(async move {
            match self.roundtrip(WireCall::Request { client, request }).await? {
                WireReply::Accepted(token) => Ok(token),
                other => Err(unexpected("request", other)),
            }
        })
    }

    fn call(&self, call: DirectCall) -> BoxFuture<'_, Result<DirectReply>> {
        Box::pin(async move {
            match self.roundtrip(WireCall::Direct(call)).await? {
                WireReply::Direct(reply) => Ok(reply),
                other => Err(unexpected("call", other)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{build_frame, flags, DEFAULT_MAX_PAYLOAD_SIZE};
    use crate::transport::RegistrationKind;
    use tokio::io::AsyncWriteExt;

    type Pair = (Arc<StreamService>, tokio::io::DuplexStream, JoinHandle<Result<()>>);

    fn service_pair(timeout: Duration) -> Pair {
        limited_service_pair(timeout, DEFAULT_MAX_PAYLOAD_SIZE)
    }

    fn limited_service_pair(timeout: Duration, max_payload_size: u32) -> Pair {
        let (ours, theirs) = tokio::io::duplex(64 * 1024);
        let (writer, task) = spawn_writer_task(ours, Default::default());
        let service = StreamService::new(writer, timeout, max_payload_size);
        (Arc::new(service), theirs, task)
    }

    async fn read_call(peer: &mut tokio::io::DuplexStream) -> (u32, WireCall) {
        let mut frames = FrameBuffer::new();
        let mut buf = vec![0u8; 4096];
        loop {
            let n = peer.read(&mut buf).await.unwrap();
            assert!(n > 0, "peer closed");
            if let Some(frame) = frames.push(&buf[..n]).unwrap().into_iter().next() {
                assert_eq!(frame.kind(), kind::CALL);
                return (frame.call_id(), MsgPackCodec::decode(frame.payload()).unwrap());
            }
        }
    }

    fn reply(call_id: u32, flags: u8, payload: &[u8]) -> Frame {
        let header = Header::new(kind::REPLY, flags, call_id, payload.len() as u32);
        Frame::new(header, Bytes::copy_from_slice(payload))
    }

    #[tokio::test]
    async fn test_reply_completes_call() {
        let (service, mut peer, _task) = service_pair(Duration::from_secs(5));

        let caller = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .register(Registration {
                        package: "com.example".into(),
                        kind: RegistrationKind::All,
                    })
                    .await
            })
        };

        let (call_id, call) = read_call(&mut peer).await;
        assert!(matches!(call, WireCall::Register(_)));

        let payload = MsgPackCodec::encode(&WireReply::Registered(Client::from_raw(9))).unwrap();
        service.complete(reply(call_id, flags::REPLY, &payload));

        assert_eq!(caller.await.unwrap().unwrap(), Client::from_raw(9));
        assert_eq!(service.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_error_reply_is_transport_failure() {
        let (service, mut peer, _task) = service_pair(Duration::from_secs(5));

        let caller = {
            let service = service.clone();
            tokio::spawn(async move { service.unregister(Client::from_raw(1)).await })
        };

        let (call_id, _) = read_call(&mut peer).await;
        let payload = MsgPackCodec::encode(&"no such client").unwrap();
        service.complete(reply(call_id, flags::ERROR_REPLY, &payload));

        let err = caller.await.unwrap().unwrap_err();
        assert!(matches!(err, ExtPhoneError::TransportFailure(ref m) if m == "no such client"));
    }

    #[tokio::test]
    async fn test_close_fails_pending_calls() {
        let (service, mut peer, _task) = service_pair(Duration::from_secs(5));

        let caller = {
            let service = service.clone();
            tokio::spawn(async move { service.call(DirectCall::IsSmsPromptEnabled).await })
        };

        read_call(&mut peer).await;
        service.close();

        let err = caller.await.unwrap().unwrap_err();
        assert!(matches!(err, ExtPhoneError::TransportFailure(_)));

        let err = service.call(DirectCall::IsSmsPromptEnabled).await.unwrap_err();
        assert!(matches!(err, ExtPhoneError::TransportFailure(_)));
    }

    #[tokio::test]
    async fn test_call_timeout() {
        let (service, _peer, _task) = service_pair(Duration::from_millis(20));

        let err = service.call(DirectCall::IsSmsPromptEnabled).await.unwrap_err();
        assert!(matches!(err, ExtPhoneError::TransportFailure(_)));
        assert_eq!(service.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_mismatched_reply_kind() {
        let (service, mut peer, _task) = service_pair(Duration::from_secs(5));

        let caller = {
            let service = service.clone();
            tokio::spawn(async move { service.unregister(Client::from_raw(3)).await })
        };

        let (call_id, _) = read_call(&mut peer).await;
        let payload = MsgPackCodec::encode(&WireReply::Accepted(Token::from_raw(1))).unwrap();
        service.complete(reply(call_id, flags::REPLY, &payload));

        assert!(matches!(
            caller.await.unwrap(),
            Err(ExtPhoneError::TransportFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_call_rejected_before_framing() {
        let (service, mut peer, _task) = limited_service_pair(Duration::from_secs(5), 16);
        let registration = || Registration {
            package: "com.example.".repeat(8),
            kind: RegistrationKind::All,
        };

        let err = service
            .send_call(WireCall::Register(registration()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtPhoneError::Protocol(ref m) if m.contains("exceeds maximum 16")));
        assert_eq!(service.pending_calls(), 0);

        let mut buf = [0u8; 1];
        let nothing_sent = tokio::time::timeout(Duration::from_millis(50), peer.read(&mut buf));
        assert!(nothing_sent.await.is_err());

        let err = service.register(registration()).await.unwrap_err();
        assert!(matches!(err, ExtPhoneError::TransportFailure(_)));
    }

    #[tokio::test]
    async fn test_read_loop_ends_on_eof_and_rejects_bad_frames() {
        let (service, _peer, _task) = service_pair(Duration::from_secs(1));
        let sink = EventSink::inert();

        let (reader, remote) = tokio::io::duplex(1024);
        drop(remote);
        assert!(read_loop(reader, &service, &sink, 1024).await.is_ok());

        let (reader, mut remote) = tokio::io::duplex(1024);
        let bogus = build_frame(&Header::new(99, 0, 0, 0), &[]).unwrap();
        remote.write_all(&bogus).await.unwrap();
        assert!(read_loop(reader, &service, &sink, 1024).await.is_err());
    }
}
