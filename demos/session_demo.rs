//! Session demo - a full connect → register → request → response round.
//!
//! This example demonstrates:
//! - Hosting a toy service on a Unix socket with the crate's own protocol types
//! - Connecting a [`Session`] through [`StreamTransport`]
//! - Registering a callback and correlating a request with its response
//!
//! # Running
//!
//! ```text
//! RUST_LOG=extphone_client=debug cargo run --example session_demo
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

use extphone_client::codec::MsgPackCodec;
use extphone_client::protocol::{
    build_frame, flags, kind, FrameBuffer, Header, WireCall, WireReply,
};
use extphone_client::transport::{
    generate_socket_path, DirectCall, DirectReply, Request, SocketListener, StreamTransport,
};
use extphone_client::types::data::{NrIcon, NrIconType};
use extphone_client::{
    Client, ConnectionListener, EventMeta, EventPayload, ExtPhoneCallback, InboundEvent, Session,
    Status, Token,
};

/// Prints what the service reports.
struct IconWatcher;

impl ExtPhoneCallback for IconWatcher {
    fn on_nr_icon_response(&self, meta: &EventMeta, icon: NrIcon) {
        println!("icon response for slot {:?}: {:?}", meta.slot, icon);
    }

    fn on_five_g_status(&self, meta: &EventMeta, enabled: bool) {
        println!("5G on slot {:?} is now {}", meta.slot, if enabled { "on" } else { "off" });
    }
}

/// Wakes `main` once the session is connected.
struct Ready(Arc<Notify>);

impl ConnectionListener for Ready {
    fn on_connected(&self) {
        self.0.notify_one();
    }

    fn on_disconnected(&self) {
        println!("service went away");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = generate_socket_path();
    let listener = SocketListener::bind(&path).await?;
    tokio::spawn(async move {
        match listener.accept().await {
            Ok(stream) => {
                if let Err(e) = toy_service(stream).await {
                    eprintln!("toy service failed: {}", e);
                }
            }
            Err(e) => eprintln!("accept failed: {}", e),
        }
    });

    let transport = StreamTransport::builder()
        .socket_path(&path)
        .call_timeout(Duration::from_secs(2))
        .build();
    let session = Session::builder()
        .package_name("com.example.demo")
        .build(transport);

    let ready = Arc::new(Notify::new());
    let listener: Arc<dyn ConnectionListener> = Arc::new(Ready(ready.clone()));
    if !session.subscribe(listener.clone()) {
        return Err("could not start the service connection".into());
    }
    ready.notified().await;

    let Some(client) = session.register_default(Arc::new(IconWatcher)).await? else {
        return Err("service refused the registration".into());
    };
    println!("registered as {}", client);

    println!("SMS prompt enabled: {}", session.requests().is_sms_prompt_enabled().await);

    if let Some(token) = session.requests().query_nr_icon(0, client).await? {
        let response = session.response(token).await?;
        println!("{} answered with status {:?}", token, response.status);
    }

    // Give the broadcast a moment to reach the callback.
    tokio::time::sleep(Duration::from_millis(100)).await;

    session.unregister(client).await;
    session.unsubscribe(&listener);
    Ok(())
}

/// Answers every call. The SMS prompt read is followed by a 5G broadcast and
/// icon queries by their response event.
async fn toy_service(mut stream: UnixStream) -> extphone_client::Result<()> {
    let mut frames = FrameBuffer::new();
    let mut buf = vec![0u8; 4096];
    let mut next_client = 0u64;
    let mut next_token = 0u32;

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }

        for frame in frames.push(&buf[..n])? {
            let call: WireCall = MsgPackCodec::decode(frame.payload())?;
            let mut follow_up = Vec::new();

            let reply = match call {
                WireCall::Register(_) => {
                    next_client += 1;
                    WireReply::Registered(Client::from_raw(next_client))
                }
                WireCall::Unregister(_) => WireReply::Unregistered,
                WireCall::Request { client, request } => {
                    next_token += 1;
                    let token = Token::from_raw(next_token);
                    if let Request::QueryNrIcon { slot } = request {
                        let icon = NrIcon {
                            icon_type: NrIconType::Uwb,
                            rx_count: 4,
                        };
                        follow_up.push(InboundEvent::response(
                            client,
                            Some(token),
                            Some(slot),
                            Status::Success,
                            EventPayload::NrIconResponse(icon),
                        ));
                    }
                    WireReply::Accepted(token)
                }
                WireCall::Direct(DirectCall::IsSmsPromptEnabled) => {
                    follow_up.push(InboundEvent::broadcast(
                        Some(0),
                        EventPayload::FiveGStatus(true),
                    ));
                    WireReply::Direct(DirectReply::Bool(true))
                }
                WireCall::Direct(_) => WireReply::Direct(DirectReply::Unit),
            };

            let payload = MsgPackCodec::encode(&reply)?;
            let header = Header::new(
                kind::REPLY,
                flags::REPLY,
                frame.call_id(),
                payload.len() as u32,
            );
            stream.write_all(&build_frame(&header, &payload)?).await?;

            for event in follow_up {
                let payload = MsgPackCodec::encode(&event)?;
                let header = Header::new(kind::EVENT, flags::EVENT, 0, payload.len() as u32);
                stream.write_all(&build_frame(&header, &payload)?).await?;
            }
        }
    }
}
