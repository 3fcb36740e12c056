//! Steerable Proxy Example - Controllable Message Broker
//!
//! Demonstrates a ROUTER/DEALER proxy pair that is steered at runtime via a
//! PAIR control socket.
//!
//! # Architecture
//!
//! ```text
//! Clients (REQ) -> ROUTER (frontend) <-> ROUTER (backend) -> Workers (DEALER)
//!                          ^
//!                    Control Socket (PAIR)
//!                          ^
//!                   Controller (sends commands)
//! ```
//!
//! Run this example and watch the broker pause, resume, and terminate as
//! the controller task drives it.

use bytes::Bytes;
use linkproxy::zmq::{DealerSocket, ProxyBuilder, ProxyConfig, ReqSocket, RouterSocket, TimeOut};
use linkproxy_zmtp::pair::PairSocket;
use std::time::Duration;
use tracing::{error, info};

async fn worker(id: u32) -> std::io::Result<()> {
    info!("[Worker-{}] Starting", id);
    compio::time::sleep(Duration::from_millis(500)).await;

    let mut socket = DealerSocket::connect("127.0.0.1:5556").await?;

    loop {
        if let Some(mut msg) = socket.recv().await {
            if !msg.is_empty() && msg[0].is_empty() {
                msg.remove(0);
            }
            if let Some(request) = msg.last() {
                info!(
                    "[Worker-{}] Processing: {}",
                    id,
                    String::from_utf8_lossy(request)
                );
            }
            compio::time::sleep(Duration::from_millis(100)).await;

            let reply = format!("Processed by worker-{}", id);
            let mut response = vec![Bytes::new()];
            response.extend(msg[..msg.len().saturating_sub(1)].to_vec());
            response.push(Bytes::from(reply));
            socket.send(response).await?;
        }
        compio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn client(id: u32, requests: u32) -> std::io::Result<()> {
    info!("[Client-{}] Starting", id);
    compio::time::sleep(Duration::from_secs(1)).await;

    let mut socket = ReqSocket::connect("127.0.0.1:5555").await?;

    for i in 1..=requests {
        let request = format!("Request {} from client-{}", i, id);
        info!("[Client-{}] Sending: {}", id, request);
        socket.send(vec![Bytes::from(request)]).await?;

        if let Some(reply) = socket.recv().await {
            if let Some(data) = reply.first() {
                info!("[Client-{}] Received: {}", id, String::from_utf8_lossy(data));
            }
        }
        compio::time::sleep(Duration::from_millis(500)).await;
    }

    info!("[Client-{}] Done", id);
    Ok(())
}

/// Broker: a single ROUTER/ROUTER pair wired through a generalized proxy,
/// steered by a PAIR control socket bound on the control port. The backend
/// ROUTER accepts exactly one peer (this crate's ROUTER has no routing
/// table yet), so only one worker connects.
async fn broker() -> std::io::Result<()> {
    info!("Starting steerable broker");

    let (_, frontend) = RouterSocket::bind("127.0.0.1:5555").await?;
    info!("Frontend (clients): 127.0.0.1:5555");

    let (_, backend) = RouterSocket::bind("127.0.0.1:5556").await?;
    info!("Backend (workers): 127.0.0.1:5556");

    let (_, control) = PairSocket::bind("127.0.0.1:5557").await?;
    info!("Control socket: 127.0.0.1:5557");
    info!("Send commands: PAUSE, RESUME, TERMINATE");

    let mut proxy = ProxyBuilder::new()
        .frontends(vec![Some(Box::new(frontend))])
        .backends(vec![Some(Box::new(backend))])
        .control(Box::new(control))
        .config(ProxyConfig::custom(10, TimeOut::Millis(50)))
        .build()
        .map_err(std::io::Error::from)?;

    proxy.run().await.map_err(std::io::Error::from)?;
    info!(
        "Broker stopped; forwarded {} messages",
        proxy.stats().messages_forwarded
    );
    Ok(())
}

async fn controller() -> std::io::Result<()> {
    info!("[Controller] Starting");
    compio::time::sleep(Duration::from_millis(800)).await;

    let mut control = PairSocket::connect("127.0.0.1:5557").await?;

    compio::time::sleep(Duration::from_secs(3)).await;
    info!("[Controller] Sending PAUSE");
    control.send(vec![Bytes::from("PAUSE")]).await?;

    compio::time::sleep(Duration::from_secs(2)).await;
    info!("[Controller] Sending RESUME");
    control.send(vec![Bytes::from("RESUME")]).await?;

    compio::time::sleep(Duration::from_secs(3)).await;
    info!("[Controller] Sending TERMINATE");
    control.send(vec![Bytes::from("TERMINATE")]).await?;

    Ok(())
}

#[compio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    info!("Steerable proxy demo");
    info!("Demonstrates PAUSE/RESUME/TERMINATE over a PAIR control socket");

    compio::runtime::spawn(async {
        if let Err(e) = broker().await {
            error!("Broker: {}", e);
        }
    })
    .detach();

    compio::time::sleep(Duration::from_millis(500)).await;

    compio::runtime::spawn(async {
        let _ = worker(1).await;
    })
    .detach();

    compio::time::sleep(Duration::from_millis(500)).await;

    let _client_task = compio::runtime::spawn(async { client(1, 10).await });
    let controller_task = compio::runtime::spawn(async { controller().await });

    let _ = controller_task.await;
    compio::time::sleep(Duration::from_secs(1)).await;

    info!("Demo complete");
    Ok(())
}
