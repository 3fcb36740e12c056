//! Adapts every concrete socket type in this crate to the proxy's minimal
//! capability surface: send a multipart message, receive a multipart
//! message, describe yourself for logging.

use std::io;

use bytes::Bytes;

use crate::dealer::DealerSocket;
use crate::pair::PairSocket;
use crate::publisher::PubSocket;
use crate::pull::PullSocket;
use crate::push::PushSocket;
use crate::rep::RepSocket;
use crate::req::ReqSocket;
use crate::router::RouterSocket;
use crate::subscriber::SubSocket;
use crate::xpub::XPubSocket;
use crate::xsub::XSubSocket;

/// Socket types that can participate in a proxy topology.
///
/// This is deliberately narrower than [`crate::Socket`]: a proxy only ever
/// needs to move a whole multipart message in either direction, never the
/// socket's own type or `has_more` bookkeeping.
///
/// `?Send` like every other async trait in this crate — the proxy core is
/// single-threaded by design.
#[async_trait::async_trait(?Send)]
pub trait ProxySocket {
    /// Receive one multipart message. `Ok(None)` means no message is
    /// currently available or the peer closed the connection.
    async fn recv_multipart(&mut self) -> io::Result<Option<Vec<Bytes>>>;

    /// Send one multipart message.
    async fn send_multipart(&mut self, msg: Vec<Bytes>) -> io::Result<()>;

    /// Short description for logging, e.g. `"ROUTER"`.
    fn socket_desc(&self) -> &'static str;
}

fn channel_closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "channel disconnected")
}

#[async_trait::async_trait(?Send)]
impl ProxySocket for DealerSocket {
    async fn recv_multipart(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        match self.recv().await {
            Ok(msg) => Ok(Some(msg)),
            Err(_) => Ok(None),
        }
    }

    async fn send_multipart(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.send(msg).await.map_err(|_| channel_closed())
    }

    fn socket_desc(&self) -> &'static str {
        "DEALER"
    }
}

#[async_trait::async_trait(?Send)]
impl ProxySocket for RouterSocket {
    async fn recv_multipart(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        self.recv().await
    }

    async fn send_multipart(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.send(msg).await
    }

    fn socket_desc(&self) -> &'static str {
        "ROUTER"
    }
}

#[async_trait::async_trait(?Send)]
impl ProxySocket for ReqSocket {
    async fn recv_multipart(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        self.recv().await.map_err(|_| channel_closed())
    }

    async fn send_multipart(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.send(msg).await.map_err(|_| channel_closed())
    }

    fn socket_desc(&self) -> &'static str {
        "REQ"
    }
}

#[async_trait::async_trait(?Send)]
impl ProxySocket for RepSocket {
    async fn recv_multipart(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        self.recv().await.map_err(|_| channel_closed())
    }

    async fn send_multipart(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.send(msg).await.map_err(|_| channel_closed())
    }

    fn socket_desc(&self) -> &'static str {
        "REP"
    }
}

#[async_trait::async_trait(?Send)]
impl ProxySocket for PairSocket {
    async fn recv_multipart(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        self.recv().await
    }

    async fn send_multipart(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.send(msg).await
    }

    fn socket_desc(&self) -> &'static str {
        "PAIR"
    }
}

#[async_trait::async_trait(?Send)]
impl ProxySocket for PubSocket {
    async fn recv_multipart(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        // PUB never receives.
        Ok(None)
    }

    async fn send_multipart(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.send(msg).await
    }

    fn socket_desc(&self) -> &'static str {
        "PUB"
    }
}

#[async_trait::async_trait(?Send)]
impl ProxySocket for SubSocket {
    async fn recv_multipart(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        self.recv().await
    }

    async fn send_multipart(&mut self, _msg: Vec<Bytes>) -> io::Result<()> {
        // SUB sends subscriptions, not data; nothing to forward here.
        Ok(())
    }

    fn socket_desc(&self) -> &'static str {
        "SUB"
    }
}

#[async_trait::async_trait(?Send)]
impl ProxySocket for PushSocket {
    async fn recv_multipart(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        // PUSH never receives.
        Ok(None)
    }

    async fn send_multipart(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.send(msg).await
    }

    fn socket_desc(&self) -> &'static str {
        "PUSH"
    }
}

#[async_trait::async_trait(?Send)]
impl ProxySocket for PullSocket {
    async fn recv_multipart(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        self.recv().await
    }

    async fn send_multipart(&mut self, _msg: Vec<Bytes>) -> io::Result<()> {
        // PULL never sends.
        Ok(())
    }

    fn socket_desc(&self) -> &'static str {
        "PULL"
    }
}

#[async_trait::async_trait(?Send)]
impl ProxySocket for XSubSocket {
    async fn recv_multipart(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        self.recv().await
    }

    async fn send_multipart(&mut self, _msg: Vec<Bytes>) -> io::Result<()> {
        // XSUB's send path carries subscription frames, not proxied data.
        Ok(())
    }

    fn socket_desc(&self) -> &'static str {
        "XSUB"
    }
}

#[async_trait::async_trait(?Send)]
impl ProxySocket for XPubSocket {
    async fn recv_multipart(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        // XPUB's "receive" side is subscription events, surfaced to the
        // forwarder as a two-frame message: a one-byte subscribe/unsubscribe
        // flag followed by the topic.
        if let Some(event) = self.recv_subscription().await? {
            let msg = match event {
                linkproxy_core::subscription::SubscriptionEvent::Subscribe(topic) => {
                    vec![Bytes::from_static(&[1u8]), topic]
                }
                linkproxy_core::subscription::SubscriptionEvent::Unsubscribe(topic) => {
                    vec![Bytes::from_static(&[0u8]), topic]
                }
            };
            Ok(Some(msg))
        } else {
            Ok(None)
        }
    }

    async fn send_multipart(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.send(msg).await
    }

    fn socket_desc(&self) -> &'static str {
        "XPUB"
    }
}
