//! Integration tests for the generalized, steerable message proxy.
//!
//! Uses in-memory `ProxySocket` doubles rather than live TCP peers — the
//! proxy core only ever talks to the `ProxySocket` trait, so these tests
//! exercise the same forwarding/control/hook logic a real ROUTER/DEALER
//! pair would drive, without the flakiness of real sockets.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use bytes::Bytes;
use linkproxy_zmtp::proxy::{
    Direction, HookContext, PairHookSet, PollOutcome, ProxyBuilder, ProxyConfig, ProxyError,
    ProxyHook, ProxyResult, ProxySocket, RunState, TimeOut,
};

struct MockSocket {
    name: &'static str,
    recv_queue: VecDeque<Vec<Bytes>>,
    sent: Rc<RefCell<Vec<Vec<Bytes>>>>,
}

impl MockSocket {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            recv_queue: VecDeque::new(),
            sent: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn with_outbox(name: &'static str, sent: Rc<RefCell<Vec<Vec<Bytes>>>>) -> Self {
        Self {
            name,
            recv_queue: VecDeque::new(),
            sent,
        }
    }

    fn enqueue(&mut self, msg: Vec<Bytes>) {
        self.recv_queue.push_back(msg);
    }
}

#[async_trait::async_trait(?Send)]
impl ProxySocket for MockSocket {
    async fn recv_multipart(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        Ok(self.recv_queue.pop_front())
    }

    async fn send_multipart(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.sent.borrow_mut().push(msg);
        Ok(())
    }

    fn socket_desc(&self) -> &'static str {
        self.name
    }
}

fn frame(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

/// S1 — loopback pair: a router-shaped frontend forwards an
/// identity-prefixed client message to a dealer-shaped backend.
#[compio::test]
async fn loopback_pair_forwards_identity_prefixed_message() {
    let mut frontend = MockSocket::new("ROUTER");
    frontend.enqueue(vec![frame("client-1"), frame("ping")]);
    let backend_sent = Rc::new(RefCell::new(Vec::new()));
    let backend = MockSocket::with_outbox("DEALER", backend_sent.clone());

    let mut proxy = ProxyBuilder::new()
        .frontends(vec![Some(Box::new(frontend))])
        .backends(vec![Some(Box::new(backend))])
        .build()
        .unwrap();

    assert_eq!(proxy.poll_once().await.unwrap(), PollOutcome::Handled);

    let sent = backend_sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0], vec![frame("client-1"), frame("ping")]);
}

/// S2 — PAUSE suspends forwarding; RESUME lets the already-queued message
/// through on the next iteration.
#[compio::test]
async fn pause_suppresses_forwarding_until_resume() {
    let mut control = MockSocket::new("CONTROL");
    control.enqueue(vec![frame("PAUSE")]);
    control.enqueue(vec![frame("RESUME")]);

    let mut frontend = MockSocket::new("F");
    frontend.enqueue(vec![frame("hello")]);
    let backend_sent = Rc::new(RefCell::new(Vec::new()));
    let backend = MockSocket::with_outbox("B", backend_sent.clone());

    let mut proxy = ProxyBuilder::new()
        .frontends(vec![Some(Box::new(frontend))])
        .backends(vec![Some(Box::new(backend))])
        .control(Box::new(control))
        .config(ProxyConfig::custom(10, TimeOut::Millis(20)))
        .build()
        .unwrap();

    // PAUSE applied: outcome is Handled (control consumed), state Paused.
    assert_eq!(proxy.poll_once().await.unwrap(), PollOutcome::Handled);
    assert_eq!(proxy.state(), RunState::Paused);

    // Bounded poll with nothing eligible (data sockets excluded while
    // paused, control queue empty): idle, nothing forwarded.
    assert_eq!(proxy.poll_once().await.unwrap(), PollOutcome::Idle);
    assert!(backend_sent.borrow().is_empty());

    // RESUME applied.
    assert_eq!(proxy.poll_once().await.unwrap(), PollOutcome::Handled);
    assert_eq!(proxy.state(), RunState::Active);

    // Now the queued frontend message forwards.
    assert_eq!(proxy.poll_once().await.unwrap(), PollOutcome::Handled);
    assert_eq!(backend_sent.borrow().len(), 1);
}

/// S3 — TERMINATE stops the proxy; `poll_legacy` collapses to `0`.
#[compio::test]
async fn terminate_stops_the_proxy() {
    let mut control = MockSocket::new("CONTROL");
    control.enqueue(vec![frame("TERMINATE")]);

    let mut proxy = ProxyBuilder::new()
        .open_endpoints(vec![Box::new(MockSocket::new("OEP"))])
        .control(Box::new(control))
        .config(ProxyConfig::custom(10, TimeOut::Block))
        .build()
        .unwrap();

    assert_eq!(proxy.poll_legacy().await.unwrap(), 0);
    assert_eq!(proxy.state(), RunState::Terminated);
}

/// S4 — capture sees a byte-identical copy of a forwarded multipart
/// message.
#[compio::test]
async fn capture_sink_receives_byte_identical_copy() {
    let mut frontend = MockSocket::new("F");
    frontend.enqueue(vec![frame("a"), frame("b"), frame("c")]);
    let backend_sent = Rc::new(RefCell::new(Vec::new()));
    let backend = MockSocket::with_outbox("B", backend_sent.clone());
    let capture_sent = Rc::new(RefCell::new(Vec::new()));
    let capture = MockSocket::with_outbox("CAPTURE", capture_sent.clone());

    let mut proxy = ProxyBuilder::new()
        .frontends(vec![Some(Box::new(frontend))])
        .backends(vec![Some(Box::new(backend))])
        .capture(Box::new(capture))
        .build()
        .unwrap();

    proxy.poll_once().await.unwrap();

    let expected = vec![frame("a"), frame("b"), frame("c")];
    assert_eq!(capture_sent.borrow()[0], expected);
    assert_eq!(backend_sent.borrow()[0], expected);
}

/// S5 — open endpoints report their own 0-based position among the full
/// build-order poll table, independent of pair membership.
#[compio::test]
async fn open_endpoint_ready_reports_build_order_index() {
    // frontends = [client, router, int2, NULL, NULL]
    // backends  = [NULL,   int1,   backend, worker, NULL]
    let mut client = MockSocket::new("client");
    client.enqueue(vec![frame("q")]);
    let mut worker = MockSocket::new("worker");
    worker.enqueue(vec![frame("r")]);

    let mut proxy = ProxyBuilder::new()
        .frontends(vec![
            Some(Box::new(client) as Box<dyn ProxySocket>),
            Some(Box::new(MockSocket::new("router"))),
            Some(Box::new(MockSocket::new("int2"))),
            None,
            None,
        ])
        .backends(vec![
            None,
            Some(Box::new(MockSocket::new("int1")) as Box<dyn ProxySocket>),
            Some(Box::new(MockSocket::new("backend"))),
            Some(Box::new(worker)),
            None,
        ])
        .build()
        .unwrap();

    // Build order: client(0, open), router(1)/int1(2) pair, int2(3, open),
    // backend(4)/worker(5) pair. `client` alone at index 0.
    assert_eq!(proxy.poll_once().await.unwrap(), PollOutcome::Ready(0));
    let msg = proxy.take_ready_message(0).unwrap();
    assert_eq!(msg, vec![frame("q")]);

    // Drain remaining idle poll (router/int1 pair and int2 have nothing
    // queued) until worker's message surfaces.
    loop {
        match proxy.poll_once().await.unwrap() {
            PollOutcome::Ready(i) => {
                assert_eq!(i, 5, "worker sits at build-order index 5");
                let msg = proxy.take_ready_message(i).unwrap();
                assert_eq!(msg, vec![frame("r")]);
                break;
            }
            PollOutcome::Idle | PollOutcome::Handled => continue,
            PollOutcome::Terminated => panic!("unexpected terminate"),
        }
    }
}

/// S6 — a front-to-back hook mutates the final frame in place; the marker
/// history for a single-frame message is `[0]`.
#[compio::test]
async fn hook_mutates_frame_and_records_terminal_marker() {
    struct UppercaseHook {
        markers: Rc<RefCell<Vec<usize>>>,
    }

    #[async_trait::async_trait(?Send)]
    impl ProxyHook for UppercaseHook {
        async fn on_frame(
            &mut self,
            _ctx: HookContext,
            frame: &mut Bytes,
            marker: usize,
        ) -> ProxyResult<()> {
            self.markers.borrow_mut().push(marker);
            let upper = String::from_utf8_lossy(frame).to_uppercase();
            *frame = Bytes::from(upper.into_bytes());
            Ok(())
        }
    }

    let markers = Rc::new(RefCell::new(Vec::new()));
    let mut frontend = MockSocket::new("F");
    frontend.enqueue(vec![frame("hello")]);
    let backend_sent = Rc::new(RefCell::new(Vec::new()));
    let backend = MockSocket::with_outbox("B", backend_sent.clone());

    let mut proxy = ProxyBuilder::new()
        .frontends(vec![Some(Box::new(frontend))])
        .backends(vec![Some(Box::new(backend))])
        .hooks(vec![Some(PairHookSet {
            front2back: Some(Box::new(UppercaseHook {
                markers: markers.clone(),
            })),
            back2front: None,
        })])
        .build()
        .unwrap();

    proxy.poll_once().await.unwrap();

    assert_eq!(*markers.borrow(), vec![0]);
    assert_eq!(backend_sent.borrow()[0], vec![frame("HELLO")]);
}

/// A hook that rejects a frame aborts the forward and surfaces as a
/// `HookReject` error rather than silently dropping the message.
#[compio::test]
async fn hook_rejection_aborts_the_forward() {
    struct RejectingHook;

    #[async_trait::async_trait(?Send)]
    impl ProxyHook for RejectingHook {
        async fn on_frame(
            &mut self,
            _ctx: HookContext,
            _frame: &mut Bytes,
            _marker: usize,
        ) -> ProxyResult<()> {
            Err(ProxyError::HookReject(1))
        }
    }

    let mut frontend = MockSocket::new("F");
    frontend.enqueue(vec![frame("x")]);
    let backend_sent = Rc::new(RefCell::new(Vec::new()));
    let backend = MockSocket::with_outbox("B", backend_sent.clone());

    let mut proxy = ProxyBuilder::new()
        .frontends(vec![Some(Box::new(frontend))])
        .backends(vec![Some(Box::new(backend))])
        .hooks(vec![Some(PairHookSet {
            front2back: Some(Box::new(RejectingHook)),
            back2front: None,
        })])
        .build()
        .unwrap();

    let err = proxy.poll_once().await.unwrap_err();
    assert!(matches!(err, ProxyError::HookReject(1)));
    assert!(backend_sent.borrow().is_empty());
}

/// Frames that already passed the hook before a later frame is rejected
/// are flushed to the partner as a partial multipart, not dropped.
#[compio::test]
async fn hook_rejection_flushes_the_already_approved_prefix() {
    struct RejectSecondFrame {
        seen: usize,
    }

    #[async_trait::async_trait(?Send)]
    impl ProxyHook for RejectSecondFrame {
        async fn on_frame(
            &mut self,
            _ctx: HookContext,
            _frame: &mut Bytes,
            _marker: usize,
        ) -> ProxyResult<()> {
            self.seen += 1;
            if self.seen == 2 {
                Err(ProxyError::HookReject(2))
            } else {
                Ok(())
            }
        }
    }

    let mut frontend = MockSocket::new("F");
    frontend.enqueue(vec![frame("one"), frame("two"), frame("three")]);
    let backend_sent = Rc::new(RefCell::new(Vec::new()));
    let backend = MockSocket::with_outbox("B", backend_sent.clone());

    let mut proxy = ProxyBuilder::new()
        .frontends(vec![Some(Box::new(frontend))])
        .backends(vec![Some(Box::new(backend))])
        .hooks(vec![Some(PairHookSet {
            front2back: Some(Box::new(RejectSecondFrame { seen: 0 })),
            back2front: None,
        })])
        .build()
        .unwrap();

    let err = proxy.poll_once().await.unwrap_err();
    assert!(matches!(err, ProxyError::HookReject(2)));
    // Only the first (approved) frame reached the backend, as its own
    // partial multipart, rather than being discarded.
    assert_eq!(*backend_sent.borrow(), vec![vec![frame("one")]]);
}

/// Direction and pair_index reach the hook context unchanged.
#[compio::test]
async fn hook_context_carries_direction_and_pair_index() {
    struct RecordingHook {
        seen: Rc<RefCell<Option<(Direction, usize)>>>,
    }

    #[async_trait::async_trait(?Send)]
    impl ProxyHook for RecordingHook {
        async fn on_frame(
            &mut self,
            ctx: HookContext,
            _frame: &mut Bytes,
            _marker: usize,
        ) -> ProxyResult<()> {
            *self.seen.borrow_mut() = Some((ctx.direction, ctx.pair_index));
            Ok(())
        }
    }

    let seen = Rc::new(RefCell::new(None));
    let mut frontend = MockSocket::new("F");
    frontend.enqueue(vec![frame("x")]);

    let mut proxy = ProxyBuilder::new()
        .frontends(vec![Some(Box::new(frontend))])
        .backends(vec![Some(Box::new(MockSocket::new("B")))])
        .hooks(vec![Some(PairHookSet {
            front2back: Some(Box::new(RecordingHook { seen: seen.clone() })),
            back2front: None,
        })])
        .build()
        .unwrap();

    proxy.poll_once().await.unwrap();
    assert_eq!(*seen.borrow(), Some((Direction::Front2Back, 0)));
}
