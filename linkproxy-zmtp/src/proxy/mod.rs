//! Generalized, steerable message proxy.
//!
//! Generalizes the classical single-pair broker along three axes: a bounded
//! chain of independent frontend/backend pairs, degenerate pairs ("open
//! endpoints") that are merely polled and reported back to the caller, and a
//! capture/hook contract that lets every forwarded frame be observed,
//! duplicated, or rejected. A control socket accepting `PAUSE` / `RESUME` /
//! `TERMINATE` steers the run state.
//!
//! # Example
//!
//! ```no_run
//! use linkproxy_zmtp::proxy::{ProxyBuilder, ProxyConfig, TimeOut};
//! use linkproxy_zmtp::router::RouterSocket;
//! use linkproxy_zmtp::dealer::DealerSocket;
//!
//! # #[compio::main]
//! # async fn main() -> std::io::Result<()> {
//! let (_, frontend) = RouterSocket::bind("127.0.0.1:5555").await?;
//! let (_, backend) = DealerSocket::bind("127.0.0.1:5556").await?;
//!
//! let mut proxy = ProxyBuilder::new()
//!     .frontends(vec![Some(Box::new(frontend))])
//!     .backends(vec![Some(Box::new(backend))])
//!     .config(ProxyConfig::custom(10, TimeOut::Millis(100)))
//!     .build()?;
//!
//! proxy.poll_once().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod hook;
pub mod socket;
pub mod stats;

pub use config::{PollEvents, ProxyConfig, TimeOut, CHAIN_MAX};
pub use error::{ProxyError, ProxyResult};
pub use hook::{Direction, HookContext, PairHookSet, ProxyHook};
pub use socket::ProxySocket;
pub use stats::{ProxyStats, ProxyStatsSnapshot};

use bytes::Bytes;
use std::io;
use std::time::Duration;
use tracing::{debug, trace, warn};

use hook::HookSlot;

/// Run state, driven only by the control interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Active,
    Paused,
    Terminated,
}

/// Outcome of one [`Proxy::poll_once`] iteration.
///
/// A tagged result rather than an overloaded integer: `Ready` always
/// carries the real, 0-based open-endpoint index. Only [`Proxy::poll_legacy`]
/// collapses this back down to the historical integer convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing became ready within the configured timeout.
    Idle,
    /// A control command was applied, or a pair was forwarded.
    Handled,
    /// `TERMINATE` was received; the run loop should stop.
    Terminated,
    /// Open-endpoint socket `index` (0-based) became readable. The caller
    /// should call [`Proxy::take_ready_message`] to retrieve it.
    Ready(usize),
}

/// A fully constructed proxy topology.
///
/// Built via [`ProxyBuilder`]. Owns the sockets handed to it at
/// construction (this core never hands them back to a parallel caller
/// reference) and never closes them itself — dropping a `Proxy` simply
/// drops its internal tables and, with them, its last owning reference to
/// each socket.
pub struct Proxy {
    sockets: Vec<Box<dyn ProxySocket>>,
    linked_to: Vec<usize>,
    hooks: Vec<Option<HookSlot>>,
    events_mask: Vec<PollEvents>,
    control: Option<Box<dyn ProxySocket>>,
    capture: Option<Box<dyn ProxySocket>>,
    state: RunState,
    config: ProxyConfig,
    stats: ProxyStats,
    pending: Vec<Option<Vec<Bytes>>>,
}

impl Proxy {
    /// Current run state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Number of sockets in the poll table, excluding the control socket.
    #[must_use]
    pub fn qt_sockets(&self) -> usize {
        self.sockets.len()
    }

    /// Cheap, point-in-time counters snapshot.
    #[must_use]
    pub fn stats(&self) -> ProxyStatsSnapshot {
        self.stats.snapshot()
    }

    /// Retrieve the message cached for open-endpoint socket `index` (0-based)
    /// after a [`PollOutcome::Ready`] result. Returns `None` if nothing is
    /// cached (already taken, or the readiness carried no message).
    pub fn take_ready_message(&mut self, index: usize) -> Option<Vec<Bytes>> {
        self.pending.get_mut(index).and_then(Option::take)
    }

    /// Rewrite the polled-event mask of the `index_1_based`-th socket.
    /// Replaces, rather than ORs, the existing mask; takes effect on the
    /// next poll cycle.
    ///
    /// # Errors
    ///
    /// Returns `Err` without modifying any state if `index_1_based` is
    /// `0` or greater than [`Proxy::qt_sockets`].
    pub fn set_socket_events_mask(
        &mut self,
        index_1_based: usize,
        mask: PollEvents,
    ) -> ProxyResult<()> {
        if index_1_based == 0 || index_1_based > self.sockets.len() {
            return Err(ProxyError::InvalidArgument(format!(
                "socket index {} out of range (1..={})",
                index_1_based,
                self.sockets.len()
            )));
        }
        self.events_mask[index_1_based - 1] = mask;
        Ok(())
    }

    /// Run exactly one poll iteration.
    ///
    /// In bounded mode (`TimeOut::Millis`) this returns `Idle` if nothing
    /// becomes ready before the timeout elapses. In blocking mode
    /// (`TimeOut::Block`) this call itself blocks until a control command,
    /// a forwarded pair, or an open-endpoint readiness resolves it — use
    /// [`Proxy::run`] to keep calling it across multiple iterations.
    ///
    /// One iteration services every socket that is *already* ready once the
    /// first one resolves, not just that first one: after the initial wait,
    /// the remaining sockets are polled non-blockingly and every hit is
    /// forwarded, in items order (control first, then data sockets by
    /// ascending index), within this same call. Processing stops early if a
    /// `TERMINATE` is applied or an open endpoint becomes ready, leaving any
    /// further readiness for the next call.
    ///
    /// # Errors
    ///
    /// Propagates transport errors, hook rejections, and malformed control
    /// frames. Panics (does not return `Err`) on an unrecognized control
    /// command payload, matching the fatal-assertion contract of this
    /// proxy's control protocol.
    pub async fn poll_once(&mut self) -> ProxyResult<PollOutcome> {
        use futures::FutureExt;

        if self.state == RunState::Terminated {
            return Ok(PollOutcome::Terminated);
        }

        enum Source {
            Control,
            Data(usize),
        }

        type Resolved = (Source, io::Result<Option<Vec<Bytes>>>);

        let mut futs: Vec<std::pin::Pin<Box<dyn std::future::Future<Output = Resolved> + '_>>> =
            Vec::new();

        // Control is always listed first: ties within select_all favor the
        // earliest-listed future, so a simultaneously-ready control socket
        // is always ordered before any data socket in the same iteration.
        if let Some(control) = self.control.as_mut() {
            futs.push(Box::pin(async move {
                let result = control.recv_multipart().await;
                (Source::Control, result)
            }));
        }

        if self.state == RunState::Active {
            for (i, (sock, mask)) in self
                .sockets
                .iter_mut()
                .zip(self.events_mask.iter())
                .enumerate()
            {
                if mask.contains(PollEvents::READABLE) {
                    futs.push(Box::pin(async move {
                        let result = sock.recv_multipart().await;
                        (Source::Data(i), result)
                    }));
                }
            }
        }

        if futs.is_empty() {
            // Paused with no control socket configured: nothing pollable.
            return Ok(PollOutcome::Idle);
        }

        // Wait for at least one socket to become ready, then opportunistically
        // drain the rest: a future that doesn't resolve immediately after the
        // first one did is simply not ready yet and is left for the next call
        // (each call rebuilds its futures from scratch, so nothing is lost).
        let mut ready: Vec<Resolved> = Vec::new();
        match self.config.time_out {
            TimeOut::Block => {
                let (first, _idx, remaining) = futures::future::select_all(futs).await;
                ready.push(first);
                for fut in remaining {
                    if let Some(r) = fut.now_or_never() {
                        ready.push(r);
                    }
                }
            }
            TimeOut::Millis(ms) => {
                futures::select! {
                    res = futures::future::select_all(futs).fuse() => {
                        let (first, _idx, remaining) = res;
                        ready.push(first);
                        for fut in remaining {
                            if let Some(r) = fut.now_or_never() {
                                ready.push(r);
                            }
                        }
                    }
                    _ = compio::time::sleep(Duration::from_millis(ms)).fuse() => {
                        return Ok(PollOutcome::Idle);
                    }
                }
            }
        }

        // Restore items-order: control first, then data sockets ascending,
        // regardless of which one happened to win the initial race.
        ready.sort_by_key(|(source, _)| match source {
            Source::Control => 0usize,
            Source::Data(i) => *i + 1,
        });

        let mut handled_any = false;
        for (source, result) in ready {
            match source {
                Source::Control => {
                    let frames = result.map_err(ProxyError::Transport)?;
                    self.handle_control(frames).await?;
                    self.stats.record_control();
                    handled_any = true;
                    if self.state == RunState::Terminated {
                        return Ok(PollOutcome::Terminated);
                    }
                }
                Source::Data(i) => {
                    let frames = result.map_err(ProxyError::Transport)?;
                    let Some(msg) = frames else {
                        continue;
                    };
                    if self.linked_to[i] == i {
                        trace!("proxy: open endpoint {} ready ({} frames)", i, msg.len());
                        self.pending[i] = Some(msg);
                        return Ok(PollOutcome::Ready(i));
                    }
                    self.forward(i, msg).await?;
                    handled_any = true;
                }
            }
        }

        if handled_any {
            Ok(PollOutcome::Handled)
        } else {
            Ok(PollOutcome::Idle)
        }
    }

    /// Loop [`Proxy::poll_once`] until it returns `Terminated` or an
    /// open-endpoint readiness, folding `Idle`/`Handled` iterations.
    ///
    /// This is the counterpart to blocking mode's pseudocode in the
    /// underlying design: the proxy's single externally-visible `poll()`
    /// call runs to completion internally rather than returning after one
    /// underlying readiness cycle.
    ///
    /// # Errors
    ///
    /// Propagates whatever `poll_once` returns on its first non-`Idle`,
    /// non-`Handled` outcome or error.
    pub async fn run(&mut self) -> ProxyResult<PollOutcome> {
        loop {
            match self.poll_once().await? {
                PollOutcome::Idle | PollOutcome::Handled => continue,
                terminal => return Ok(terminal),
            }
        }
    }

    /// The literal external boundary: `0` idle/handled/terminated,
    /// `1..=qt_sockets` an open-endpoint index, negative on error.
    ///
    /// Dispatches to [`Proxy::run`] when configured for blocking mode and
    /// [`Proxy::poll_once`] otherwise, then translates [`PollOutcome`] back
    /// down to the historical single-integer convention. New callers should
    /// prefer the typed `poll_once`/`run` API, which always carries the
    /// real open-endpoint index even in blocking mode.
    ///
    /// # Errors
    ///
    /// Returns `Err` (rather than a negative value) on any proxy error;
    /// callers that need the legacy negative-return convention can match on
    /// `Err` instead of inspecting a platform error variable.
    pub async fn poll_legacy(&mut self) -> io::Result<i64> {
        let blocking = matches!(self.config.time_out, TimeOut::Block);
        let outcome = if blocking {
            self.run().await
        } else {
            self.poll_once().await
        };
        match outcome? {
            PollOutcome::Idle | PollOutcome::Handled | PollOutcome::Terminated => Ok(0),
            PollOutcome::Ready(i) => {
                if blocking {
                    Ok(1)
                } else {
                    Ok(i as i64 + 1)
                }
            }
        }
    }

    async fn handle_control(&mut self, frames: Option<Vec<Bytes>>) -> ProxyResult<()> {
        let Some(frames) = frames else {
            return Err(ProxyError::MalformedControl(
                "control socket closed".to_string(),
            ));
        };
        if frames.len() != 1 {
            return Err(ProxyError::MalformedControl(format!(
                "control frame carries a continuation ({} frames)",
                frames.len()
            )));
        }
        let frame = frames.into_iter().next().expect("checked len == 1");

        if let Some(capture) = self.capture.as_mut() {
            if let Err(e) = capture.send_multipart(vec![frame.clone()]).await {
                warn!("proxy: capture sink send failed for control frame: {}", e);
                return Err(ProxyError::Transport(e));
            }
        }

        match frame.as_ref() {
            b"PAUSE" => {
                debug!("proxy: control PAUSE");
                self.state = RunState::Paused;
            }
            b"RESUME" => {
                debug!("proxy: control RESUME");
                self.state = RunState::Active;
            }
            b"TERMINATE" => {
                debug!("proxy: control TERMINATE");
                self.state = RunState::Terminated;
            }
            other => {
                panic!(
                    "proxy control channel received an unrecognized command ({} bytes): {:?}",
                    other.len(),
                    other
                );
            }
        }
        Ok(())
    }

    async fn forward(&mut self, idx: usize, frames: Vec<Bytes>) -> ProxyResult<()> {
        let partner = self.linked_to[idx];
        let n = frames.len();
        if n == 0 {
            return Ok(());
        }

        debug!(
            "proxy: {} -> {}: {} frames",
            self.sockets[idx].socket_desc(),
            self.sockets[partner].socket_desc(),
            n
        );

        if let Some(capture) = self.capture.as_mut() {
            if let Err(e) = capture.send_multipart(frames.clone()).await {
                warn!("proxy: capture sink send failed: {}", e);
                return Err(ProxyError::Transport(e));
            }
        }

        let total_bytes: usize = frames.iter().map(Bytes::len).sum();

        let mut out = Vec::with_capacity(n);
        if let Some(slot) = self.hooks[idx].as_mut() {
            let ctx = HookContext {
                direction: slot.direction,
                pair_index: slot.pair_index,
                from_desc: self.sockets[idx].socket_desc(),
                to_desc: self.sockets[partner].socket_desc(),
                capture_desc: self.capture.as_deref().map(ProxySocket::socket_desc),
            };
            for (i, mut frame) in frames.into_iter().enumerate() {
                let marker = if i + 1 == n { 0 } else { i + 1 };
                trace!("proxy: hook frame {} marker {}", i, marker);
                if let Err(e) = slot.hook.on_frame(ctx, &mut frame, marker).await {
                    self.stats.record_hook_rejection();
                    // Frames 0..i already passed their own hook check and
                    // were already mirrored to the capture sink; flush them
                    // to the partner instead of dropping them on the floor.
                    // The rejection still aborts the message: the partner
                    // sees a genuine partial multipart, matching a forward
                    // that fails partway through on the wire.
                    if !out.is_empty() {
                        if let Err(flush_err) = self.sockets[partner]
                            .send_multipart(std::mem::take(&mut out))
                            .await
                        {
                            warn!(
                                "proxy: failed to flush hook-approved prefix after rejection: {}",
                                flush_err
                            );
                        }
                    }
                    return Err(e);
                }
                out.push(frame);
            }
        } else {
            out = frames;
        }

        self.sockets[partner]
            .send_multipart(out)
            .await
            .map_err(ProxyError::Transport)?;
        self.stats.record_forward(n, total_bytes);
        Ok(())
    }
}

/// Builds a [`Proxy`] from caller-supplied socket vectors, matching the
/// six-step construction contract: symmetry check, strict-mode check,
/// capacity check, ordered population, at-least-one-socket check, initial
/// `Active` state.
#[derive(Default)]
pub struct ProxyBuilder {
    open_endpoints: Vec<Box<dyn ProxySocket>>,
    frontends: Vec<Option<Box<dyn ProxySocket>>>,
    backends: Vec<Option<Box<dyn ProxySocket>>>,
    hooks: Vec<Option<PairHookSet>>,
    capture: Option<Box<dyn ProxySocket>>,
    control: Option<Box<dyn ProxySocket>>,
    config: ProxyConfig,
}

impl ProxyBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn config(mut self, config: ProxyConfig) -> Self {
        self.config = config;
        self
    }

    /// Sockets that are polled but never forwarded. Order determines their
    /// 0-based `Ready` index.
    #[must_use]
    pub fn open_endpoints(mut self, sockets: Vec<Box<dyn ProxySocket>>) -> Self {
        self.open_endpoints = sockets;
        self
    }

    /// Frontend side of each pair, parallel to `backends`. `None` at
    /// position `i` demotes pair `i` to a backend-only open endpoint.
    #[must_use]
    pub fn frontends(mut self, frontends: Vec<Option<Box<dyn ProxySocket>>>) -> Self {
        self.frontends = frontends;
        self
    }

    /// Backend side of each pair, parallel to `frontends`.
    #[must_use]
    pub fn backends(mut self, backends: Vec<Option<Box<dyn ProxySocket>>>) -> Self {
        self.backends = backends;
        self
    }

    /// Per-pair hooks, parallel to `frontends`/`backends`. Shorter than the
    /// pair vectors is fine — trailing pairs are treated as having no hook.
    #[must_use]
    pub fn hooks(mut self, hooks: Vec<Option<PairHookSet>>) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub fn capture(mut self, capture: Box<dyn ProxySocket>) -> Self {
        self.capture = Some(capture);
        self
    }

    #[must_use]
    pub fn control(mut self, control: Box<dyn ProxySocket>) -> Self {
        self.control = Some(control);
        self
    }

    /// Finish construction, performing all of the checks in §4.1's
    /// construction contract.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidArgument`] for an asymmetric pair
    /// vector, a strict-mode violation, or an empty topology, and
    /// [`ProxyError::CapacityExceeded`] if the requested topology is larger
    /// than `config.chain_max`.
    pub fn build(mut self) -> ProxyResult<Proxy> {
        if self.frontends.len() != self.backends.len() {
            return Err(ProxyError::InvalidArgument(format!(
                "frontend/backend vectors must be the same length (got {} and {})",
                self.frontends.len(),
                self.backends.len()
            )));
        }

        if matches!(self.config.time_out, TimeOut::Block) {
            let first_pair_complete = self
                .frontends
                .first()
                .is_some_and(Option::is_some)
                && self.backends.first().is_some_and(Option::is_some);
            if !first_pair_complete {
                return Err(ProxyError::InvalidArgument(
                    "blocking mode requires a non-degenerate first pair".to_string(),
                ));
            }
        }

        let requested = self.open_endpoints.len()
            + self.frontends.iter().filter(|f| f.is_some()).count()
            + self.backends.iter().filter(|b| b.is_some()).count()
            + usize::from(self.control.is_some());
        if requested > self.config.chain_max {
            return Err(ProxyError::CapacityExceeded {
                max: self.config.chain_max,
                requested,
            });
        }

        let mut sockets: Vec<Box<dyn ProxySocket>> = Vec::new();
        let mut linked_to: Vec<usize> = Vec::new();
        let mut hooks: Vec<Option<HookSlot>> = Vec::new();

        for oep in self.open_endpoints.drain(..) {
            let idx = sockets.len();
            sockets.push(oep);
            linked_to.push(idx);
            hooks.push(None);
        }

        let mut hook_sets = std::mem::take(&mut self.hooks).into_iter();
        let mut pair_counter = 0usize;

        for (frontend, backend) in self.frontends.into_iter().zip(self.backends) {
            let pair_hooks = hook_sets.next().flatten();
            match (frontend, backend) {
                (Some(f), Some(b)) => {
                    let pair_index = pair_counter;
                    pair_counter += 1;
                    let f_idx = sockets.len();
                    let b_idx = f_idx + 1;
                    let (front2back, back2front) = match pair_hooks {
                        Some(set) => (set.front2back, set.back2front),
                        None => (None, None),
                    };

                    sockets.push(f);
                    linked_to.push(b_idx);
                    hooks.push(front2back.map(|hook| HookSlot {
                        hook,
                        direction: Direction::Front2Back,
                        pair_index,
                    }));

                    sockets.push(b);
                    linked_to.push(f_idx);
                    hooks.push(back2front.map(|hook| HookSlot {
                        hook,
                        direction: Direction::Back2Front,
                        pair_index,
                    }));
                }
                (Some(f), None) => {
                    let idx = sockets.len();
                    sockets.push(f);
                    linked_to.push(idx);
                    hooks.push(None);
                }
                (None, Some(b)) => {
                    let idx = sockets.len();
                    sockets.push(b);
                    linked_to.push(idx);
                    hooks.push(None);
                }
                (None, None) => {}
            }
        }

        if sockets.is_empty() {
            return Err(ProxyError::InvalidArgument(
                "topology must contain at least one open-endpoint or forwarding socket"
                    .to_string(),
            ));
        }

        let events_mask = vec![PollEvents::READABLE; sockets.len()];
        let pending = (0..sockets.len()).map(|_| None).collect();

        debug!(
            "proxy: built topology with {} sockets, {} pairs, control={}, capture={}",
            sockets.len(),
            pair_counter,
            self.control.is_some(),
            self.capture.is_some()
        );

        Ok(Proxy {
            sockets,
            linked_to,
            hooks,
            events_mask,
            control: self.control,
            capture: self.capture,
            state: RunState::Active,
            config: self.config,
            stats: ProxyStats::default(),
            pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory `ProxySocket` double: recv drains a pre-loaded FIFO queue,
    /// send appends to an observable outbox.
    struct MockSocket {
        name: &'static str,
        recv_queue: std::collections::VecDeque<Vec<Bytes>>,
        sent: Vec<Vec<Bytes>>,
    }

    impl MockSocket {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                recv_queue: std::collections::VecDeque::new(),
                sent: Vec::new(),
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
            self.sent.push(msg);
            Ok(())
        }

        fn socket_desc(&self) -> &'static str {
            self.name
        }
    }

    fn frame(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn mock_socket_enqueue() {
        let mut sock = MockSocket::new("test");
        sock.enqueue(vec![frame("hello")]);
        assert_eq!(sock.recv_queue.len(), 1);
    }

    #[compio::test]
    async fn build_rejects_asymmetric_pair_vectors() {
        let frontend: Box<dyn ProxySocket> = Box::new(MockSocket::new("F"));
        let err = ProxyBuilder::new()
            .frontends(vec![Some(frontend)])
            .backends(vec![])
            .build()
            .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidArgument(_)));
    }

    #[compio::test]
    async fn build_rejects_empty_topology() {
        let err = ProxyBuilder::new().build().unwrap_err();
        assert!(matches!(err, ProxyError::InvalidArgument(_)));
    }

    #[compio::test]
    async fn build_rejects_strict_mode_without_first_pair() {
        let front: Box<dyn ProxySocket> = Box::new(MockSocket::new("F"));
        let err = ProxyBuilder::new()
            .frontends(vec![Some(front)])
            .backends(vec![None])
            .config(ProxyConfig::custom(CHAIN_MAX, TimeOut::Block))
            .build()
            .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidArgument(_)));
    }

    #[compio::test]
    async fn build_rejects_capacity_exceeded() {
        let oeps: Vec<Box<dyn ProxySocket>> = (0..3)
            .map(|i| Box::new(MockSocket::new(if i == 0 { "a" } else { "b" })) as Box<dyn ProxySocket>)
            .collect();
        let err = ProxyBuilder::new()
            .open_endpoints(oeps)
            .config(ProxyConfig::custom(2, TimeOut::Millis(0)))
            .build()
            .unwrap_err();
        assert!(matches!(err, ProxyError::CapacityExceeded { .. }));
    }

    #[compio::test]
    async fn forward_moves_a_multipart_message_end_to_end() {
        let mut frontend = MockSocket::new("F");
        frontend.enqueue(vec![frame("id"), frame("ping")]);
        let backend = MockSocket::new("B");

        let mut proxy = ProxyBuilder::new()
            .frontends(vec![Some(Box::new(frontend))])
            .backends(vec![Some(Box::new(backend))])
            .build()
            .unwrap();

        let outcome = proxy.poll_once().await.unwrap();
        assert_eq!(outcome, PollOutcome::Handled);
        assert_eq!(proxy.stats().messages_forwarded, 1);
        assert_eq!(proxy.stats().frames_forwarded, 2);
    }

    #[compio::test]
    async fn open_endpoint_reports_ready_with_its_index() {
        let mut endpoint = MockSocket::new("OEP");
        endpoint.enqueue(vec![frame("hi")]);

        let mut proxy = ProxyBuilder::new()
            .open_endpoints(vec![Box::new(endpoint)])
            .build()
            .unwrap();

        let outcome = proxy.poll_once().await.unwrap();
        assert_eq!(outcome, PollOutcome::Ready(0));
        let msg = proxy.take_ready_message(0).unwrap();
        assert_eq!(msg, vec![frame("hi")]);
        assert!(proxy.take_ready_message(0).is_none());
    }

    #[compio::test]
    async fn pause_then_resume_gates_forwarding() {
        let mut control = MockSocket::new("C");
        control.enqueue(vec![frame("PAUSE")]);
        let mut frontend = MockSocket::new("F");
        frontend.enqueue(vec![frame("ping")]);
        let backend = MockSocket::new("B");

        let mut proxy = ProxyBuilder::new()
            .frontends(vec![Some(Box::new(frontend))])
            .backends(vec![Some(Box::new(backend))])
            .control(Box::new(control))
            .build()
            .unwrap();

        let outcome = proxy.poll_once().await.unwrap();
        assert_eq!(outcome, PollOutcome::Handled);
        assert_eq!(proxy.state(), RunState::Paused);
        assert_eq!(proxy.stats().control_commands_handled, 1);

        // Paused: the pending frontend message is not forwarded even though
        // it is ready, because data futures are excluded from the race.
        let outcome = proxy.poll_once().await.unwrap();
        assert_eq!(outcome, PollOutcome::Idle);
        assert_eq!(proxy.stats().messages_forwarded, 0);
    }

    #[compio::test]
    async fn terminate_ends_the_proxy() {
        let mut control = MockSocket::new("C");
        control.enqueue(vec![frame("TERMINATE")]);

        let mut proxy = ProxyBuilder::new()
            .open_endpoints(vec![Box::new(MockSocket::new("OEP"))])
            .control(Box::new(control))
            .build()
            .unwrap();

        let outcome = proxy.poll_once().await.unwrap();
        assert_eq!(outcome, PollOutcome::Terminated);
        assert_eq!(proxy.state(), RunState::Terminated);
        assert_eq!(proxy.poll_once().await.unwrap(), PollOutcome::Terminated);
    }

    #[compio::test]
    #[should_panic(expected = "unrecognized command")]
    async fn unknown_control_command_panics() {
        let mut control = MockSocket::new("C");
        control.enqueue(vec![frame("BOGUS")]);

        let mut proxy = ProxyBuilder::new()
            .open_endpoints(vec![Box::new(MockSocket::new("OEP"))])
            .control(Box::new(control))
            .build()
            .unwrap();

        let _ = proxy.poll_once().await;
    }

    #[compio::test]
    async fn set_socket_events_mask_rejects_out_of_range() {
        let mut proxy = ProxyBuilder::new()
            .open_endpoints(vec![Box::new(MockSocket::new("OEP"))])
            .build()
            .unwrap();

        assert!(proxy.set_socket_events_mask(0, PollEvents::READABLE).is_err());
        assert!(proxy.set_socket_events_mask(2, PollEvents::READABLE).is_err());
        assert!(proxy.set_socket_events_mask(1, PollEvents::empty()).is_ok());
    }

    #[compio::test]
    async fn set_socket_events_mask_gates_forwarding() {
        let mut frontend = MockSocket::new("F");
        frontend.enqueue(vec![frame("ping")]);
        let backend = MockSocket::new("B");

        let mut proxy = ProxyBuilder::new()
            .frontends(vec![Some(Box::new(frontend))])
            .backends(vec![Some(Box::new(backend))])
            .build()
            .unwrap();

        // Excluding READABLE on the frontend (1-based index 1) must stop it
        // being serviced even though its recv queue already has a message.
        proxy
            .set_socket_events_mask(1, PollEvents::empty())
            .unwrap();
        let outcome = proxy.poll_once().await.unwrap();
        assert_eq!(outcome, PollOutcome::Idle);
        assert_eq!(proxy.stats().messages_forwarded, 0);

        // Re-enabling it lets the same still-pending message through.
        proxy
            .set_socket_events_mask(1, PollEvents::READABLE)
            .unwrap();
        let outcome = proxy.poll_once().await.unwrap();
        assert_eq!(outcome, PollOutcome::Handled);
        assert_eq!(proxy.stats().messages_forwarded, 1);
    }
}
