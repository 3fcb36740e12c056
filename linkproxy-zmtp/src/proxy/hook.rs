//! Per-direction frame hook contract.

use bytes::Bytes;

use super::error::ProxyResult;

/// Which leg of a pair a frame is travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Frontend to backend.
    Front2Back,
    /// Backend to frontend.
    Back2Front,
}

/// Read-only context handed to a [`ProxyHook`] on every invocation.
///
/// Carries descriptors, not live socket handles: a hook observes or
/// rejects, it does not get to perform its own I/O against the pair.
#[derive(Debug, Clone, Copy)]
pub struct HookContext {
    pub direction: Direction,
    pub pair_index: usize,
    pub from_desc: &'static str,
    pub to_desc: &'static str,
    pub capture_desc: Option<&'static str>,
}

/// A caller-supplied, per-direction callback invoked once per frame of a
/// forwarded multipart message.
///
/// Modeled as a trait object rather than a raw function pointer plus
/// `void*`: the trait itself carries whatever state the hook needs.
///
/// Single-threaded by design, matching every other socket trait in this
/// crate (`ProxySocket`, `Socket`): no `Send` bound.
#[async_trait::async_trait(?Send)]
pub trait ProxyHook {
    /// Observe, and optionally mutate, one frame of a forwarded message.
    ///
    /// `marker` is `n` (1-based) while more frames follow, `0` on the
    /// terminal frame of the message.
    ///
    /// # Errors
    ///
    /// Returning `Err` aborts the forward; whatever [`super::error::ProxyError`]
    /// variant the hook itself constructs propagates unchanged to the caller
    /// of `poll_once`/`run` — it is not automatically rewrapped into
    /// [`super::error::ProxyError::HookReject`]. A hook that wants that
    /// variant on the wire should return `Err(ProxyError::HookReject(code))`
    /// itself.
    async fn on_frame(
        &mut self,
        ctx: HookContext,
        frame: &mut Bytes,
        marker: usize,
    ) -> ProxyResult<()>;
}

pub(super) struct HookSlot {
    pub hook: Box<dyn ProxyHook>,
    pub direction: Direction,
    pub pair_index: usize,
}

/// The pair of hooks (if any) a caller supplies for one frontend/backend
/// pair: `front2back` runs on frames moving frontend → backend,
/// `back2front` on the reverse leg.
#[derive(Default)]
pub struct PairHookSet {
    pub front2back: Option<Box<dyn ProxyHook>>,
    pub back2front: Option<Box<dyn ProxyHook>>,
}
