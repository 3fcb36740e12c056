//! Proxy message counters, exposed without touching the control wire
//! protocol (see the control-interpreter docs on `Proxy` for why).

use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters updated by the forwarder and control interpreter.
#[derive(Debug, Default)]
pub struct ProxyStats {
    messages_forwarded: AtomicU64,
    frames_forwarded: AtomicU64,
    bytes_forwarded: AtomicU64,
    control_commands_handled: AtomicU64,
    hook_rejections: AtomicU64,
}

impl ProxyStats {
    pub(super) fn record_forward(&self, frames: usize, bytes: usize) {
        self.messages_forwarded.fetch_add(1, Ordering::Relaxed);
        self.frames_forwarded
            .fetch_add(frames as u64, Ordering::Relaxed);
        self.bytes_forwarded
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(super) fn record_control(&self) {
        self.control_commands_handled
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_hook_rejection(&self) {
        self.hook_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn snapshot(&self) -> ProxyStatsSnapshot {
        ProxyStatsSnapshot {
            messages_forwarded: self.messages_forwarded.load(Ordering::Relaxed),
            frames_forwarded: self.frames_forwarded.load(Ordering::Relaxed),
            bytes_forwarded: self.bytes_forwarded.load(Ordering::Relaxed),
            control_commands_handled: self.control_commands_handled.load(Ordering::Relaxed),
            hook_rejections: self.hook_rejections.load(Ordering::Relaxed),
        }
    }
}

/// A cheap, `Copy` point-in-time snapshot of [`ProxyStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyStatsSnapshot {
    pub messages_forwarded: u64,
    pub frames_forwarded: u64,
    pub bytes_forwarded: u64,
    pub control_commands_handled: u64,
    pub hook_rejections: u64,
}
