//! Process-wide runtime toggles.
//!
//! `RuntimeContext` is the only mutable state shared across the layer. It
//! holds the offline flag, which suppresses index synchronization, and the
//! page style used to shape search results.
//!
//! The offline flag is read when a commit hook runs, possibly on a different
//! task than the one that set it. If other tasks commit records while an
//! offline scope is open, their writes are suppressed too, and writes that
//! race the scope's exit may or may not be. Treat it as best-effort
//! suppression, not a transactional barrier.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use search_sync_shared::PageStyle;
use tracing::debug;

#[derive(Debug, Default)]
struct RuntimeState {
    offline: AtomicBool,
    page_style: AtomicU8,
}

/// Shared handle to the runtime toggles. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    state: Arc<RuntimeState>,
}

fn encode_style(style: PageStyle) -> u8 {
    match style {
        PageStyle::Offset => 0,
        PageStyle::Count => 1,
    }
}

fn decode_style(raw: u8) -> PageStyle {
    match raw {
        1 => PageStyle::Count,
        _ => PageStyle::Offset,
    }
}

impl RuntimeContext {
    pub fn new(page_style: PageStyle) -> Self {
        let context = Self::default();
        context.set_page_style(page_style);
        context
    }

    pub fn is_offline(&self) -> bool {
        self.state.offline.load(Ordering::SeqCst)
    }

    /// Set the offline flag, returning the previous value.
    pub fn set_offline(&self, offline: bool) -> bool {
        let previous = self.state.offline.swap(offline, Ordering::SeqCst);
        debug!(offline, previous, "Offline mode changed");
        previous
    }

    /// Go offline until the returned guard is dropped.
    ///
    /// The previous value is restored on drop, including when the guarded
    /// code returns early or panics. Guards nest.
    #[must_use = "offline mode ends when the guard is dropped"]
    pub fn offline(&self) -> OfflineGuard {
        let previous = self.set_offline(true);
        OfflineGuard {
            context: self.clone(),
            previous,
        }
    }

    /// Run `f` with synchronization suppressed.
    pub fn without_indexing<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.offline();
        f()
    }

    /// Await the future built by `f` with synchronization suppressed.
    pub async fn without_indexing_async<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.offline();
        f().await
    }

    pub fn page_style(&self) -> PageStyle {
        decode_style(self.state.page_style.load(Ordering::SeqCst))
    }

    /// Switch the page shape produced by subsequent searches.
    pub fn set_page_style(&self, style: PageStyle) {
        self.state
            .page_style
            .store(encode_style(style), Ordering::SeqCst);
    }
}

/// Restores the previous offline value when dropped.
#[derive(Debug)]
pub struct OfflineGuard {
    context: RuntimeContext,
    previous: bool,
}

impl Drop for OfflineGuard {
    fn drop(&mut self) {
        self.context.set_offline(self.previous);
    }
}
