//! Debug sessions that can replace code in the running program.
//!
//! The toolbar never sees a concrete session type. Each debugger backend implements
//! [`HotSwapProvider`], wraps it in a [`DebugSession`], and hands it out as
//! `Arc<dyn HotSwapSession>`.
use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::context::DataContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Execution scope bound to the lifetime of one debug session.
///
/// Cancelling the scope signals that the session has ended.
#[derive(Debug, Clone, Default)]
pub struct SessionScope {
    token: CancellationToken,
}

impl SessionScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope that is cancelled together with this one
    pub fn child_scope(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Capabilities of a session that the toolbar relies on
pub trait HotSwapSession: Send + Sync {
    fn id(&self) -> SessionId;

    /// Mark the start of a hot swap
    fn start_hot_swap(&self) -> eyre::Result<()>;

    /// Run the backend specific code replacement
    fn perform_hot_swap(&self, context: &DataContext) -> eyre::Result<()>;

    fn scope(&self) -> &SessionScope;
}

impl fmt::Debug for dyn HotSwapSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HotSwapSession")
            .field("id", &self.id())
            .field("cancelled", &self.scope().is_cancelled())
            .finish()
    }
}

/// Debugger backend that knows how to apply changed code
pub trait HotSwapProvider: Send + Sync {
    /// Called when a hot swap starts, before [`HotSwapProvider::perform_hot_swap`]
    fn on_start(&self, _session: SessionId) -> eyre::Result<()> {
        Ok(())
    }

    fn perform_hot_swap(&self, context: &DataContext, session: SessionId) -> eyre::Result<()>;
}

/// Session implementation shared by all debugger backends
pub struct DebugSession<P> {
    id: SessionId,
    provider: P,
    scope: SessionScope,
    swaps_started: AtomicUsize,
}

impl<P> DebugSession<P>
where
    P: HotSwapProvider,
{
    pub fn new(provider: P) -> Self {
        Self::with_scope(provider, SessionScope::new())
    }

    pub fn with_scope(provider: P, scope: SessionScope) -> Self {
        Self {
            id: SessionId::new(),
            provider,
            scope,
            swaps_started: AtomicUsize::new(0),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Number of hot swaps started over the session lifetime
    pub fn swaps_started(&self) -> usize {
        self.swaps_started.load(Ordering::SeqCst)
    }
}

impl<P> HotSwapSession for DebugSession<P>
where
    P: HotSwapProvider,
{
    fn id(&self) -> SessionId {
        self.id
    }

    fn start_hot_swap(&self) -> eyre::Result<()> {
        let n = self.swaps_started.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(session = %self.id, swap = n, "starting hot swap");
        self.provider.on_start(self.id)
    }

    fn perform_hot_swap(&self, context: &DataContext) -> eyre::Result<()> {
        self.provider.perform_hot_swap(context, self.id)
    }

    fn scope(&self) -> &SessionScope {
        &self.scope
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<&'static str>>,
    }

    impl HotSwapProvider for Recorder {
        fn on_start(&self, _session: SessionId) -> eyre::Result<()> {
            self.calls.lock().unwrap().push("start");
            Ok(())
        }

        fn perform_hot_swap(&self, _context: &DataContext, _session: SessionId) -> eyre::Result<()> {
            self.calls.lock().unwrap().push("perform");
            Ok(())
        }
    }

    #[test]
    fn child_scope_follows_parent() {
        let parent = SessionScope::new();
        let child = parent.child_scope();
        assert!(!child.is_cancelled());

        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn cancelling_child_leaves_parent_alive() {
        let parent = SessionScope::new();
        parent.child_scope().cancel();
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn session_forwards_to_provider() {
        let session = DebugSession::new(Recorder::default());
        session.start_hot_swap().unwrap();
        session.perform_hot_swap(&DataContext::default()).unwrap();

        assert_eq!(session.swaps_started(), 1);
        assert_eq!(*session.provider().calls.lock().unwrap(), vec!["start", "perform"]);
    }

    #[test]
    fn session_ids_are_unique() {
        let a = DebugSession::new(Recorder::default());
        let b = DebugSession::new(Recorder::default());
        assert_ne!(a.id(), b.id());
    }
}
