//! Per-project hot-swap session manager.
//!
//! Debugger backends report status changes either directly through
//! [`SessionManager::notify`] or through a [`StatusSender`] whose receiving end is driven by
//! [`SessionManager::forward`]. Listeners see updates in the order they were emitted.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::StreamExt;
use tokio::{runtime::Handle, sync::mpsc};
use tokio_util::sync::CancellationToken;

use crate::{context::ProjectId, session::HotSwapSession, status::StatusEvent};

/// Receives status changes of every session in a project
pub trait HotSwapChangesListener: Send + Sync {
    fn on_status_changed(&self, session: &Arc<dyn HotSwapSession>, status: StatusEvent);
}

#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub session: Arc<dyn HotSwapSession>,
    pub status: StatusEvent,
}

/// Create a channel for reporting status changes from a worker
pub fn status_channel() -> (StatusSender, StatusReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StatusSender { tx }, StatusReceiver { rx })
}

#[derive(Clone)]
pub struct StatusSender {
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl StatusSender {
    pub fn send(&self, session: &Arc<dyn HotSwapSession>, status: StatusEvent) -> eyre::Result<()> {
        self.tx
            .send(StatusUpdate {
                session: session.clone(),
                status,
            })
            .map_err(|_| eyre::eyre!("status channel closed"))
    }
}

pub struct StatusReceiver {
    rx: mpsc::UnboundedReceiver<StatusUpdate>,
}

impl StatusReceiver {
    /// Convert to a Stream for use with StreamExt
    pub fn into_stream(self) -> impl futures::Stream<Item = StatusUpdate> {
        tokio_stream::wrappers::UnboundedReceiverStream::new(self.rx)
    }
}

/// Registration of a listener with a [`SessionManager`].
///
/// Dropping the subscription does not remove the listener; it stays until the disposal token
/// passed to [`SessionManager::add_listener`] is cancelled or [`Subscription::unsubscribe`] is
/// called. The listener is then released straight away when the manager can reach a tokio
/// runtime, otherwise on the next call into the manager.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    token: CancellationToken,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cancelled once the listener has been removed
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn unsubscribe(&self) {
        tracing::debug!(subscription = self.id, "unsubscribing listener");
        self.token.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

struct ListenerEntry {
    id: u64,
    listener: Arc<dyn HotSwapChangesListener>,
    token: CancellationToken,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<ListenerEntry>,
}

type SharedListeners = Arc<Mutex<Listeners>>;

fn lock(listeners: &Mutex<Listeners>) -> MutexGuard<'_, Listeners> {
    listeners.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Listeners {
    fn prune(&mut self) {
        self.entries.retain(|entry| {
            let live = !entry.token.is_cancelled();
            if !live {
                tracing::debug!(subscription = entry.id, "removing disposed listener");
            }
            live
        });
    }
}

pub struct SessionManager {
    project: ProjectId,
    listeners: SharedListeners,
    disposed: CancellationToken,
    runtime: Option<Handle>,
}

impl SessionManager {
    pub fn new(project: ProjectId) -> Self {
        Self {
            project,
            listeners: SharedListeners::default(),
            disposed: CancellationToken::new(),
            runtime: None,
        }
    }

    /// Use `runtime` to release disposed listeners when registering outside of a runtime
    pub fn with_runtime(project: ProjectId, runtime: Handle) -> Self {
        let mut manager = Self::new(project);
        manager.runtime = Some(runtime);
        manager
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    /// Register `listener` until `disposal` is cancelled
    pub fn add_listener(
        &self,
        listener: Arc<dyn HotSwapChangesListener>,
        disposal: &CancellationToken,
    ) -> Subscription {
        let token = disposal.child_token();
        let mut listeners = self.lock();
        listeners.prune();

        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push(ListenerEntry {
            id,
            listener,
            token: token.clone(),
        });
        drop(listeners);
        tracing::debug!(project = %self.project, subscription = id, "listener added");

        self.spawn_release(id, token.clone());
        Subscription { id, token }
    }

    /// Drop the listener entry as soon as its token is cancelled
    fn spawn_release(&self, id: u64, token: CancellationToken) {
        let Some(runtime) = Handle::try_current().ok().or_else(|| self.runtime.clone()) else {
            tracing::debug!(subscription = id, "no runtime, listener released lazily");
            return;
        };

        let listeners = Arc::downgrade(&self.listeners);
        let disposed = self.disposed.clone();
        runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = disposed.cancelled() => return,
            }
            if let Some(listeners) = listeners.upgrade() {
                lock(&listeners).entries.retain(|entry| entry.id != id);
                tracing::debug!(subscription = id, "disposed listener released");
            }
        });
    }

    pub fn listener_count(&self) -> usize {
        let mut listeners = self.lock();
        listeners.prune();
        listeners.entries.len()
    }

    /// Deliver a status change to every live listener, in registration order
    pub fn notify(&self, session: &Arc<dyn HotSwapSession>, status: StatusEvent) {
        if self.disposed.is_cancelled() {
            tracing::debug!(%status, "manager disposed, dropping status");
            return;
        }

        // listeners may register or unregister from the callback
        let live: Vec<_> = {
            let mut listeners = self.lock();
            listeners.prune();
            listeners
                .entries
                .iter()
                .map(|entry| (entry.listener.clone(), entry.token.clone()))
                .collect()
        };

        tracing::debug!(session = %session.id(), %status, listeners = live.len(), "status changed");
        for (listener, token) in live {
            if token.is_cancelled() {
                continue;
            }
            listener.on_status_changed(session, status);
        }
    }

    /// Deliver updates from `receiver` until the channel closes or the manager is disposed
    pub async fn forward(&self, receiver: StatusReceiver) {
        let mut updates = std::pin::pin!(receiver.into_stream());
        loop {
            tokio::select! {
                _ = self.disposed.cancelled() => {
                    tracing::debug!(project = %self.project, "status forwarding cancelled");
                    break;
                }
                update = updates.next() => {
                    match update {
                        Some(StatusUpdate { session, status }) => self.notify(&session, status),
                        None => {
                            tracing::debug!(project = %self.project, "status channel closed");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Drop all listeners and stop delivering updates
    pub fn dispose(&self) {
        self.disposed.cancel();
        let mut listeners = self.lock();
        for entry in listeners.entries.drain(..) {
            entry.token.cancel();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Listeners> {
        lock(&self.listeners)
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        // stops release tasks still waiting on their tokens
        self.disposed.cancel();
    }
}

/// Lookup of the session manager of each project
#[derive(Default)]
pub struct SessionManagers {
    managers: Mutex<HashMap<ProjectId, Arc<SessionManager>>>,
    runtime: Option<Handle>,
}

impl SessionManagers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Managers created by this registry release disposed listeners on `runtime`
    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            runtime: Some(runtime),
            ..Self::default()
        }
    }

    pub fn get_or_create(&self, project: &ProjectId) -> Arc<SessionManager> {
        let mut managers = self.managers.lock().unwrap_or_else(PoisonError::into_inner);
        managers
            .entry(project.clone())
            .or_insert_with(|| {
                tracing::debug!(%project, "creating session manager");
                let manager = match &self.runtime {
                    Some(runtime) => SessionManager::with_runtime(project.clone(), runtime.clone()),
                    None => SessionManager::new(project.clone()),
                };
                Arc::new(manager)
            })
            .clone()
    }

    pub fn get(&self, project: &ProjectId) -> Option<Arc<SessionManager>> {
        let managers = self.managers.lock().unwrap_or_else(PoisonError::into_inner);
        managers.get(project).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{context::DataContext, session::SessionScope, session::SessionId};

    use super::*;

    struct NullSession {
        id: SessionId,
        scope: SessionScope,
    }

    impl HotSwapSession for NullSession {
        fn id(&self) -> SessionId {
            self.id
        }

        fn start_hot_swap(&self) -> eyre::Result<()> {
            Ok(())
        }

        fn perform_hot_swap(&self, _context: &DataContext) -> eyre::Result<()> {
            Ok(())
        }

        fn scope(&self) -> &SessionScope {
            &self.scope
        }
    }

    fn session() -> Arc<dyn HotSwapSession> {
        Arc::new(NullSession {
            id: SessionId::new(),
            scope: SessionScope::new(),
        })
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<StatusEvent>>);

    impl HotSwapChangesListener for Collect {
        fn on_status_changed(&self, _session: &Arc<dyn HotSwapSession>, status: StatusEvent) {
            self.0.lock().unwrap().push(status);
        }
    }

    #[test]
    fn listener_removed_when_disposal_cancelled() {
        let manager = SessionManager::new(ProjectId::new("p"));
        let disposal = CancellationToken::new();
        let listener = Arc::new(Collect::default());
        let subscription = manager.add_listener(listener.clone(), &disposal);

        let s = session();
        manager.notify(&s, StatusEvent::ChangesReady);
        disposal.cancel();
        manager.notify(&s, StatusEvent::NoChanges);

        assert!(!subscription.is_active());
        assert_eq!(manager.listener_count(), 0);
        assert_eq!(*listener.0.lock().unwrap(), vec![StatusEvent::ChangesReady]);
    }

    #[test]
    fn unsubscribe_leaves_other_listeners() {
        let manager = SessionManager::new(ProjectId::new("p"));
        let disposal = CancellationToken::new();
        let first = Arc::new(Collect::default());
        let second = Arc::new(Collect::default());
        let a = manager.add_listener(first.clone(), &disposal);
        let b = manager.add_listener(second.clone(), &disposal);
        assert_ne!(a.id(), b.id());

        a.unsubscribe();
        manager.notify(&session(), StatusEvent::ChangesReady);

        assert!(first.0.lock().unwrap().is_empty());
        assert_eq!(*second.0.lock().unwrap(), vec![StatusEvent::ChangesReady]);
        assert_eq!(manager.listener_count(), 1);
    }

    #[test]
    fn dispose_stops_delivery() {
        let manager = SessionManager::new(ProjectId::new("p"));
        let listener = Arc::new(Collect::default());
        let subscription = manager.add_listener(listener.clone(), &CancellationToken::new());

        manager.dispose();
        manager.notify(&session(), StatusEvent::ChangesReady);

        assert!(subscription.token().is_cancelled());
        assert!(listener.0.lock().unwrap().is_empty());
    }

    #[test]
    fn registry_returns_same_manager_per_project() {
        let managers = SessionManagers::new();
        let a = ProjectId::new("a");
        let first = managers.get_or_create(&a);
        let second = managers.get_or_create(&a);
        assert!(Arc::ptr_eq(&first, &second));

        let other = managers.get_or_create(&ProjectId::new("b"));
        assert!(!Arc::ptr_eq(&first, &other));
        assert!(managers.get(&ProjectId::new("c")).is_none());
    }

    #[tokio::test]
    async fn forward_preserves_emission_order() {
        let manager = SessionManager::new(ProjectId::new("p"));
        let listener = Arc::new(Collect::default());
        let _subscription = manager.add_listener(listener.clone(), &CancellationToken::new());

        let (tx, rx) = status_channel();
        let s = session();
        let sequence = [
            StatusEvent::ChangesReady,
            StatusEvent::InProgress,
            StatusEvent::NoChanges,
            StatusEvent::SessionCompleted,
        ];
        for status in sequence {
            tx.send(&s, status).unwrap();
        }
        drop(tx);

        manager.forward(rx).await;
        assert_eq!(*listener.0.lock().unwrap(), sequence.to_vec());
    }

    #[tokio::test]
    async fn disposed_listener_released_without_further_calls() {
        let manager = SessionManager::new(ProjectId::new("p"));
        let disposal = CancellationToken::new();
        let listener = Arc::new(Collect::default());
        let _subscription = manager.add_listener(listener.clone(), &disposal);
        assert_eq!(Arc::strong_count(&listener), 2);

        disposal.cancel();
        tokio::time::timeout(Duration::from_secs(5), async {
            while Arc::strong_count(&listener) > 1 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("listener was not released");
    }

    #[test]
    fn registry_runtime_releases_listeners_registered_outside_it() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let managers = SessionManagers::with_runtime(runtime.handle().clone());
        let manager = managers.get_or_create(&ProjectId::new("p"));

        let disposal = CancellationToken::new();
        let listener = Arc::new(Collect::default());
        let _subscription = manager.add_listener(listener.clone(), &disposal);
        disposal.cancel();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while Arc::strong_count(&listener) > 1 {
            assert!(std::time::Instant::now() < deadline, "listener was not released");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[tokio::test]
    async fn forward_stops_on_dispose() {
        let manager = Arc::new(SessionManager::new(ProjectId::new("p")));
        let (_tx, rx) = status_channel();

        let m = manager.clone();
        let handle = tokio::spawn(async move { m.forward(rx).await });
        manager.dispose();

        handle.await.unwrap();
    }
}
