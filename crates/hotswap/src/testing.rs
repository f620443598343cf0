//! Testing utilities for code that drives the hot-swap toolbar.
//!
//! [`RecordingSurface`] and [`RecordingProvider`] capture every call made to them so tests can
//! assert on exact call sequences without a real UI or debugger backend.
use std::sync::{Arc, Mutex};

use crate::{
    context::DataContext,
    session::{DebugSession, HotSwapProvider, HotSwapSession, SessionId},
    surface::ToolbarSurface,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceCall {
    Show,
    Hide,
    HideNow,
}

/// Toolbar surface that records calls in order
#[derive(Debug, Default)]
pub struct RecordingSurface {
    calls: Mutex<Vec<SurfaceCall>>,
}

impl RecordingSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<SurfaceCall> {
        self.calls.lock().unwrap().last().copied()
    }

    fn record(&self, call: SurfaceCall) {
        tracing::trace!(?call, "surface call");
        self.calls.lock().unwrap().push(call);
    }
}

impl ToolbarSurface for RecordingSurface {
    fn schedule_show(&self) {
        self.record(SurfaceCall::Show);
    }

    fn schedule_hide(&self) {
        self.record(SurfaceCall::Hide);
    }

    fn hide_immediately(&self) {
        self.record(SurfaceCall::HideNow);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderCall {
    Start(SessionId),
    Perform(SessionId),
}

/// Debugger backend that records calls and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingProvider {
    calls: Mutex<Vec<ProviderCall>>,
    fail_perform: bool,
}

impl RecordingProvider {
    pub fn failing() -> Self {
        Self {
            fail_perform: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl HotSwapProvider for RecordingProvider {
    fn on_start(&self, session: SessionId) -> eyre::Result<()> {
        self.calls.lock().unwrap().push(ProviderCall::Start(session));
        Ok(())
    }

    fn perform_hot_swap(&self, _context: &DataContext, session: SessionId) -> eyre::Result<()> {
        self.calls.lock().unwrap().push(ProviderCall::Perform(session));
        if self.fail_perform {
            eyre::bail!("hot swap failed: incompatible class change");
        }
        Ok(())
    }
}

pub type TestSession = DebugSession<RecordingProvider>;

/// A session with a recording provider and a fresh scope
pub fn test_session() -> Arc<TestSession> {
    Arc::new(DebugSession::new(RecordingProvider::default()))
}

/// Erase the concrete session type, as a debugger backend would
pub fn erased(session: &Arc<TestSession>) -> Arc<dyn HotSwapSession> {
    session.clone()
}

