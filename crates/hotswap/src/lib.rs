//! Floating "code changed" toolbar for hot-swap capable debug sessions
mod action;
mod context;
mod controller;
mod manager;
mod provider;
mod session;
mod status;
mod surface;
mod ui;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use action::{ActionGroup, ActionState, CODE_CHANGED_LABEL, HotSwapAction, Icon, Presentation};
pub use context::{DataContext, Place, ProjectId};
pub use controller::VisibilityController;
pub use manager::{
    HotSwapChangesListener, SessionManager, SessionManagers, StatusReceiver, StatusSender,
    StatusUpdate, Subscription, status_channel,
};
pub use provider::{FloatingToolbarProvider, Registration};
pub use session::{DebugSession, HotSwapProvider, HotSwapSession, SessionId, SessionScope};
pub use status::{StatusEvent, VisibilityDecision};
pub use surface::{SurfaceAdapter, ToolbarSurface};
pub use ui::{DispatchMode, UiContext, UiHandle};

pub use tokio_util::sync::CancellationToken;
