use std::sync::Arc;

use crate::{
    session::SessionScope,
    status::VisibilityDecision,
    ui::{DispatchMode, UiHandle},
};

/// Host provided floating toolbar.
///
/// Implementations may animate or defer `schedule_show` and `schedule_hide`.
/// `hide_immediately` must bypass any pending animation.
pub trait ToolbarSurface: Send + Sync {
    fn schedule_show(&self);
    fn schedule_hide(&self);
    fn hide_immediately(&self);
}

/// Marshals visibility decisions onto the UI thread
#[derive(Clone)]
pub struct SurfaceAdapter {
    surface: Arc<dyn ToolbarSurface>,
    ui: UiHandle,
}

impl SurfaceAdapter {
    pub fn new(surface: Arc<dyn ToolbarSurface>, ui: UiHandle) -> Self {
        Self { surface, ui }
    }

    /// Schedule `decision` within the session scope.
    ///
    /// Hides are posted atomically so the control does not outlive a session that was torn down
    /// before the task ran.
    pub fn dispatch(&self, decision: VisibilityDecision, scope: &SessionScope) {
        let mode = if decision.is_hide() {
            DispatchMode::Atomic
        } else {
            DispatchMode::Cancellable
        };
        tracing::debug!(?decision, ?mode, "dispatching to toolbar");

        let surface = self.surface.clone();
        self.ui.post_in_scope(scope, mode, move || match decision {
            VisibilityDecision::Show => surface.schedule_show(),
            VisibilityDecision::Hide => surface.schedule_hide(),
            VisibilityDecision::HideNow => surface.hide_immediately(),
        });
    }
}
