use std::sync::Arc;

use crate::{
    action::{ActionGroup, HotSwapAction},
    manager::HotSwapChangesListener,
    session::HotSwapSession,
    status::{StatusEvent, VisibilityDecision},
    surface::{SurfaceAdapter, ToolbarSurface},
    ui::UiHandle,
};

/// Keeps one floating toolbar in sync with the hot-swap status of the project's sessions.
///
/// Status changes may arrive on any thread. The action state is updated and the matching
/// toolbar call is posted to the UI thread while the state lock is held, so toolbar calls reach
/// the UI in the same order as the state changes that caused them.
pub struct VisibilityController {
    action: Arc<HotSwapAction>,
    group: ActionGroup,
    surface: SurfaceAdapter,
}

impl VisibilityController {
    pub fn new(surface: Arc<dyn ToolbarSurface>, ui: UiHandle) -> Self {
        let action = Arc::new(HotSwapAction::new());
        Self {
            group: ActionGroup::new(action.clone()),
            action,
            surface: SurfaceAdapter::new(surface, ui),
        }
    }

    pub fn action(&self) -> &Arc<HotSwapAction> {
        &self.action
    }

    pub fn action_group(&self) -> &ActionGroup {
        &self.group
    }

    #[tracing::instrument(skip(self, session), fields(session = %session.id()))]
    pub fn handle_status(&self, session: &Arc<dyn HotSwapSession>, status: StatusEvent) {
        if status == StatusEvent::InProgress {
            // visibility stays as is while the swap runs, only the appearance changes
            self.action.update(|state| state.in_progress = true);
            return;
        }

        let decision = VisibilityDecision::for_status(status);
        // posting under the state lock keeps concurrent deliveries from reordering the
        // toolbar calls relative to the state they belong to
        self.action.update(|state| {
            match status {
                StatusEvent::ChangesReady => {
                    state.in_progress = false;
                    state.active_session = Some(session.clone());
                }
                StatusEvent::NoChanges => {
                    state.in_progress = false;
                    state.active_session = None;
                }
                StatusEvent::SessionCompleted => state.active_session = None,
                StatusEvent::InProgress => unreachable!("unexpected status {status}"),
            }
            self.surface.dispatch(decision, session.scope());
        });
    }
}

impl HotSwapChangesListener for VisibilityController {
    fn on_status_changed(&self, session: &Arc<dyn HotSwapSession>, status: StatusEvent) {
        self.handle_status(session, status);
    }
}
