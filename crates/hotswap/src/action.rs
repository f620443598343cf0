//! The "apply changes" control hosted in the floating toolbar.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{context::DataContext, session::HotSwapSession};

/// Localization key of the label shown next to the button
pub const CODE_CHANGED_LABEL: &str = "hotswap.code.changed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    /// Static "ready to rebuild" icon
    Rebuild,
    /// Animated busy spinner
    Busy,
}

/// Appearance of the control, written by [`HotSwapAction::render`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub enabled: bool,
    pub icon: Option<Icon>,
    pub disabled_icon: Option<Icon>,
    pub label_key: &'static str,
}

impl Default for Presentation {
    fn default() -> Self {
        Self {
            enabled: true,
            icon: None,
            disabled_icon: None,
            label_key: CODE_CHANGED_LABEL,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActionState {
    pub in_progress: bool,
    pub active_session: Option<Arc<dyn HotSwapSession>>,
}

/// User triggerable hot swap.
///
/// State is only written by the visibility controller and read by the UI thread.
#[derive(Default)]
pub struct HotSwapAction {
    state: Mutex<ActionState>,
}

impl HotSwapAction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ActionState {
        self.lock().clone()
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut ActionState)) {
        f(&mut self.lock());
    }

    /// Apply the pending changes to the active session.
    ///
    /// A click that arrives after the control was hidden finds no active session and does
    /// nothing. Errors from the session are returned as-is.
    #[tracing::instrument(skip_all)]
    pub fn activate(&self, context: &DataContext) -> eyre::Result<()> {
        // release the lock before calling into the session
        let Some(session) = self.lock().active_session.clone() else {
            tracing::warn!("no active session, ignoring activation");
            return Ok(());
        };

        tracing::debug!(session = %session.id(), "activating hot swap");
        session.start_hot_swap()?;
        session.perform_hot_swap(context)?;
        Ok(())
    }

    pub fn render(&self, presentation: &mut Presentation) {
        let in_progress = self.lock().in_progress;

        presentation.enabled = !in_progress;
        let icon = if in_progress { Icon::Busy } else { Icon::Rebuild };
        presentation.icon = Some(icon);
        // keep the spinner animating while disabled
        presentation.disabled_icon = Some(icon);
    }

    fn lock(&self) -> MutexGuard<'_, ActionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Actions shown by the floating toolbar
pub struct ActionGroup {
    actions: Vec<Arc<HotSwapAction>>,
}

impl ActionGroup {
    pub fn new(action: Arc<HotSwapAction>) -> Self {
        Self {
            actions: vec![action],
        }
    }

    pub fn actions(&self) -> &[Arc<HotSwapAction>] {
        &self.actions
    }
}
