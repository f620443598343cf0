//! Entry point used by the host to attach the hot-swap toolbar to editor surfaces.
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    context::DataContext,
    controller::VisibilityController,
    manager::{SessionManagers, Subscription},
    surface::ToolbarSurface,
    ui::UiHandle,
};

pub struct FloatingToolbarProvider {
    enabled: bool,
    managers: Arc<SessionManagers>,
    ui: UiHandle,
}

impl FloatingToolbarProvider {
    pub fn new(settings: &config::Settings, managers: Arc<SessionManagers>, ui: UiHandle) -> Self {
        Self {
            enabled: settings.hotswap.floating_toolbar,
            managers,
            ui,
        }
    }

    /// The toolbar is shown and hidden by session status only
    pub fn auto_hideable(&self) -> bool {
        false
    }

    pub fn is_applicable(&self, context: &DataContext) -> bool {
        self.enabled && context.is_inside_main_editor()
    }

    /// Attach a controller for `surface` to the session manager of the context's project.
    ///
    /// Returns `None` when the context has no project. The controller stays registered until
    /// `disposal` is cancelled.
    pub fn register(
        &self,
        context: &DataContext,
        surface: Arc<dyn ToolbarSurface>,
        disposal: &CancellationToken,
    ) -> Option<Registration> {
        let Some(project) = &context.project else {
            tracing::debug!("no project in context, not registering");
            return None;
        };

        let manager = self.managers.get_or_create(project);
        let controller = Arc::new(VisibilityController::new(surface, self.ui.clone()));
        let subscription = manager.add_listener(controller.clone(), disposal);
        tracing::debug!(%project, subscription = subscription.id(), "hot swap toolbar registered");

        Some(Registration {
            controller,
            subscription,
        })
    }
}

/// A toolbar attached to a session manager
pub struct Registration {
    pub controller: Arc<VisibilityController>,
    pub subscription: Subscription,
}

#[cfg(test)]
mod tests {
    use crate::{
        context::{Place, ProjectId},
        ui::UiContext,
    };

    use super::*;

    struct NoopSurface;

    impl ToolbarSurface for NoopSurface {
        fn schedule_show(&self) {}
        fn schedule_hide(&self) {}
        fn hide_immediately(&self) {}
    }

    fn provider(enabled: bool) -> (FloatingToolbarProvider, Arc<SessionManagers>, UiContext) {
        let mut settings = config::Settings::default();
        settings.hotswap.floating_toolbar = enabled;
        let managers = Arc::new(SessionManagers::new());
        let ui = UiContext::new();
        let provider = FloatingToolbarProvider::new(&settings, managers.clone(), ui.handle());
        (provider, managers, ui)
    }

    #[test]
    fn applicable_only_in_main_editor() {
        let (provider, _, _ui) = provider(true);
        assert!(provider.is_applicable(&DataContext::main_editor(ProjectId::new("p"))));

        let diff = DataContext {
            project: Some(ProjectId::new("p")),
            place: Place::DiffViewer,
        };
        assert!(!provider.is_applicable(&diff));
        assert!(!provider.auto_hideable());
    }

    #[test]
    fn disabled_by_settings() {
        let (provider, _, _ui) = provider(false);
        assert!(!provider.is_applicable(&DataContext::main_editor(ProjectId::new("p"))));
    }

    #[test]
    fn register_without_project_is_skipped() {
        let (provider, _, _ui) = provider(true);
        let registration = provider.register(
            &DataContext::default(),
            Arc::new(NoopSurface),
            &CancellationToken::new(),
        );
        assert!(registration.is_none());
    }

    #[test]
    fn register_attaches_listener_until_disposed() {
        let (provider, managers, _ui) = provider(true);
        let project = ProjectId::new("p");
        let disposal = CancellationToken::new();

        let registration = provider
            .register(
                &DataContext::main_editor(project.clone()),
                Arc::new(NoopSurface),
                &disposal,
            )
            .unwrap();
        let manager = managers.get(&project).unwrap();
        assert_eq!(manager.listener_count(), 1);
        assert!(registration.subscription.is_active());

        disposal.cancel();
        assert_eq!(manager.listener_count(), 0);
    }
}
