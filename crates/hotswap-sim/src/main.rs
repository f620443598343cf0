//! Drive the hot-swap toolbar from a scripted debug session.
//!
//! A tokio worker plays the role of the debugger and reports status changes, while the main
//! thread acts as the UI thread: it runs queued toolbar calls, renders the action and optionally
//! clicks it whenever changes are ready.
use std::{io::IsTerminal, path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use eyre::WrapErr;
use hotswap::{
    CancellationToken, DataContext, DebugSession, FloatingToolbarProvider, HotSwapProvider,
    HotSwapSession, Presentation, ProjectId, SessionId, SessionManagers, StatusEvent,
    ToolbarSurface, UiContext, status_channel,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_SCRIPT: &str = "changes-ready,in-progress,no-changes,changes-ready,session-completed";

#[derive(Parser)]
struct Args {
    /// Comma separated status sequence reported by the session
    #[clap(short, long, default_value = DEFAULT_SCRIPT)]
    script: String,

    /// Settings file, defaults to the user configuration
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Click the toolbar button whenever changes are ready
    #[clap(short, long)]
    activate: bool,

    /// Delay between status changes in milliseconds
    #[clap(short, long, default_value_t = 50)]
    delay: u64,

    /// Emit logs as JSON
    #[clap(long)]
    json: bool,
}

/// Toolbar that reports calls to the log
struct ConsoleSurface;

impl ToolbarSurface for ConsoleSurface {
    fn schedule_show(&self) {
        tracing::info!("toolbar: show");
    }

    fn schedule_hide(&self) {
        tracing::info!("toolbar: hide");
    }

    fn hide_immediately(&self) {
        tracing::info!("toolbar: hide immediately");
    }
}

/// Debugger backend that pretends to reload classes
struct SimulatedBackend;

impl HotSwapProvider for SimulatedBackend {
    fn perform_hot_swap(&self, context: &DataContext, session: SessionId) -> eyre::Result<()> {
        let project = context
            .project
            .as_ref()
            .ok_or_else(|| eyre::eyre!("no project to reload"))?;
        tracing::info!(%project, %session, "reloading changed classes");
        Ok(())
    }
}

fn parse_script(script: &str) -> eyre::Result<Vec<StatusEvent>> {
    script
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<StatusEvent>())
        .collect::<eyre::Result<Vec<_>>>()
        .wrap_err("parsing status script")
}

fn init_logging(json: bool) {
    let in_ci = std::env::var("CI")
        .map(|val| val == "true")
        .unwrap_or(false);

    if !json && (std::io::stderr().is_terminal() || in_ci) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .json()
            .try_init();
    }
}

fn main() -> eyre::Result<()> {
    let args = Args::parse();
    init_logging(args.json);
    let _ = color_eyre::install();

    let script = parse_script(&args.script)?;
    let settings = match &args.config {
        Some(path) => config::Settings::load_from(path)?,
        None => config::Settings::load().wrap_err("loading user settings")?,
    };

    let runtime = tokio::runtime::Runtime::new().wrap_err("creating tokio runtime")?;
    let managers = Arc::new(SessionManagers::with_runtime(runtime.handle().clone()));
    let ui = UiContext::new();
    let provider = FloatingToolbarProvider::new(&settings, managers.clone(), ui.handle());

    let project = ProjectId::new("sim");
    let context = DataContext::main_editor(project.clone());
    if !provider.is_applicable(&context) {
        tracing::info!("floating toolbar disabled, nothing to do");
        return Ok(());
    }

    let disposal = CancellationToken::new();
    let registration = provider
        .register(&context, Arc::new(ConsoleSurface), &disposal)
        .ok_or_else(|| eyre::eyre!("toolbar could not be registered"))?;
    let action = registration.controller.action().clone();

    let (status_tx, status_rx) = status_channel();
    // the UI thread reports the simulated backend's progress through the same channel
    let mut ui_status_tx = Some(status_tx.clone());
    let manager = managers.get_or_create(&project);

    let forwarder = {
        let manager = manager.clone();
        runtime.spawn(async move { manager.forward(status_rx).await })
    };

    let delay = Duration::from_millis(args.delay);
    let script_runner = runtime.spawn(async move {
        let session: Arc<dyn HotSwapSession> = Arc::new(DebugSession::new(SimulatedBackend));
        tracing::info!(session = %session.id(), "debug session started");

        for status in script {
            tokio::time::sleep(delay).await;
            if status == StatusEvent::SessionCompleted {
                session.scope().cancel();
            }
            if let Err(e) = status_tx.send(&session, status) {
                tracing::warn!(error = %e, "could not report status");
                break;
            }
        }
        tracing::debug!("script finished");
    });

    let mut last_rendered = None;
    let mut clicked = false;
    loop {
        ui.run_until_idle(Duration::from_millis(20))?;

        let mut presentation = Presentation::default();
        action.render(&mut presentation);
        if last_rendered.as_ref() != Some(&presentation) {
            tracing::info!(
                enabled = presentation.enabled,
                icon = ?presentation.icon,
                "action rendered"
            );
            last_rendered = Some(presentation);
        }

        let state = action.state();
        match (&state.active_session, &ui_status_tx) {
            (None, _) => clicked = false,
            (Some(session), Some(tx)) if args.activate && !clicked && !state.in_progress => {
                clicked = true;
                match action.activate(&context) {
                    // the simulated backend finishes instantly
                    Ok(()) => {
                        for status in [StatusEvent::InProgress, StatusEvent::NoChanges] {
                            if let Err(e) = tx.send(session, status) {
                                tracing::warn!(error = %e, "could not report status");
                            }
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "hot swap failed"),
                }
            }
            _ => {}
        }

        if script_runner.is_finished() {
            // lets the forwarder see the channel close
            ui_status_tx = None;
        }
        if forwarder.is_finished() && ui.pending() == 0 {
            break;
        }
    }

    disposal.cancel();
    tracing::info!(listeners = manager.listener_count(), "simulation finished");
    Ok(())
}
