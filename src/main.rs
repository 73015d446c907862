use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use lf_app::{ReadinessEngine, ReadinessHandle};
use lf_core::{DisplayState, ProjectId, ReadinessConfig, RouteKind, StageCatalog};
use liftlio_lib::bootstrap::{
    self, apply_env_overrides, demo, load_config, resolve_state_dir, wire_demo, wire_http,
};
use liftlio_lib::console::{parse_command, ConsoleCommand, HELP};
use liftlio_lib::renderer::ConsoleRenderer;
use tokio::sync::mpsc;
use tracing::{info, warn};

const DEMO_STEP: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "liftlio-readiness")]
#[command(about = "Shows which screen a project is ready for and follows it live")]
#[command(version)]
struct Args {
    /// TOML config file; built-in defaults apply when omitted
    #[arg(short, long, env = "LIFTLIO_CONFIG")]
    config: Option<PathBuf>,

    /// Project to select instead of the remembered one
    #[arg(short, long)]
    project: Option<String>,

    /// Treat the page as public: no sign-in required
    #[arg(long)]
    public_route: bool,

    /// Run against an in-memory backend with a scripted pipeline
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(err) = bootstrap::tracing::init_tracing_subscriber() {
        eprintln!("Failed to initialize tracing: {err}");
    }

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ReadinessConfig::with_defaults(PathBuf::new()),
    };
    apply_env_overrides(&mut config)?;
    resolve_state_dir(&mut config)?;

    let route = if args.public_route {
        RouteKind::Public
    } else {
        RouteKind::Protected
    };

    let mut pipeline = None;
    let deps = if args.demo {
        let wiring = wire_demo();
        let project_id = demo::seed(&wiring.backend);
        pipeline = Some(demo::spawn_pipeline(
            wiring.backend.clone(),
            project_id,
            config.stages.ready_stage,
            DEMO_STEP,
        ));
        wiring.deps
    } else {
        wire_http(&config).context("Failed to wire hosted backend")?
    };

    info!(demo = args.demo, ?route, "mounting readiness engine");
    let handle = ReadinessEngine::new(deps, &config).mount(route, args.project.map(ProjectId::from));

    let result = run_console(&handle, config.stage_catalog(), args.demo).await;

    if let Err(err) = handle.unmount().await {
        warn!(error = %err, "engine already stopped");
    }
    if let Some(pipeline) = pipeline {
        pipeline.abort();
    }
    result
}

/// Render every view change and forward stdin commands to the engine until
/// quit, ctrl-c, or (in demo mode) the dashboard is reached.
async fn run_console(
    handle: &ReadinessHandle,
    catalog: StageCatalog,
    exit_on_dashboard: bool,
) -> Result<()> {
    let mut renderer = ConsoleRenderer::new(io::stdout(), catalog);
    let mut views = handle.watch();
    let mut commands = spawn_stdin_reader();
    eprintln!("{HELP}");

    loop {
        let view = views.borrow_and_update().clone();
        renderer.render(&view).context("Failed to write to stdout")?;
        if exit_on_dashboard && !view.is_resolving && view.display == Some(DisplayState::Dashboard)
        {
            break;
        }

        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            Some(line) = commands.recv() => {
                match parse_command(&line) {
                    Some(ConsoleCommand::Quit) => break,
                    Some(ConsoleCommand::Retry) => handle.retry().await?,
                    Some(ConsoleCommand::Select(project_id)) => {
                        handle.select_project(project_id).await?
                    }
                    Some(ConsoleCommand::ReloadProjects) => handle.reload_projects().await?,
                    None => eprintln!("{HELP}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                break;
            }
        }
    }
    Ok(())
}

/// Blocking stdin reads live on their own thread so the runtime can shut
/// down while a read is pending.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(8);
    std::thread::spawn(move || {
        for line in io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}
