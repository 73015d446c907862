//! The demo wiring drives the engine from "connect your channel" through
//! processing to the dashboard, and the console renderer prints each step.

use std::path::PathBuf;
use std::time::Duration;

use lf_app::ReadinessEngine;
use lf_core::{DisplayState, ReadinessConfig, RouteKind};
use liftlio_lib::bootstrap::{demo, wire_demo};
use liftlio_lib::renderer::ConsoleRenderer;

#[tokio::test(start_paused = true)]
async fn demo_pipeline_reaches_dashboard() {
    let config = ReadinessConfig::with_defaults(PathBuf::new());
    let wiring = wire_demo();
    let project_id = demo::seed(&wiring.backend);
    let pipeline = demo::spawn_pipeline(
        wiring.backend.clone(),
        project_id.clone(),
        config.stages.ready_stage,
        Duration::from_secs(2),
    );

    let handle = ReadinessEngine::new(wiring.deps, &config).mount(RouteKind::Protected, None);
    let mut renderer = ConsoleRenderer::new(Vec::new(), config.stage_catalog());
    let mut views = handle.watch();

    loop {
        let view = views.borrow_and_update().clone();
        renderer.render(&view).unwrap();
        if !view.is_resolving && view.display == Some(DisplayState::Dashboard) {
            assert_eq!(view.project, Some(project_id.clone()));
            break;
        }
        views.changed().await.unwrap();
    }

    handle.unmount().await.unwrap();
    pipeline.abort();

    let output = String::from_utf8(renderer.into_inner()).unwrap();
    assert!(output.contains("Connect your YouTube channel"));
    assert!(output.contains("Setting up:"));
    assert!(output.contains("project 1: Dashboard"));
}

#[tokio::test(start_paused = true)]
async fn public_route_without_session_shows_dashboard() {
    let config = ReadinessConfig::with_defaults(PathBuf::new());
    let wiring = wire_demo();

    let handle = ReadinessEngine::new(wiring.deps, &config).mount(RouteKind::Public, None);
    let view = handle
        .wait_for(|view| !view.is_resolving && view.display.is_some())
        .await
        .unwrap();

    assert_eq!(view.display, Some(DisplayState::Dashboard));
    handle.unmount().await.unwrap();
}
