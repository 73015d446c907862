//! # Readiness engine / 就绪引擎
//!
//! Single consumer event loop that turns identity, project status, push
//! notifications and poll ticks into one published [`ReadinessView`].
//!
//! ## Producers / 生产者
//! - Handle commands (select, retry, reload, unmount)
//! - Probe completions
//! - Debounced push notices
//! - Poll ticks and settle timers
//!
//! Only the loop writes the transition guard, the selection and the view.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use lf_core::config::ReadinessConfig;
use lf_core::ports::{Identity, ProbeError, ProjectSummary};
use lf_core::readiness::{BeginOutcome, ProbeOrigin, TransitionTicket};
use lf_core::{
    AuthState, DisplayState, ProjectId, ProjectSnapshot, ReadinessView, ResolverInput, RouteKind,
    Stage, StateResolver, TransitionGuard,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, info_span, warn, Instrument};

use super::cache::{CacheGuard, CacheKey};
use super::debounce::Debouncer;
use super::polling::PollingFallback;
use super::probe::StatusProbe;
use super::push::{PushEvent, PushNotice, RealtimePushListener};
use super::retry::RetryPolicy;
use crate::deps::ReadinessDeps;

const COMMAND_BUFFER: usize = 16;
const SIGNAL_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("readiness engine is no longer mounted")]
    Unmounted,
}

enum EngineCommand {
    Select(ProjectId),
    Retry,
    ReloadProjects,
    Unmount { ack: oneshot::Sender<()> },
}

/// Internal event channel. Probes, pushes and timers are producers; the
/// loop is the only consumer.
enum EngineSignal {
    ProbeCompleted {
        ticket: TransitionTicket,
        origin: ProbeOrigin,
        result: Result<ProjectSnapshot, ProbeError>,
    },
    Push(Vec<PushNotice>),
    PollTick {
        project_id: ProjectId,
    },
    SettleElapsed {
        ticket: TransitionTicket,
    },
}

#[derive(Debug, Clone, Copy)]
struct EngineTiming {
    poll_interval: Duration,
    settle: Duration,
    push_debounce: Duration,
}

/// Decision engine for one mounted session.
/// 单个挂载会话的决策引擎。
pub struct ReadinessEngine {
    deps: ReadinessDeps,
    resolver: StateResolver,
    probe: Arc<StatusProbe>,
    cache: Arc<CacheGuard>,
    retry: RetryPolicy,
    probe_timeout: Duration,
    timing: EngineTiming,
}

impl ReadinessEngine {
    pub fn new(deps: ReadinessDeps, config: &ReadinessConfig) -> Self {
        let catalog = config.stage_catalog();
        let retry = RetryPolicy::from_config(&config.retry);
        let probe_timeout = Duration::from_millis(config.timing.probe_timeout_ms);

        let decision = if config.backend.prefer_combined_decision {
            deps.decision.clone()
        } else {
            None
        };
        let probe = StatusProbe::new(
            deps.status.clone(),
            deps.output.clone(),
            deps.integrations.clone(),
            catalog.clone(),
            probe_timeout,
            retry,
        )
        .with_decision(decision);

        let cache = CacheGuard::new(
            Duration::from_millis(config.timing.cache_ttl_ms),
            deps.clock.clone(),
        );

        Self {
            resolver: StateResolver::new(catalog),
            probe: Arc::new(probe),
            cache: Arc::new(cache),
            retry,
            probe_timeout,
            timing: EngineTiming {
                poll_interval: Duration::from_millis(config.timing.poll_interval_ms),
                settle: Duration::from_millis(config.timing.transition_settle_ms),
                push_debounce: Duration::from_millis(config.timing.push_debounce_ms),
            },
            deps,
        }
    }

    /// Start the event loop. `requested` wins over the remembered selection
    /// when it is one of the user's projects.
    pub fn mount(self, route: RouteKind, requested: Option<ProjectId>) -> ReadinessHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_BUFFER);
        let (view_tx, view_rx) = watch::channel(ReadinessView::resolving());

        let debouncer = Arc::new(Debouncer::spawn(
            self.timing.push_debounce,
            signal_tx.clone(),
            EngineSignal::Push,
        ));
        let listener = RealtimePushListener::new(
            self.deps.realtime.clone(),
            self.resolver.catalog().clone(),
        );

        let event_loop = EngineLoop {
            engine: self,
            route,
            requested,
            auth: AuthState::SignedOut,
            projects: Vec::new(),
            listing_failed: false,
            integration_history: HashSet::new(),
            guard: TransitionGuard::new(),
            last_probe: None,
            pending_refresh: false,
            listener,
            polling: PollingFallback::new(view_rx.clone()),
            debouncer,
            view_tx,
            signal_tx,
            signal_rx,
            command_rx,
            shutting_down: false,
        };

        let span = info_span!("usecase.readiness.engine", route = ?route);
        tokio::spawn(event_loop.run().instrument(span));

        ReadinessHandle {
            commands: command_tx,
            view: view_rx,
        }
    }
}

/// Cloneable handle to a mounted engine.
/// 已挂载引擎的可克隆句柄。
#[derive(Clone)]
pub struct ReadinessHandle {
    commands: mpsc::Sender<EngineCommand>,
    view: watch::Receiver<ReadinessView>,
}

impl ReadinessHandle {
    pub async fn select_project(&self, project_id: ProjectId) -> Result<(), EngineError> {
        self.send(EngineCommand::Select(project_id)).await
    }

    /// Manual retry from the error screen: opens a fresh transition for the
    /// current project, or re-runs the whole bootstrap when there is none.
    pub async fn retry(&self) -> Result<(), EngineError> {
        self.send(EngineCommand::Retry).await
    }

    /// Re-list the user's projects, e.g. after one was created.
    pub async fn reload_projects(&self) -> Result<(), EngineError> {
        self.send(EngineCommand::ReloadProjects).await
    }

    /// Stop polling, drop the realtime subscription and discard every
    /// in-flight probe. Returns once the loop has shut down.
    pub async fn unmount(&self) -> Result<(), EngineError> {
        let (ack, done) = oneshot::channel();
        self.send(EngineCommand::Unmount { ack }).await?;
        done.await.map_err(|_| EngineError::Unmounted)
    }

    pub fn watch(&self) -> watch::Receiver<ReadinessView> {
        self.view.clone()
    }

    pub fn current(&self) -> ReadinessView {
        self.view.borrow().clone()
    }

    /// Wait until the published view satisfies `predicate`.
    pub async fn wait_for<F>(&self, predicate: F) -> Result<ReadinessView, EngineError>
    where
        F: FnMut(&ReadinessView) -> bool,
    {
        let mut view = self.view.clone();
        let matched = view
            .wait_for(predicate)
            .await
            .map_err(|_| EngineError::Unmounted)?;
        Ok(matched.clone())
    }

    async fn send(&self, command: EngineCommand) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::Unmounted)
    }
}

struct EngineLoop {
    engine: ReadinessEngine,
    route: RouteKind,
    requested: Option<ProjectId>,

    auth: AuthState,
    projects: Vec<ProjectSummary>,
    listing_failed: bool,
    /// Projects seen with at least one integration row during this mount.
    integration_history: HashSet<ProjectId>,
    guard: TransitionGuard,
    /// Final probe outcome for the current project.
    last_probe: Option<Result<ProjectSnapshot, ProbeError>>,
    /// A push arrived for the incoming project while the window was open.
    pending_refresh: bool,

    listener: RealtimePushListener,
    polling: PollingFallback,
    debouncer: Arc<Debouncer<PushNotice>>,

    view_tx: watch::Sender<ReadinessView>,
    signal_tx: mpsc::Sender<EngineSignal>,
    signal_rx: mpsc::Receiver<EngineSignal>,
    command_rx: mpsc::Receiver<EngineCommand>,
    shutting_down: bool,
}

impl EngineLoop {
    async fn run(mut self) {
        self.bootstrap().await;

        while !self.shutting_down {
            tokio::select! {
                Some(signal) = self.signal_rx.recv() => {
                    self.handle_signal(signal).await;
                }
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("all handles dropped, unmounting");
                        self.teardown().await;
                    }
                },
            }
        }
        info!("readiness engine stopped");
    }

    async fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Select(project_id) => {
                if !self.is_listed(&project_id) {
                    warn!(project_id = %project_id, "ignoring selection of unlisted project");
                    return;
                }
                self.select(project_id).await;
            }
            EngineCommand::Retry => self.retry().await,
            EngineCommand::ReloadProjects => self.reload_projects().await,
            EngineCommand::Unmount { ack } => {
                self.teardown().await;
                let _ = ack.send(());
            }
        }
    }

    async fn handle_signal(&mut self, signal: EngineSignal) {
        match signal {
            EngineSignal::ProbeCompleted {
                ticket,
                origin,
                result,
            } => self.on_probe_completed(ticket, origin, result).await,
            EngineSignal::Push(notices) => self.on_push(notices),
            EngineSignal::PollTick { project_id } => self.on_poll_tick(project_id),
            EngineSignal::SettleElapsed { ticket } => self.on_settle_elapsed(ticket),
        }
    }

    /// Identity, then project list, then the initial selection.
    async fn bootstrap(&mut self) {
        self.publish(None, None, true);

        self.auth = match self.read_identity().await {
            Ok(Some(identity)) => AuthState::SignedIn(identity),
            Ok(None) => AuthState::SignedOut,
            Err(ProbeError::AuthExpired) => AuthState::Expired,
            Err(err) => AuthState::Unavailable(err),
        };

        let Some(identity) = self.auth.identity().cloned() else {
            info!("no authenticated user");
            self.publish_resolved(None);
            return;
        };

        if !self.list_projects(&identity).await {
            return;
        }

        let stored = match self.engine.deps.selection.load_selection().await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "failed to load remembered project");
                None
            }
        };

        match choose_project(&self.projects, self.requested.as_ref(), stored) {
            Some(project_id) => self.select(project_id).await,
            None => self.show_without_project().await,
        }
    }

    /// Refresh the project list. Returns false when listing failed; the
    /// error (or login) view is already published.
    async fn list_projects(&mut self, identity: &Identity) -> bool {
        let directory = self.engine.deps.directory.clone();
        let timeout = self.engine.probe_timeout;
        let listed = self
            .engine
            .retry
            .run("list_projects", || {
                bounded(timeout, directory.list_projects(identity))
            })
            .await;

        match listed {
            Ok(projects) => {
                debug!(count = projects.len(), "projects listed");
                self.listing_failed = false;
                self.projects = projects;
                true
            }
            Err(ProbeError::AuthExpired) => {
                self.expire_session().await;
                false
            }
            Err(err) => {
                warn!(error = %err, "failed to list projects");
                self.listing_failed = true;
                self.projects.clear();
                self.last_probe = Some(Err(err));
                self.publish_resolved(None);
                false
            }
        }
    }

    async fn read_identity(&self) -> Result<Option<Identity>, ProbeError> {
        let identity = self.engine.deps.identity.clone();
        let timeout = self.engine.probe_timeout;
        self.engine
            .retry
            .run("current_identity", || {
                bounded(timeout, identity.current_identity())
            })
            .await
    }

    async fn select(&mut self, project_id: ProjectId) {
        let ticket = match self.guard.begin(&project_id) {
            BeginOutcome::Started(ticket) => ticket,
            BeginOutcome::AlreadyCurrent => {
                debug!(project_id = %project_id, "already on project, selection ignored");
                return;
            }
        };

        self.polling.stop();
        self.pending_refresh = false;
        self.last_probe = None;

        if let Err(err) = self.engine.deps.selection.save_selection(&project_id).await {
            warn!(error = %err, "failed to remember selected project");
        }

        let known = self.engine.cache.known_stage(&project_id).await;
        match self.engine.cache.get(&project_id, known).await {
            Some(entry) => {
                debug!(project_id = %project_id, "switching to cached project");
                self.on_probe_completed(ticket.clone(), ProbeOrigin::Transition, Ok(entry.snapshot()))
                    .await;
            }
            None => {
                self.publish(Some(project_id.clone()), None, true);
                self.spawn_probe(ticket, ProbeOrigin::Transition, false, known);
            }
        }

        self.subscribe(&project_id).await;
    }

    async fn subscribe(&mut self, project_id: &ProjectId) {
        let debouncer = self.debouncer.clone();
        let subscribed = self
            .listener
            .subscribe(project_id, move |notice| debouncer.push(notice))
            .await;
        if let Err(err) = subscribed {
            warn!(project_id = %project_id, error = %err, "realtime unavailable, relying on polling");
        }
    }

    fn spawn_probe(
        &self,
        ticket: TransitionTicket,
        origin: ProbeOrigin,
        bypass_ttl: bool,
        stage: Option<Stage>,
    ) {
        let Some(identity) = self.auth.identity().cloned() else {
            return;
        };

        let cache = self.engine.cache.clone();
        let probe = self.engine.probe.clone();
        let signals = self.signal_tx.clone();
        let key = CacheKey::new(ticket.project_id.clone(), stage);

        debug!(
            project_id = %ticket.project_id,
            generation = ticket.generation,
            origin = ?origin,
            bypass_ttl,
            "probe requested"
        );

        tokio::spawn(async move {
            let project_id = ticket.project_id.clone();
            let result = cache
                .get_or_probe(key, bypass_ttl, move || {
                    async move { probe.probe_with_retry(&identity, &project_id).await }.boxed()
                })
                .await;
            // The loop may be gone; the result is then discarded.
            let _ = signals
                .send(EngineSignal::ProbeCompleted {
                    ticket,
                    origin,
                    result,
                })
                .await;
        });
    }

    async fn on_probe_completed(
        &mut self,
        ticket: TransitionTicket,
        origin: ProbeOrigin,
        result: Result<ProjectSnapshot, ProbeError>,
    ) {
        if !self.guard.admits(&ticket, origin) {
            debug!(
                project_id = %ticket.project_id,
                generation = ticket.generation,
                origin = ?origin,
                "discarding stale probe result"
            );
            return;
        }

        if matches!(result, Err(ProbeError::AuthExpired)) {
            self.expire_session().await;
            return;
        }

        if let Err(err) = &result {
            warn!(project_id = %ticket.project_id, error = %err, "probe failed");
        }
        let result = result.map(|snapshot| self.remember_integration(&ticket.project_id, snapshot));
        self.last_probe = Some(result);
        let display = self.publish_resolved(Some(ticket.project_id.clone()));

        if origin == ProbeOrigin::Transition {
            self.schedule_settle(ticket.clone());
        }

        if PollingFallback::while_unsettled(Some(&display)) {
            let signals = self.signal_tx.clone();
            self.polling.start(
                &ticket.project_id,
                self.engine.timing.poll_interval,
                PollingFallback::while_unsettled,
                move |project_id: &ProjectId| {
                    // A full queue already holds work that will re-probe.
                    let _ = signals.try_send(EngineSignal::PollTick {
                        project_id: project_id.clone(),
                    });
                },
            );
        } else {
            self.polling.stop();
        }
    }

    /// A disabled integration must not read as "never integrated" once the
    /// backend deletes its rows.
    fn remember_integration(
        &mut self,
        project_id: &ProjectId,
        mut snapshot: ProjectSnapshot,
    ) -> ProjectSnapshot {
        let seen_before = self.integration_history.contains(project_id);
        snapshot.integration = snapshot.integration.remembering(seen_before);
        if snapshot.integration.ever_had && !seen_before {
            self.integration_history.insert(project_id.clone());
        }
        snapshot
    }

    fn schedule_settle(&self, ticket: TransitionTicket) {
        let signals = self.signal_tx.clone();
        let settle = self.engine.timing.settle;
        tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            let _ = signals.send(EngineSignal::SettleElapsed { ticket }).await;
        });
    }

    fn on_settle_elapsed(&mut self, ticket: TransitionTicket) {
        if !self.guard.is_current(&ticket) || !self.guard.end(&ticket.project_id) {
            return;
        }
        if std::mem::take(&mut self.pending_refresh) {
            debug!(project_id = %ticket.project_id, "applying push deferred during transition");
            self.spawn_probe(ticket, ProbeOrigin::Push, true, None);
        }
    }

    fn on_push(&mut self, notices: Vec<PushNotice>) {
        let Some(current) = self.guard.current().cloned() else {
            return;
        };

        let mut refresh = false;
        let mut stage_hint = None;
        for notice in notices {
            if notice.project_id != current {
                debug!(project_id = %notice.project_id, "dropping push for abandoned project");
                continue;
            }
            if let PushEvent::StageUpdated { stage: Some(stage) } = notice.event {
                stage_hint = Some(stage);
            }
            refresh = true;
        }
        if !refresh {
            return;
        }

        if self.guard.is_active() {
            self.pending_refresh = true;
            return;
        }

        // Output existence is re-read even when the pushed stage says ready:
        // the push may race ahead of read-replica consistency.
        if let Some(ticket) = self.guard.ticket() {
            self.spawn_probe(ticket, ProbeOrigin::Push, true, stage_hint);
        }
    }

    fn on_poll_tick(&mut self, project_id: ProjectId) {
        if !self.guard.accepts_refresh(&project_id) {
            debug!(project_id = %project_id, "poll tick suppressed");
            return;
        }
        if let Some(ticket) = self.guard.ticket() {
            self.spawn_probe(ticket, ProbeOrigin::Poll, true, None);
        }
    }

    async fn retry(&mut self) {
        let current = self.guard.current().cloned();
        self.guard.clear();
        self.polling.stop();
        self.pending_refresh = false;
        self.last_probe = None;

        match current {
            Some(project_id) if self.auth.identity().is_some() => {
                info!(project_id = %project_id, "manual retry");
                self.engine.cache.invalidate(&project_id).await;
                self.select(project_id).await;
            }
            _ => {
                info!("manual retry, re-running bootstrap");
                if let Err(err) = self.listener.unsubscribe().await {
                    warn!(error = %err, "failed to unsubscribe before retry");
                }
                self.bootstrap().await;
            }
        }
    }

    async fn reload_projects(&mut self) {
        let Some(identity) = self.auth.identity().cloned() else {
            return;
        };
        if !self.list_projects(&identity).await {
            self.polling.stop();
            if let Err(err) = self.listener.unsubscribe().await {
                warn!(error = %err, "failed to unsubscribe after reload");
            }
            return;
        }

        let still_listed = self
            .guard
            .current()
            .is_some_and(|current| self.projects.iter().any(|p| &p.id == current));
        if !still_listed {
            self.guard.clear();
            match choose_project(&self.projects, self.requested.as_ref(), None) {
                Some(project_id) => self.select(project_id).await,
                None => self.show_without_project().await,
            }
        }
    }

    /// Nothing to select: drop per-project work and resolve without a probe.
    async fn show_without_project(&mut self) {
        self.guard.clear();
        self.polling.stop();
        self.pending_refresh = false;
        self.last_probe = None;
        if let Err(err) = self.listener.unsubscribe().await {
            warn!(error = %err, "failed to unsubscribe without a project");
        }
        self.publish_resolved(None);
    }

    /// The session was rejected: drop everything and show login.
    async fn expire_session(&mut self) {
        info!("session expired");
        self.auth = AuthState::Expired;
        self.guard.clear();
        self.polling.stop();
        self.pending_refresh = false;
        self.last_probe = None;
        if let Err(err) = self.listener.unsubscribe().await {
            warn!(error = %err, "failed to unsubscribe after session expiry");
        }
        self.publish_resolved(None);
    }

    async fn teardown(&mut self) {
        self.polling.stop();
        if let Err(err) = self.listener.unsubscribe().await {
            warn!(error = %err, "failed to unsubscribe on unmount");
        }
        self.guard.clear();
        self.pending_refresh = false;
        self.integration_history.clear();
        self.publish(None, None, false);
        self.shutting_down = true;
        info!("readiness engine unmounted");
    }

    fn is_listed(&self, project_id: &ProjectId) -> bool {
        self.projects.iter().any(|p| &p.id == project_id)
    }

    fn resolve(&self) -> DisplayState {
        self.engine.resolver.resolve(&ResolverInput {
            auth: &self.auth,
            route: self.route,
            has_projects: self.listing_failed || !self.projects.is_empty(),
            probe: self.last_probe.as_ref(),
        })
    }

    fn publish_resolved(&self, project: Option<ProjectId>) -> DisplayState {
        let display = self.resolve();
        self.publish(project, Some(display.clone()), false);
        display
    }

    /// Notify watchers only when the view actually changed.
    fn publish(&self, project: Option<ProjectId>, display: Option<DisplayState>, is_resolving: bool) {
        let next = ReadinessView {
            project,
            display,
            is_resolving,
        };
        let changed = self.view_tx.send_if_modified(|view| {
            if *view == next {
                false
            } else {
                *view = next.clone();
                true
            }
        });
        if changed {
            debug!(
                project_id = ?next.project.as_ref().map(ProjectId::as_str),
                display = ?next.display.as_ref().map(|d| d.component().as_str()),
                is_resolving = next.is_resolving,
                "view published"
            );
        }
    }
}

/// Requested project if listed, else the remembered one if listed, else the
/// first listed project.
fn choose_project(
    projects: &[ProjectSummary],
    requested: Option<&ProjectId>,
    stored: Option<ProjectId>,
) -> Option<ProjectId> {
    let listed = |id: &ProjectId| projects.iter().any(|p| &p.id == id);
    requested
        .filter(|id| listed(id))
        .cloned()
        .or_else(|| stored.filter(|id| listed(id)))
        .or_else(|| projects.first().map(|p| p.id.clone()))
}

async fn bounded<T, F>(timeout: Duration, read: F) -> Result<T, ProbeError>
where
    F: std::future::Future<Output = Result<T, ProbeError>>,
{
    tokio::time::timeout(timeout, read)
        .await
        .map_err(|_| ProbeError::Transient(format!("no response within {} ms", timeout.as_millis())))?
}
