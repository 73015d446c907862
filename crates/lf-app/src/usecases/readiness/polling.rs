//! Time-based re-probe while a project is still processing.

use std::time::Duration;

use lf_core::{DisplayState, ProjectId, ReadinessView};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

const MIN_INTERVAL: Duration = Duration::from_millis(10);

struct RunningPoll {
    project_id: ProjectId,
    task: JoinHandle<()>,
}

/// Ticks at a fixed interval for one project while `predicate` holds for
/// the published display state.
///
/// The predicate is re-checked before every tick against the latest
/// [`ReadinessView`]; the timer ends itself once it turns false or the view
/// moves to another project.
pub struct PollingFallback {
    view: watch::Receiver<ReadinessView>,
    running: Option<RunningPoll>,
}

impl PollingFallback {
    pub fn new(view: watch::Receiver<ReadinessView>) -> Self {
        Self {
            view,
            running: None,
        }
    }

    /// Default predicate: keep polling while unresolved or processing.
    pub fn while_unsettled(display: Option<&DisplayState>) -> bool {
        display.map_or(true, |display| !display.is_terminal())
    }

    /// Start ticking for `project_id`. Restarting for the project that is
    /// already being polled keeps the existing timer.
    pub fn start<P, T>(&mut self, project_id: &ProjectId, interval: Duration, predicate: P, on_tick: T)
    where
        P: Fn(Option<&DisplayState>) -> bool + Send + Sync + 'static,
        T: Fn(&ProjectId) + Send + Sync + 'static,
    {
        if self.is_running() && self.project() == Some(project_id) {
            return;
        }
        self.stop();

        let interval = interval.max(MIN_INTERVAL);
        let view = self.view.clone();
        let polled = project_id.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                let keep_polling = {
                    let view = view.borrow();
                    view.project.as_ref() == Some(&polled) && predicate(view.display.as_ref())
                };
                if !keep_polling {
                    debug!(project_id = %polled, "polling predicate no longer holds");
                    break;
                }
                on_tick(&polled);
            }
        });

        debug!(project_id = %project_id, interval_ms = interval.as_millis() as u64, "polling started");
        self.running = Some(RunningPoll {
            project_id: project_id.clone(),
            task,
        });
    }

    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.abort();
            debug!(project_id = %running.project_id, "polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    pub fn project(&self) -> Option<&ProjectId> {
        self.running.as_ref().map(|running| &running.project_id)
    }
}

impl Drop for PollingFallback {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lf_core::Stage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn processing() -> DisplayState {
        DisplayState::SetupProcessing {
            stage: Stage::new(2),
            message: "Analyzing channel and videos".into(),
            progress_percent: 28,
        }
    }

    fn view(project: &str, display: Option<DisplayState>) -> ReadinessView {
        ReadinessView {
            project: Some(ProjectId::from(project)),
            display,
            is_resolving: false,
        }
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&ProjectId) + Send + Sync + 'static) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let inner = ticks.clone();
        (ticks, move |_: &ProjectId| {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_while_processing() {
        let (_tx, rx) = watch::channel(view("58", Some(processing())));
        let mut polling = PollingFallback::new(rx);
        let (ticks, on_tick) = counter();

        polling.start(
            &ProjectId::from("58"),
            Duration::from_secs(5),
            PollingFallback::while_unsettled,
            on_tick,
        );
        tokio::time::sleep(Duration::from_millis(15_500)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(polling.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stops_once_display_is_terminal() {
        let (tx, rx) = watch::channel(view("58", Some(processing())));
        let mut polling = PollingFallback::new(rx);
        let (ticks, on_tick) = counter();

        polling.start(
            &ProjectId::from("58"),
            Duration::from_secs(5),
            PollingFallback::while_unsettled,
            on_tick,
        );
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        tx.send_replace(view("58", Some(DisplayState::Dashboard)));
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert!(!polling.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_pending_ticks() {
        let (_tx, rx) = watch::channel(view("58", None));
        let mut polling = PollingFallback::new(rx);
        let (ticks, on_tick) = counter();

        polling.start(
            &ProjectId::from("58"),
            Duration::from_secs(5),
            PollingFallback::while_unsettled,
            on_tick,
        );
        polling.stop();
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 0);
        assert!(!polling.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn view_moving_to_another_project_ends_polling() {
        let (tx, rx) = watch::channel(view("a", Some(processing())));
        let mut polling = PollingFallback::new(rx);
        let (ticks, on_tick) = counter();

        polling.start(
            &ProjectId::from("a"),
            Duration::from_secs(5),
            PollingFallback::while_unsettled,
            on_tick,
        );
        tx.send_replace(view("b", Some(processing())));
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_for_same_project_keeps_timer() {
        let (_tx, rx) = watch::channel(view("58", Some(processing())));
        let mut polling = PollingFallback::new(rx);
        let (ticks, on_tick) = counter();
        let on_tick = Arc::new(on_tick);

        let first = on_tick.clone();
        polling.start(
            &ProjectId::from("58"),
            Duration::from_secs(5),
            PollingFallback::while_unsettled,
            move |id: &ProjectId| first(id),
        );
        tokio::time::sleep(Duration::from_secs(3)).await;
        let second = on_tick.clone();
        polling.start(
            &ProjectId::from("58"),
            Duration::from_secs(5),
            PollingFallback::while_unsettled,
            move |id: &ProjectId| second(id),
        );
        tokio::time::sleep(Duration::from_millis(2_500)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }
}
