use crate::{Model, Msg};
use gloo_timers::callback::Interval;
use shared::ClientConfig;
use yew::html::Scope;

/// Floor for a poll fetch's timeout, whatever the poll period.
pub const MIN_FETCH_TIMEOUT_MS: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollKind {
    Logs,
    Health,
    Progress,
}

/// One periodic fetch. Dropping the task cancels its timer.
pub struct PollTask {
    kind: PollKind,
    period_ms: u32,
    interval: Option<Interval>,
    in_flight: bool,
}

impl PollTask {
    pub fn new(kind: PollKind, period_ms: u32) -> Self {
        Self {
            kind,
            period_ms,
            interval: None,
            in_flight: false,
        }
    }

    /// Fires once right away, then every `period_ms`.
    pub fn start(&mut self, link: &Scope<Model>) {
        self.stop();
        let kind = self.kind;
        link.send_message(Msg::Poll(kind));

        let link = link.clone();
        self.interval = Some(Interval::new(self.period_ms, move || {
            link.send_message(Msg::Poll(kind));
        }));
    }

    pub fn stop(&mut self) {
        if let Some(interval) = self.interval.take() {
            interval.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// A fetch is aborted before the next tick is due, so a hung request
    /// releases its slot instead of stalling the poll.
    pub fn fetch_timeout_ms(&self) -> u32 {
        (self.period_ms - self.period_ms / 5).max(MIN_FETCH_TIMEOUT_MS)
    }
}

pub struct Pollers {
    tasks: Vec<PollTask>,
}

impl Pollers {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            tasks: vec![
                PollTask::new(PollKind::Logs, config.log_poll_ms),
                PollTask::new(PollKind::Health, config.health_poll_ms),
                PollTask::new(PollKind::Progress, config.progress_poll_ms),
            ],
        }
    }

    pub fn start_all(&mut self, link: &Scope<Model>) {
        for task in &mut self.tasks {
            task.start(link);
        }
        log::info!("started {} pollers", self.tasks.len());
    }

    pub fn stop_all(&mut self) {
        for task in &mut self.tasks {
            task.stop();
        }
        log::info!("pollers stopped");
    }

    pub fn is_running(&self, kind: PollKind) -> bool {
        self.task(kind).is_some_and(PollTask::is_running)
    }

    pub fn fetch_timeout_ms(&self, kind: PollKind) -> u32 {
        self.task(kind)
            .map_or(MIN_FETCH_TIMEOUT_MS, PollTask::fetch_timeout_ms)
    }

    /// Claims the slot for a fetch. A tick that lands while the previous
    /// fetch of the same kind is outstanding is dropped.
    pub fn begin(&mut self, kind: PollKind) -> bool {
        match self.task_mut(kind) {
            Some(task) if !task.in_flight => {
                task.in_flight = true;
                true
            }
            _ => false,
        }
    }

    pub fn finish(&mut self, kind: PollKind) {
        if let Some(task) = self.task_mut(kind) {
            task.in_flight = false;
        }
    }

    fn task(&self, kind: PollKind) -> Option<&PollTask> {
        self.tasks.iter().find(|t| t.kind == kind)
    }

    fn task_mut(&mut self, kind: PollKind) -> Option<&mut PollTask> {
        self.tasks.iter_mut().find(|t| t.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pollers() -> Pollers {
        Pollers::from_config(&ClientConfig::default())
    }

    #[test]
    fn fetch_times_out_before_next_tick() {
        let pollers = pollers();
        assert_eq!(pollers.fetch_timeout_ms(PollKind::Logs), 2000);
        assert_eq!(pollers.fetch_timeout_ms(PollKind::Health), 8000);
        assert_eq!(PollTask::new(PollKind::Logs, 100).fetch_timeout_ms(), MIN_FETCH_TIMEOUT_MS);
    }

    #[test]
    fn tick_skipped_while_fetch_outstanding() {
        let mut pollers = pollers();
        assert!(pollers.begin(PollKind::Logs));
        assert!(!pollers.begin(PollKind::Logs));
        assert!(pollers.begin(PollKind::Health));
    }

    #[test]
    fn finished_fetch_frees_slot() {
        let mut pollers = pollers();
        assert!(pollers.begin(PollKind::Progress));
        // aborted and failed fetches report back through the same path
        pollers.finish(PollKind::Progress);
        assert!(pollers.begin(PollKind::Progress));
        assert!(!pollers.is_running(PollKind::Progress));
    }
}
