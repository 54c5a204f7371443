//! Autosave Scheduler
//!
//! Keeps the backend copy of the open graph eventually consistent with the
//! store without pushing on every drag frame.
//!
//! ## State machine
//!
//! [`AutosaveMachine`] is a pure four-state machine:
//!
//! - `Idle` - nothing to push
//! - `Pending` - a push is due once the debounce deadline passes
//! - `InFlight` - one push is running
//! - `PendingAndInFlight` - one push is running and exactly one follow-up is due
//!
//! Every mutation moves the deadline. A mutation during a push never starts a
//! second concurrent push; it schedules a single follow-up which still honours
//! the debounce deadline. Pushes carry the full snapshot, so collapsing
//! intermediate mutations loses nothing.
//!
//! ## Background task
//!
//! [`AutosaveScheduler`] owns the machine inside a tokio task, woken by
//! commands, push completions and deadlines. Pushes run as separate tasks
//! tagged with a generation number; switching context bumps the generation so
//! late results for the previous model are discarded.
//!
//! The indicator stays on `Saving` for a minimum display window even if the
//! push completes sooner.

use crate::models::GraphSnapshot;
use crate::persistence::{GraphBackend, PersistenceError, SaveGraphRequest};
use crate::services::EditorContext;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosavePhase {
    Idle,
    Pending,
    InFlight,
    PendingAndInFlight,
}

/// User-visible save status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveIndicator {
    /// Nothing pushed yet in this context
    Idle,
    Saving,
    Saved,
    /// Last push failed; cleared by the next push
    Failed,
}

/// Pure debounce / single-in-flight state machine
#[derive(Debug, Clone)]
pub struct AutosaveMachine {
    phase: AutosavePhase,
    debounce: Duration,
    deadline: Option<Instant>,
}

impl AutosaveMachine {
    pub fn new(debounce: Duration) -> Self {
        Self {
            phase: AutosavePhase::Idle,
            debounce,
            deadline: None,
        }
    }

    pub fn phase(&self) -> AutosavePhase {
        self.phase
    }

    pub fn has_pending(&self) -> bool {
        matches!(
            self.phase,
            AutosavePhase::Pending | AutosavePhase::PendingAndInFlight
        )
    }

    /// When a push should start, if one is waiting only on the clock
    pub fn next_wake(&self) -> Option<Instant> {
        match self.phase {
            AutosavePhase::Pending => self.deadline,
            _ => None,
        }
    }

    /// Record a mutation, (re)starting the debounce window
    pub fn mutated(&mut self, now: Instant) {
        self.deadline = Some(now + self.debounce);
        self.phase = match self.phase {
            AutosavePhase::Idle | AutosavePhase::Pending => AutosavePhase::Pending,
            AutosavePhase::InFlight | AutosavePhase::PendingAndInFlight => {
                AutosavePhase::PendingAndInFlight
            }
        };
    }

    /// Make a pending push due immediately
    pub fn flush(&mut self, now: Instant) {
        if self.has_pending() {
            self.deadline = Some(now);
        }
    }

    /// Returns true when a push must start now
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.phase != AutosavePhase::Pending {
            return false;
        }
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.phase = AutosavePhase::InFlight;
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Record completion of the in-flight push
    ///
    /// Returns true when the follow-up push must start now.
    pub fn push_finished(&mut self, now: Instant) -> bool {
        match self.phase {
            AutosavePhase::InFlight => {
                self.phase = AutosavePhase::Idle;
                false
            }
            AutosavePhase::PendingAndInFlight => {
                self.phase = AutosavePhase::Pending;
                self.poll(now)
            }
            AutosavePhase::Idle | AutosavePhase::Pending => false,
        }
    }

    pub fn reset(&mut self) {
        self.phase = AutosavePhase::Idle;
        self.deadline = None;
    }
}

#[derive(Debug)]
enum Command {
    Mutated(GraphSnapshot),
    SwitchContext(Option<EditorContext>),
    Flush,
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug)]
struct PushOutcome {
    generation: u64,
    result: Result<String, PersistenceError>,
}

#[derive(Debug, Clone, Copy)]
struct Settle {
    at: Instant,
    indicator: SaveIndicator,
}

/// Handle to the background autosave task
pub struct AutosaveScheduler {
    commands: mpsc::UnboundedSender<Command>,
    indicator: watch::Receiver<SaveIndicator>,
}

impl AutosaveScheduler {
    /// Spawn the autosave task on the current tokio runtime
    pub fn spawn(
        backend: Arc<dyn GraphBackend>,
        debounce: Duration,
        min_saving_display: Duration,
    ) -> Self {
        tracing::info!(
            "Autosave scheduler starting (debounce {}ms, saving display {}ms)",
            debounce.as_millis(),
            min_saving_display.as_millis()
        );

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (indicator_tx, indicator_rx) = watch::channel(SaveIndicator::Idle);

        let worker = Worker {
            backend,
            machine: AutosaveMachine::new(debounce),
            min_saving_display,
            context: None,
            latest: None,
            generation: 0,
            indicator: indicator_tx,
            outcome_tx,
            saving_since: None,
            settle: None,
        };
        tokio::spawn(worker.run(commands_rx, outcome_rx));

        Self {
            commands: commands_tx,
            indicator: indicator_rx,
        }
    }

    pub fn indicator(&self) -> SaveIndicator {
        *self.indicator.borrow()
    }

    pub fn subscribe_indicator(&self) -> watch::Receiver<SaveIndicator> {
        self.indicator.clone()
    }

    /// The graph changed; `snapshot` is the full state to push
    pub fn notify_mutation(&self, snapshot: GraphSnapshot) {
        self.send(Command::Mutated(snapshot));
    }

    /// Target a different editing context (or none)
    ///
    /// Cancels the pending save, resets the indicator, and discards results of
    /// any push still in flight for the previous context.
    pub fn switch_context(&self, context: Option<EditorContext>) {
        self.send(Command::SwitchContext(context));
    }

    /// Start the pending push now instead of waiting for the debounce
    pub fn flush(&self) {
        self.send(Command::Flush);
    }

    /// Push anything pending, wait for in-flight pushes, then stop
    pub async fn shutdown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(Command::Shutdown(ack_tx));
        if ack_rx.await.is_err() {
            tracing::debug!("Autosave task already stopped");
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Autosave task has shut down, command ignored");
        }
    }
}

struct Worker {
    backend: Arc<dyn GraphBackend>,
    machine: AutosaveMachine,
    min_saving_display: Duration,
    context: Option<EditorContext>,
    latest: Option<GraphSnapshot>,
    generation: u64,
    indicator: watch::Sender<SaveIndicator>,
    outcome_tx: mpsc::UnboundedSender<PushOutcome>,
    saving_since: Option<Instant>,
    settle: Option<Settle>,
}

impl Worker {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut outcomes: mpsc::UnboundedReceiver<PushOutcome>,
    ) {
        let mut stopping = false;
        let mut ack: Option<oneshot::Sender<()>> = None;

        loop {
            if stopping && self.machine.phase() == AutosavePhase::Idle {
                break;
            }

            let wake = self.machine.next_wake();
            let settle_at = self.settle.map(|s| s.at);

            tokio::select! {
                biased;

                Some(outcome) = outcomes.recv() => self.on_push_finished(outcome),

                command = commands.recv(), if !stopping => match command {
                    Some(Command::Shutdown(reply)) => {
                        tracing::info!("Autosave scheduler shutting down");
                        self.machine.flush(Instant::now());
                        ack = Some(reply);
                        stopping = true;
                    }
                    Some(command) => self.on_command(command),
                    None => {
                        self.machine.flush(Instant::now());
                        stopping = true;
                    }
                },

                _ = wait_until(wake) => self.poll(),

                _ = wait_until(settle_at) => self.apply_settle(),
            }
        }

        // Final status is shown right away; nobody waits out the display window
        self.apply_settle();

        if let Some(reply) = ack {
            let _ = reply.send(());
        }
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Mutated(snapshot) => {
                if self.context.is_none() {
                    tracing::warn!("Mutation received with no editing context, not saved");
                    return;
                }
                self.latest = Some(snapshot);
                self.machine.mutated(Instant::now());
            }
            Command::SwitchContext(context) => {
                self.generation += 1;
                self.machine.reset();
                self.latest = None;
                self.saving_since = None;
                self.settle = None;
                self.indicator.send_replace(SaveIndicator::Idle);
                match &context {
                    Some(ctx) => tracing::info!("Autosave now targets {}", ctx),
                    None => tracing::info!("Autosave detached from editing context"),
                }
                self.context = context;
            }
            Command::Flush => {
                self.machine.flush(Instant::now());
                self.poll();
            }
            // Handled by the run loop
            Command::Shutdown(_) => {}
        }
    }

    fn poll(&mut self) {
        if self.machine.poll(Instant::now()) {
            self.start_push();
        }
    }

    fn start_push(&mut self) {
        let (Some(context), Some(snapshot)) = (&self.context, &self.latest) else {
            tracing::warn!("Autosave due but nothing to push");
            self.machine.reset();
            return;
        };

        let request = SaveGraphRequest::from_snapshot(
            &context.model_id,
            &context.project_id,
            &context.user_id,
            snapshot.clone(),
        );

        if self.saving_since.is_none() {
            self.saving_since = Some(Instant::now());
        }
        self.settle = None;
        self.indicator.send_replace(SaveIndicator::Saving);

        tracing::info!(
            "Autosave push for {} ({} nodes, {} edges)",
            context,
            request.nodes.len(),
            request.edges.len()
        );

        let backend = self.backend.clone();
        let outcome_tx = self.outcome_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = backend.save_graph(request).await;
            if outcome_tx.send(PushOutcome { generation, result }).is_err() {
                tracing::debug!("Autosave task gone before push completed");
            }
        });
    }

    fn on_push_finished(&mut self, outcome: PushOutcome) {
        if outcome.generation != self.generation {
            tracing::debug!("Discarding push result from a previous editing context");
            return;
        }

        let indicator = match &outcome.result {
            Ok(record_id) => {
                tracing::debug!("Autosave push stored as record {}", record_id);
                SaveIndicator::Saved
            }
            Err(e) => {
                tracing::warn!("Autosave push failed: {}", e);
                SaveIndicator::Failed
            }
        };

        let now = Instant::now();
        if self.machine.push_finished(now) {
            self.start_push();
            return;
        }

        let at = self.saving_since.map(|since| since + self.min_saving_display).unwrap_or(now);
        self.settle = Some(Settle { at, indicator });
        if now >= at {
            self.apply_settle();
        }
    }

    fn apply_settle(&mut self) {
        if let Some(settle) = self.settle.take() {
            self.saving_since = None;
            self.indicator.send_replace(settle.indicator);
        }
    }
}

async fn wait_until(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(1000);

    #[test]
    fn test_mutations_collapse_while_pending() {
        let start = Instant::now();
        let mut machine = AutosaveMachine::new(DEBOUNCE);

        machine.mutated(start);
        machine.mutated(start + Duration::from_millis(400));
        assert_eq!(machine.phase(), AutosavePhase::Pending);

        // Original deadline passed, but the second mutation moved it
        assert!(!machine.poll(start + Duration::from_millis(1000)));
        assert!(machine.poll(start + Duration::from_millis(1400)));
        assert_eq!(machine.phase(), AutosavePhase::InFlight);
    }

    #[test]
    fn test_mutation_during_push_schedules_one_follow_up() {
        let start = Instant::now();
        let mut machine = AutosaveMachine::new(DEBOUNCE);

        machine.mutated(start);
        assert!(machine.poll(start + DEBOUNCE));

        machine.mutated(start + Duration::from_millis(1100));
        machine.mutated(start + Duration::from_millis(1150));
        assert_eq!(machine.phase(), AutosavePhase::PendingAndInFlight);
        assert_eq!(machine.next_wake(), None);

        // Push ends before the follow-up's debounce elapses
        assert!(!machine.push_finished(start + Duration::from_millis(1200)));
        assert_eq!(machine.phase(), AutosavePhase::Pending);
        assert_eq!(
            machine.next_wake(),
            Some(start + Duration::from_millis(2150))
        );

        assert!(machine.poll(start + Duration::from_millis(2150)));
        assert!(!machine.push_finished(start + Duration::from_millis(2300)));
        assert_eq!(machine.phase(), AutosavePhase::Idle);
    }

    #[test]
    fn test_follow_up_starts_immediately_when_already_due() {
        let start = Instant::now();
        let mut machine = AutosaveMachine::new(DEBOUNCE);

        machine.mutated(start);
        assert!(machine.poll(start + DEBOUNCE));
        machine.mutated(start + DEBOUNCE);

        // Slow push: the follow-up deadline passed while it was in flight
        assert!(machine.push_finished(start + Duration::from_millis(5000)));
        assert_eq!(machine.phase(), AutosavePhase::InFlight);
    }

    #[test]
    fn test_flush_only_expedites_pending_work() {
        let start = Instant::now();
        let mut machine = AutosaveMachine::new(DEBOUNCE);

        machine.flush(start);
        assert!(!machine.poll(start));

        machine.mutated(start);
        machine.flush(start);
        assert!(machine.poll(start));
    }

    #[test]
    fn test_reset_cancels_everything() {
        let start = Instant::now();
        let mut machine = AutosaveMachine::new(DEBOUNCE);
        machine.mutated(start);
        machine.reset();

        assert_eq!(machine.phase(), AutosavePhase::Idle);
        assert!(!machine.poll(start + DEBOUNCE * 2));
        assert!(!machine.push_finished(start));
    }
}
