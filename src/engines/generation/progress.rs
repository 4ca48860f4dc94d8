use super::evolution_engine::{ControllerState, GenerationSummary, ProgressCallback};
use std::sync::mpsc::Sender;

/// Reports progress through the `log` facade
pub struct LoggingProgressCallback;

impl ProgressCallback for LoggingProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        log::debug!("Generation {} starting...", generation);
    }

    fn on_generation_complete(&mut self, summary: &GenerationSummary) {
        log::info!(
            "Generation {} complete. Best fitness: {:.4}, mean: {:.4}, failed: {}, hall of fame: {}",
            summary.generation,
            summary.best_fitness,
            summary.mean_fitness,
            summary.failed_evaluations,
            summary.hall_of_fame_size
        );
    }

    fn on_state_change(&mut self, state: ControllerState) {
        log::debug!("Controller state: {:?}", state);
    }
}

/// Does nothing; the default when no observer is attached
pub struct NoopProgressCallback;

impl ProgressCallback for NoopProgressCallback {
    fn on_generation_start(&mut self, _generation: usize) {}
    fn on_generation_complete(&mut self, _summary: &GenerationSummary) {}
}

/// Forwards progress to another thread
pub struct ChannelProgressCallback {
    sender: Sender<ProgressMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    GenerationStart(usize),
    GenerationComplete(GenerationSummary),
    StateChanged(ControllerState),
}

impl ChannelProgressCallback {
    pub fn new(sender: Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart(generation));
    }

    fn on_generation_complete(&mut self, summary: &GenerationSummary) {
        let _ = self.sender.send(ProgressMessage::GenerationComplete(summary.clone()));
    }

    fn on_state_change(&mut self, state: ControllerState) {
        let _ = self.sender.send(ProgressMessage::StateChanged(state));
    }
}
