use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::event::Record;
use super::reconciler::SharedReconciler;
use super::translate::Translator;
use crate::game::GameFacade;
use crate::observe::{Observation, ObservationSink};
use crate::scan::{CycleHook, MessageChange, MessageTracker, ScanReport};

/// Glue from the two producers (observer and scanner) into the reconciler.
///
/// Both producers call in from their own threads; the reconciler lock keeps
/// `record` calls from interleaving.
pub struct EventPipeline {
    game: Arc<dyn GameFacade>,
    translator: Mutex<Translator>,
    reconciler: SharedReconciler,
}

impl EventPipeline {
    pub fn new(game: Arc<dyn GameFacade>, reconciler: SharedReconciler) -> Arc<Self> {
        Arc::new(Self {
            game,
            translator: Mutex::new(Translator::new()),
            reconciler,
        })
    }

    pub fn reconciler(&self) -> &SharedReconciler {
        &self.reconciler
    }

    pub fn on_observation(&self, observation: &Observation) {
        let records = {
            let mut translator = self.translator.lock().unwrap_or_else(|p| p.into_inner());
            match translator.translate(self.game.as_ref(), observation) {
                Ok(records) => records,
                Err(e) if e.is_transient() => {
                    debug!("Dropping observation {:?}: {}", observation, e);
                    return;
                }
                Err(e) => {
                    warn!("Failed to translate observation: {}", e);
                    return;
                }
            }
        };
        self.submit(&records);
    }

    pub fn on_message(&self, change: &MessageChange) {
        let record = {
            let translator = self.translator.lock().unwrap_or_else(|p| p.into_inner());
            translator.translate_message(change)
        };
        if let Some(record) = record {
            self.submit(&[record]);
        }
    }

    fn submit(&self, records: &[Record]) {
        let mut reconciler = self.reconciler.lock().unwrap_or_else(|p| p.into_inner());
        for record in records {
            if let Err(e) = reconciler.apply(record) {
                warn!("Failed to persist {} event: {}", record.kind, e);
            }
        }
    }

    pub fn observation_sink(self: &Arc<Self>) -> ObservationSink {
        let pipeline = Arc::clone(self);
        Arc::new(move |observation: Observation| pipeline.on_observation(&observation))
    }

    /// Scanner cycle hook that diffs the tracker's hits and records new
    /// prompts.
    pub fn scan_hook(self: &Arc<Self>, tracker: Arc<MessageTracker>) -> CycleHook {
        let pipeline = Arc::clone(self);
        Arc::new(move |report: &ScanReport| {
            debug!("Scan cycle: {} hits in {} chunks", report.hits, report.chunks);
            for change in tracker.finish_cycle() {
                pipeline.on_message(&change);
            }
        })
    }
}
