use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, error};

use crate::api::{DetectorClient, Verdict};
use crate::bus::{Channel, Message};
use crate::indicator::{IndicatorPanel, ResultKind};
use crate::schedule::FadeTimer;

/// How long a result marker stays visible before it fades on its own.
const RESULT_MARKER_TTL: Duration = Duration::from_secs(3);

/// Submits sampled frames to the detection service and folds each verdict
/// back into the coordinator relay and the page overlay. Dispatches are
/// independent: nothing here waits for an earlier request to finish.
pub struct Reporter {
    client: DetectorClient,
    relay: Channel,
    panel: Arc<Mutex<IndicatorPanel>>,
    // One slot: only the newest marker needs a pending fade, and replacing
    // the slot cancels the previous one. Two completions racing between
    // `show_result` and the slot write can leave the visible marker with no
    // fade; the next tick replaces it anyway.
    expiry: Mutex<Option<FadeTimer>>,
}

impl Reporter {
    pub fn new(client: DetectorClient, relay: Channel, panel: Arc<Mutex<IndicatorPanel>>) -> Self {
        Self {
            client,
            relay,
            panel,
            expiry: Mutex::new(None),
        }
    }

    /// Dispatches one sampled frame for analysis and returns immediately.
    /// The request runs on its own thread and may overlap other dispatches;
    /// completion order is unspecified.
    pub fn dispatch(self: &Arc<Self>, image: String, source_index: usize) {
        let reporter = Arc::clone(self);
        thread::spawn(move || {
            let (verdict, video_index) = match reporter.client.analyze(&image) {
                Ok(verdict) => (verdict, Some(source_index)),
                Err(err) => {
                    error!("analyze failed for source {source_index}: {err}");
                    (Verdict::connection_failed(), None)
                }
            };
            reporter.finish(verdict, video_index);
        });
    }

    /// Completion path for one analyze call: best-effort relay first, then
    /// the local result marker. Error verdicts render nothing.
    pub(crate) fn finish(&self, verdict: Verdict, video_index: Option<usize>) {
        let delivered = self.relay.send(Message::DetectionResult {
            result: verdict.clone(),
            video_index,
        });
        if !delivered {
            debug!("detection result dropped; coordinator context is gone");
        }

        let kind = match &verdict {
            Verdict::Classified { is_real: true, .. } => ResultKind::RealPerson,
            Verdict::Classified { .. } => ResultKind::FakeSpoof,
            Verdict::Error { .. } => return,
        };

        let generation = self
            .panel
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .show_result(kind);

        let panel = Arc::clone(&self.panel);
        let expiry = FadeTimer::after(RESULT_MARKER_TTL, move || {
            panel
                .lock()
                .unwrap_or_else(|err| err.into_inner())
                .expire_result(generation);
        });
        *self.expiry.lock().unwrap_or_else(|err| err.into_inner()) = Some(expiry);
    }
}
