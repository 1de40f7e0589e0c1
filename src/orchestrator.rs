use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use log::{debug, error, info};

use crate::api::DetectorClient;
use crate::bus::{Channel, Message, MessageSink};
use crate::indicator::IndicatorPanel;
use crate::reporter::Reporter;
use crate::sampler::{self, VideoSource, VideoStage};
use crate::schedule::PollTimer;

/// Polling state for one page context. Invariant: `timer` is `Some` iff
/// `active`, and it is the only handle to the session's timer thread.
struct Session {
    active: bool,
    timer: Option<PollTimer>,
}

/// Per-page detection worker. Owns the polling lifecycle, drives capture
/// for every visible video source on each tick, and hands samples to the
/// reporter. One instance per page context; dropping it tears the session
/// down.
pub struct Orchestrator {
    stage: Arc<dyn VideoStage>,
    relay: Channel,
    panel: Arc<Mutex<IndicatorPanel>>,
    backend_url: Mutex<String>,
    poll_interval: Duration,
    session: Mutex<Session>,
    reporter: Mutex<Option<Arc<Reporter>>>,
    self_ref: Weak<Orchestrator>,
}

impl Orchestrator {
    pub fn new(
        stage: Arc<dyn VideoStage>,
        relay: Channel,
        backend_url: impl Into<String>,
        poll_interval: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            stage,
            relay,
            panel: Arc::new(Mutex::new(IndicatorPanel::new())),
            backend_url: Mutex::new(backend_url.into()),
            poll_interval,
            session: Mutex::new(Session {
                active: false,
                timer: None,
            }),
            reporter: Mutex::new(None),
            self_ref: self_ref.clone(),
        })
    }

    /// Arms the polling timer and shows the liveness marker. Safe to call
    /// while already active: the previous timer is replaced before the new
    /// one fires, so at most one timer exists per session.
    pub fn start(&self, backend_url: Option<String>) {
        if let Some(url) = backend_url {
            *self
                .backend_url
                .lock()
                .unwrap_or_else(|err| err.into_inner()) = url;
        }
        let endpoint = self
            .backend_url
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone();

        let client = match DetectorClient::new(endpoint.clone()) {
            Ok(client) => client,
            Err(err) => {
                error!("cannot start detection: {err}");
                return;
            }
        };
        let reporter = Arc::new(Reporter::new(
            client,
            self.relay.clone(),
            Arc::clone(&self.panel),
        ));
        *self.reporter.lock().unwrap_or_else(|err| err.into_inner()) = Some(reporter);

        let weak = self.self_ref.clone();
        let timer = PollTimer::arm(self.poll_interval, move || {
            if let Some(orchestrator) = weak.upgrade() {
                orchestrator.tick();
            }
        });

        let previous = {
            let mut session = self.session.lock().unwrap_or_else(|err| err.into_inner());
            session.active = true;
            session.timer.replace(timer)
        };
        // Joining the old timer thread must happen outside the session lock.
        drop(previous);

        self.panel
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .show_active();
        info!("detection started against {endpoint}");
    }

    /// Cancels polling and clears the session. No-op when already stopped.
    /// In-flight analyze calls are not interrupted; late verdicts are still
    /// relayed and may briefly render.
    pub fn stop(&self) {
        let timer = {
            let mut session = self.session.lock().unwrap_or_else(|err| err.into_inner());
            session.active = false;
            session.timer.take()
        };
        if timer.is_some() {
            info!("detection stopped");
        }
        drop(timer);

        self.panel
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .hide_active();
    }

    /// Removes all result markers; the session state is untouched.
    pub fn clear_results(&self) {
        self.panel
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clear_results();
    }

    pub fn is_active(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .active
    }

    /// Overlay state for the host to render.
    pub fn panel(&self) -> Arc<Mutex<IndicatorPanel>> {
        Arc::clone(&self.panel)
    }

    /// One polling round: enumerate the page's video sources and dispatch a
    /// sample for each streaming one. Dispatches do not wait on each other
    /// or on earlier rounds.
    fn tick(&self) {
        {
            let session = self.session.lock().unwrap_or_else(|err| err.into_inner());
            // A timer cancelled mid-sleep can still fire once.
            if !session.active {
                return;
            }
        }
        let reporter = match &*self.reporter.lock().unwrap_or_else(|err| err.into_inner()) {
            Some(reporter) => Arc::clone(reporter),
            None => return,
        };

        for (index, source) in self.stage.sources().into_iter().enumerate() {
            if source.width() == 0 || source.height() == 0 {
                continue;
            }
            let frame = match source.capture() {
                Ok(frame) => frame,
                Err(err) => {
                    error!("failed to capture source {index}: {err}");
                    continue;
                }
            };
            match sampler::to_data_url(frame) {
                Ok(image) => reporter.dispatch(image, index),
                Err(err) => error!("failed to encode source {index}: {err}"),
            }
        }
    }
}

impl MessageSink for Orchestrator {
    fn deliver(&self, message: Message) {
        match message {
            Message::StartDetection { backend_url } => self.start(backend_url),
            Message::StopDetection => self.stop(),
            Message::ClearResults => self.clear_results(),
            Message::DetectionResult { .. } => {
                debug!("ignoring detection result addressed to a page context");
            }
        }
    }
}
