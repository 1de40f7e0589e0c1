use std::sync::{Arc, Mutex};

use chrono::Local;
use log::debug;
use url::Url;

use crate::allowlist;
use crate::api::Verdict;
use crate::bus::{Channel, Message, MessageSink};
use crate::coordinator::Coordinator;
use crate::settings::Settings;

const OPEN_SITE_PROMPT: &str = "Please open a video call site (Google Meet, Zoom, etc.)";

/// Visual tone of the controller status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Real,
    Fake,
    Unknown,
}

/// Snapshot of the controller surface for the host to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Display {
    pub backend_url: String,
    pub detecting: bool,
    pub tone: StatusTone,
    pub status: String,
    pub last_check: Option<String>,
}

struct ControllerState {
    settings: Settings,
    tone: StatusTone,
    status: String,
    last_check: Option<String>,
}

/// Transient command/display surface. Opening one reads the persisted
/// settings and the focused page with no side effects; it then reacts to
/// user actions and to verdicts relayed through the coordinator.
pub struct Controller {
    coordinator: Arc<Coordinator>,
    state: Mutex<ControllerState>,
}

impl Controller {
    /// Opens the surface and subscribes it for relayed results.
    pub fn open(coordinator: Arc<Coordinator>) -> Arc<Self> {
        let settings = coordinator.settings();
        let (tone, status) = match coordinator.focused_page() {
            Some((url, _)) if allowlist::is_video_call_site(&url) => {
                (StatusTone::Unknown, format!("Ready to detect on {}", host_of(&url)))
            }
            _ => (StatusTone::Fake, OPEN_SITE_PROMPT.to_string()),
        };

        let controller = Arc::new(Self {
            coordinator: Arc::clone(&coordinator),
            state: Mutex::new(ControllerState {
                settings,
                tone,
                status,
                last_check: None,
            }),
        });
        coordinator.subscribe(Channel::to(&controller));
        controller
    }

    /// Flips desired-active, persists it, and commands the focused page.
    /// Refused without any side effect when the focused page is not a
    /// recognized video call site.
    pub fn toggle(&self) {
        let Some((_, commands)) = self.eligible_focused_page() else {
            return;
        };

        let message = {
            let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());
            state.settings.is_detecting = !state.settings.is_detecting;
            self.coordinator.save_settings(&state.settings);

            state.tone = StatusTone::Unknown;
            if state.settings.is_detecting {
                state.status = "Detection Active...".to_string();
                Message::StartDetection {
                    backend_url: Some(state.settings.backend_url.clone()),
                }
            } else {
                state.status = "Detection Inactive".to_string();
                Message::StopDetection
            }
        };
        if !commands.send(message) {
            debug!("page context went away before the command was delivered");
        }
    }

    /// Persists a new endpoint; the detection state is untouched.
    pub fn save(&self, endpoint: impl Into<String>) {
        let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());
        state.settings.backend_url = endpoint.into();
        self.coordinator.save_settings(&state.settings);
        state.tone = StatusTone::Unknown;
        state.status = "Settings saved!".to_string();
    }

    /// Clears result markers on the focused page and resets the display.
    /// Subject to the same eligibility check as any other page command.
    pub fn clear_results(&self) {
        let Some((_, commands)) = self.eligible_focused_page() else {
            return;
        };
        {
            let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());
            state.tone = StatusTone::Unknown;
            state.status = "Detection Cleared".to_string();
            state.last_check = None;
        }
        if !commands.send(Message::ClearResults) {
            debug!("page context went away before the command was delivered");
        }
    }

    pub fn display(&self) -> Display {
        let state = self.state.lock().unwrap_or_else(|err| err.into_inner());
        Display {
            backend_url: state.settings.backend_url.clone(),
            detecting: state.settings.is_detecting,
            tone: state.tone,
            status: state.status.clone(),
            last_check: state.last_check.clone(),
        }
    }

    /// The focused page's command mailbox, or `None` (with the rejection
    /// status shown) when no eligible page has focus.
    fn eligible_focused_page(&self) -> Option<(String, Channel)> {
        let focused = self.coordinator.focused_page();
        match focused {
            Some((url, commands)) if allowlist::is_video_call_site(&url) => Some((url, commands)),
            _ => {
                let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());
                state.tone = StatusTone::Fake;
                state.status = OPEN_SITE_PROMPT.to_string();
                None
            }
        }
    }

    fn show_verdict(&self, verdict: &Verdict) {
        let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());
        match verdict {
            Verdict::Error { error } => {
                state.tone = StatusTone::Fake;
                state.status = format!("Error: {error}");
            }
            Verdict::Classified {
                is_real,
                confidence,
                status,
            } => {
                let percent = confidence * 100.0;
                if *is_real {
                    state.tone = StatusTone::Real;
                    state.status = format!("Real Person ({percent:.1}%)");
                } else {
                    state.tone = StatusTone::Fake;
                    state.status = format!("Fake/Spoof Detected ({percent:.1}%)");
                }
                state.last_check = Some(format!(
                    "Last check: {} - {status}",
                    Local::now().format("%H:%M:%S")
                ));
            }
        }
    }
}

impl MessageSink for Controller {
    fn deliver(&self, message: Message) {
        if let Message::DetectionResult { result, .. } = message {
            self.show_verdict(&result);
        }
    }
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}
