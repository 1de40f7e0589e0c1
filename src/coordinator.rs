use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};

use crate::allowlist;
use crate::bus::{Channel, Message, MessageSink};
use crate::settings::{Settings, SettingsStore};

/// Identifier for a registered page context.
pub type PageId = u64;

struct PageEntry {
    id: PageId,
    url: String,
    commands: Channel,
}

/// What a page-load event means for the shared detection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoadAdvice {
    /// Detection is desired and the page qualifies; a controller action is
    /// still required to restart it.
    DetectionExpected,
    NoAction,
}

/// Long-lived, page-independent hub. Owns the persisted settings, tracks
/// the page contexts the host currently renders, and relays detection
/// results to whichever controllers are listening. Outlives every page and
/// controller.
pub struct Coordinator {
    store: Arc<dyn SettingsStore>,
    listeners: Mutex<Vec<Channel>>,
    pages: Mutex<Vec<PageEntry>>,
    focused: Mutex<Option<PageId>>,
    next_page_id: AtomicU64,
}

impl Coordinator {
    pub fn new(store: Arc<dyn SettingsStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            listeners: Mutex::new(Vec::new()),
            pages: Mutex::new(Vec::new()),
            focused: Mutex::new(None),
            next_page_id: AtomicU64::new(1),
        })
    }

    /// Reads the persisted settings, falling back to defaults when the
    /// store is unreadable.
    pub fn settings(&self) -> Settings {
        match self.store.load() {
            Ok(settings) => settings,
            Err(err) => {
                warn!("failed to load settings, using defaults: {err:#}");
                Settings::default()
            }
        }
    }

    /// Persists new settings as a whole-value replacement. Store failures
    /// degrade to a log line; the in-memory state of callers is unaffected.
    pub fn save_settings(&self, settings: &Settings) {
        if let Err(err) = self.store.save(settings) {
            error!("failed to persist settings: {err:#}");
        }
    }

    /// Registers a listener for relayed detection results.
    pub fn subscribe(&self, listener: Channel) {
        self.listeners
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .push(listener);
    }

    /// Registers a page context and its command mailbox.
    pub fn register_page(&self, url: impl Into<String>, commands: Channel) -> PageId {
        let id = self.next_page_id.fetch_add(1, Ordering::Relaxed);
        self.pages
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .push(PageEntry {
                id,
                url: url.into(),
                commands,
            });
        id
    }

    /// Removes a page context, e.g. on navigation or unload.
    pub fn unregister_page(&self, id: PageId) {
        self.pages
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .retain(|entry| entry.id != id);
        let mut focused = self.focused.lock().unwrap_or_else(|err| err.into_inner());
        if *focused == Some(id) {
            *focused = None;
        }
    }

    /// Marks a registered page as the one holding focus.
    pub fn focus_page(&self, id: PageId) {
        let known = {
            let pages = self.pages.lock().unwrap_or_else(|err| err.into_inner());
            pages.iter().any(|entry| entry.id == id)
        };
        if known {
            *self.focused.lock().unwrap_or_else(|err| err.into_inner()) = Some(id);
        }
    }

    /// The focused page's URL and command mailbox, if any page has focus.
    pub fn focused_page(&self) -> Option<(String, Channel)> {
        let focused = (*self.focused.lock().unwrap_or_else(|err| err.into_inner()))?;
        let pages = self.pages.lock().unwrap_or_else(|err| err.into_inner());
        pages
            .iter()
            .find(|entry| entry.id == focused)
            .map(|entry| (entry.url.clone(), entry.commands.clone()))
    }

    /// Page-load hook. Reports whether the shared state expects detection
    /// on this page; informational only, no command is ever sent from here.
    pub fn page_loaded(&self, url: &str) -> PageLoadAdvice {
        let settings = self.settings();
        if settings.is_detecting && allowlist::is_video_call_site(url) {
            info!("video call site loaded while detection is expected; awaiting manual restart");
            PageLoadAdvice::DetectionExpected
        } else {
            PageLoadAdvice::NoAction
        }
    }

    /// Fire-and-forget fan-out of a detection result. Listeners whose
    /// context is gone are pruned; nothing is queued or retried.
    fn relay(&self, message: Message) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|err| err.into_inner());
        listeners.retain(|listener| {
            let delivered = listener.send(message.clone());
            if !delivered {
                debug!("dropping listener; controller context is gone");
            }
            delivered
        });
    }
}

impl MessageSink for Coordinator {
    fn deliver(&self, message: Message) {
        match message {
            result @ Message::DetectionResult { .. } => self.relay(result),
            other => debug!("ignoring page-bound command: {other:?}"),
        }
    }
}
