//! Shared fakes for in-crate tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::bail;

use crate::bus::{Message, MessageSink};
use crate::sampler::{Frame, VideoSource, VideoStage};

/// Message sink that records everything delivered to it.
pub struct Recorder {
    messages: Mutex<Vec<Message>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
        })
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }
}

impl MessageSink for Recorder {
    fn deliver(&self, message: Message) {
        self.messages
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .push(message);
    }
}

/// Video source with fixed dimensions that counts captures and can be made
/// to fail.
pub struct FakeSource {
    width: u32,
    height: u32,
    fail: bool,
    captures: AtomicUsize,
}

impl FakeSource {
    pub fn new(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            width,
            height,
            fail: false,
            captures: AtomicUsize::new(0),
        })
    }

    pub fn failing(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            width,
            height,
            fail: true,
            captures: AtomicUsize::new(0),
        })
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::Relaxed)
    }
}

impl VideoSource for FakeSource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn capture(&self) -> anyhow::Result<Frame> {
        self.captures.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            bail!("source is not drawable");
        }
        Ok(Frame {
            rgba: vec![128; (self.width * self.height * 4) as usize],
            width: self.width,
            height: self.height,
        })
    }
}

/// Stage serving a fixed source list; counts how often it is enumerated,
/// which makes polling ticks observable.
pub struct FakeStage {
    sources: Mutex<Vec<Arc<dyn VideoSource>>>,
    polls: AtomicUsize,
}

impl FakeStage {
    pub fn new(sources: Vec<Arc<dyn VideoSource>>) -> Arc<Self> {
        Arc::new(Self {
            sources: Mutex::new(sources),
            polls: AtomicUsize::new(0),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::Relaxed)
    }
}

impl VideoStage for FakeStage {
    fn sources(&self) -> Vec<Arc<dyn VideoSource>> {
        self.polls.fetch_add(1, Ordering::Relaxed);
        self.sources
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }
}

/// Polls a condition until it holds or the deadline passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
