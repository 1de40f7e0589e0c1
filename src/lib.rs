//! Spoofwatch - live video spoof detection agent.
//!
//! Periodically samples frames from the video sources a page is rendering,
//! submits each sample to a remote classification service, and reconciles
//! the asynchronous verdicts into observable state. Three actors share the
//! work: a long-lived [`coordinator::Coordinator`] holding configuration
//! and relaying results, a per-page [`orchestrator::Orchestrator`] driving
//! the capture/analyze/report cycle, and a transient
//! [`controller::Controller`] issuing lifecycle commands and displaying the
//! latest verdict. The embedding host supplies pixels and page enumeration
//! through the trait seams in [`sampler`] and [`settings`].

pub mod allowlist;
pub mod api;
pub mod bus;
pub mod controller;
pub mod coordinator;
pub mod indicator;
pub mod orchestrator;
pub mod reporter;
pub mod sampler;
pub mod schedule;
pub mod settings;

#[cfg(test)]
pub(crate) mod testutil;

pub use api::{DetectorClient, DetectorError, Verdict};
pub use bus::{Channel, Message, MessageSink};
pub use controller::Controller;
pub use coordinator::Coordinator;
pub use orchestrator::Orchestrator;
pub use settings::{Settings, SettingsStore};
