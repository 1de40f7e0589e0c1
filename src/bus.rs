use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

use crate::api::Verdict;

/// Cross-context message set, tagged by `action` on the wire. Commands flow
/// from a controller to a page context; detection results flow back from a
/// page context to the coordinator and its listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Message {
    #[serde(rename = "startDetection")]
    StartDetection {
        #[serde(
            rename = "backendUrl",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        backend_url: Option<String>,
    },
    #[serde(rename = "stopDetection")]
    StopDetection,
    #[serde(rename = "clearResults")]
    ClearResults,
    #[serde(rename = "detectionResult")]
    DetectionResult {
        result: Verdict,
        #[serde(
            rename = "videoIndex",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        video_index: Option<usize>,
    },
}

/// A context that can receive messages from the substrate.
pub trait MessageSink: Send + Sync {
    fn deliver(&self, message: Message);
}

/// At-most-once handle to a receiving context. `send` reports whether the
/// message reached a live target; an unacknowledged send means the target
/// context no longer exists and the message was dropped. There is no queue
/// and no retry.
#[derive(Clone)]
pub struct Channel {
    target: Weak<dyn MessageSink>,
}

impl Channel {
    pub fn to<S: MessageSink + 'static>(target: &Arc<S>) -> Self {
        let target: Arc<dyn MessageSink> = target.clone();
        let target: Weak<dyn MessageSink> = Arc::downgrade(&target);
        Self { target }
    }

    /// Detached channel whose target is already gone. Useful as a stand-in
    /// where no receiver exists.
    pub fn disconnected() -> Self {
        Self {
            target: Weak::<DeadSink>::new(),
        }
    }

    pub fn send(&self, message: Message) -> bool {
        match self.target.upgrade() {
            Some(sink) => {
                sink.deliver(message);
                true
            }
            None => false,
        }
    }
}

struct DeadSink;

impl MessageSink for DeadSink {
    fn deliver(&self, _message: Message) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Recorder;

    #[test]
    fn messages_serialize_with_action_tags() {
        let json = serde_json::to_string(&Message::StartDetection {
            backend_url: Some("http://127.0.0.1:8000/api".to_string()),
        })
        .expect("serialize start");
        assert!(json.contains("\"action\":\"startDetection\""));
        assert!(json.contains("\"backendUrl\":\"http://127.0.0.1:8000/api\""));

        let json = serde_json::to_string(&Message::StopDetection).expect("serialize stop");
        assert_eq!(json, r#"{"action":"stopDetection"}"#);

        let json = serde_json::to_string(&Message::DetectionResult {
            result: Verdict::connection_failed(),
            video_index: None,
        })
        .expect("serialize result");
        assert!(json.contains("\"action\":\"detectionResult\""));
        assert!(!json.contains("videoIndex"));
    }

    #[test]
    fn messages_round_trip() {
        let message = Message::DetectionResult {
            result: Verdict::Classified {
                is_real: true,
                confidence: 0.93,
                status: "real".to_string(),
            },
            video_index: Some(1),
        };
        let json = serde_json::to_string(&message).expect("serialize");
        assert!(json.contains("\"videoIndex\":1"));
        let parsed: Message = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed, message);
    }

    #[test]
    fn sends_to_a_live_target_are_acknowledged() {
        let recorder = Recorder::new();
        let channel = Channel::to(&recorder);

        assert!(channel.send(Message::StopDetection));
        assert_eq!(recorder.messages(), vec![Message::StopDetection]);
    }

    #[test]
    fn sends_to_a_gone_target_are_dropped_silently() {
        let recorder = Recorder::new();
        let channel = Channel::to(&recorder);
        drop(recorder);

        assert!(!channel.send(Message::StopDetection));
        assert!(!Channel::disconnected().send(Message::ClearResults));
    }
}
