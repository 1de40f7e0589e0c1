//! Live-communication sites eligible for detection.

/// Host patterns recognized as valid detection targets.
pub const VIDEO_CALL_DOMAINS: [&str; 5] = [
    "meet.google.com",
    "zoom.us",
    "teams.microsoft.com",
    "webex.com",
    "gotomeeting.com",
];

/// Whether a page URL belongs to a recognized live-communication site.
/// Matches by substring over the whole URL.
pub fn is_video_call_site(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    VIDEO_CALL_DOMAINS.iter().any(|domain| url.contains(domain))
}
