//! Per-page overlay state: one liveness marker while a session is active,
//! one result marker for the latest verdict. Rendering is the host's
//! concern; this module owns the marker discipline.

/// Outcome a result marker communicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    RealPerson,
    FakeSpoof,
}

impl ResultKind {
    pub fn label(&self) -> &'static str {
        match self {
            ResultKind::RealPerson => "Real Person",
            ResultKind::FakeSpoof => "Fake/Spoof Detected",
        }
    }
}

#[derive(Debug)]
struct ResultMarker {
    kind: ResultKind,
    generation: u64,
}

/// Marker set for one page. At most one marker of each kind exists at any
/// time; installing a marker replaces the previous one of that kind, so the
/// result marker is last-write-wins.
#[derive(Debug, Default)]
pub struct IndicatorPanel {
    active: bool,
    result: Option<ResultMarker>,
    generation: u64,
}

impl IndicatorPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_active(&mut self) {
        self.active = true;
    }

    pub fn hide_active(&mut self) {
        self.active = false;
    }

    pub fn active_visible(&self) -> bool {
        self.active
    }

    /// Installs a result marker, replacing any previous one. Returns the
    /// marker's generation for use with [`IndicatorPanel::expire_result`].
    pub fn show_result(&mut self, kind: ResultKind) -> u64 {
        self.generation += 1;
        self.result = Some(ResultMarker {
            kind,
            generation: self.generation,
        });
        self.generation
    }

    /// Removes the result marker only if it still carries the given
    /// generation. A marker installed after the caller observed `generation`
    /// stays put.
    pub fn expire_result(&mut self, generation: u64) {
        if self
            .result
            .as_ref()
            .is_some_and(|marker| marker.generation == generation)
        {
            self.result = None;
        }
    }

    /// Removes any result marker; the active marker is unaffected.
    pub fn clear_results(&mut self) {
        self.result = None;
    }

    pub fn result(&self) -> Option<ResultKind> {
        self.result.as_ref().map(|marker| marker.kind)
    }
}
