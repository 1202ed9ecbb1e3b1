use serde::Serialize;

/// Where the image for the current cycle is coming from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquireSource {
    Upload,
    /// Camera access requested, stream not yet live.
    CameraStarting,
    /// Camera preview running, waiting for a capture.
    CameraLive,
}

/// Phase of one acquisition cycle.
///
/// `Idle → Acquiring → Classifying → Normalizing → Presenting → Idle`, with
/// `Errored` reachable from every non-idle phase. The camera status lives in
/// `Acquiring`, so "camera on" and "camera loading" cannot both hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "source")]
pub enum ScanPhase {
    Idle,
    Acquiring(AcquireSource),
    Classifying,
    Normalizing,
    Presenting,
    Errored,
}

impl Default for ScanPhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl ScanPhase {
    /// A new cycle may only begin from here.
    pub fn can_begin(self) -> bool {
        matches!(self, Self::Idle | Self::Errored)
    }

    pub fn is_camera_live(self) -> bool {
        self == Self::Acquiring(AcquireSource::CameraLive)
    }

    /// Whether moving to `next` is a legal step of the cycle.
    pub fn can_transition_to(self, next: ScanPhase) -> bool {
        use AcquireSource::*;
        use ScanPhase::*;
        match (self, next) {
            (_, Idle) => true,
            (Idle, Errored) => false,
            (_, Errored) => true,
            (Idle | Errored, Acquiring(_)) => true,
            (Acquiring(CameraStarting), Acquiring(CameraLive)) => true,
            (Acquiring(Upload) | Acquiring(CameraLive), Classifying) => true,
            (Classifying, Normalizing) => true,
            (Normalizing, Presenting) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_legal() {
        let path = [
            ScanPhase::Idle,
            ScanPhase::Acquiring(AcquireSource::Upload),
            ScanPhase::Classifying,
            ScanPhase::Normalizing,
            ScanPhase::Presenting,
            ScanPhase::Idle,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn camera_path_is_legal() {
        let starting = ScanPhase::Acquiring(AcquireSource::CameraStarting);
        let live = ScanPhase::Acquiring(AcquireSource::CameraLive);
        assert!(ScanPhase::Idle.can_transition_to(starting));
        assert!(starting.can_transition_to(live));
        assert!(live.can_transition_to(ScanPhase::Classifying));
        assert!(!starting.can_transition_to(ScanPhase::Classifying));
    }

    #[test]
    fn cycles_begin_only_from_idle_or_errored() {
        assert!(ScanPhase::Idle.can_begin());
        assert!(ScanPhase::Errored.can_begin());
        assert!(!ScanPhase::Classifying.can_begin());
        assert!(!ScanPhase::Acquiring(AcquireSource::CameraLive).can_begin());
        assert!(!ScanPhase::Classifying.can_transition_to(ScanPhase::Acquiring(AcquireSource::Upload)));
    }

    #[test]
    fn errored_reachable_from_any_busy_phase() {
        assert!(!ScanPhase::Idle.can_transition_to(ScanPhase::Errored));
        assert!(ScanPhase::Classifying.can_transition_to(ScanPhase::Errored));
        assert!(ScanPhase::Presenting.can_transition_to(ScanPhase::Errored));
        assert!(ScanPhase::Errored.can_transition_to(ScanPhase::Idle));
    }

    #[test]
    fn serializes_with_source() {
        let json = serde_json::to_value(ScanPhase::Acquiring(AcquireSource::CameraLive)).unwrap();
        assert_eq!(json, serde_json::json!({ "phase": "acquiring", "source": "camera_live" }));
    }
}
