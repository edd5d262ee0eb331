use chrono::{DateTime, Utc};

use crate::config::AcceptanceConfig;
use crate::constants::NANOS_PER_SEC;
use crate::location::fix::{AcceptedLocation, LocationFix, millis_between};

/// Which kind of location provider feeds the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Individual platform providers (gps, network, ...) compared by accuracy
    Native,
    /// A provider that already fuses several sources and is trusted as-is
    Aggregated,
}

/// Elapsed time in seconds between the accepted fix and a candidate.
///
/// Monotonic timestamps are used when both fixes carry one. Otherwise the
/// providers' wall-clock times are compared, except when the fixes come from
/// different providers: then the local reception times are used, since device
/// clocks feeding different providers may disagree.
pub fn elapsed_secs(
    candidate: &LocationFix,
    accepted: &AcceptedLocation,
    received_at: DateTime<Utc>,
) -> f64 {
    if let (Some(now), Some(then)) = (
        candidate.elapsed_realtime_nanos,
        accepted.fix.elapsed_realtime_nanos,
    ) {
        return (now as f64 - then as f64) / NANOS_PER_SEC;
    }

    let (time, last_time) = if candidate.same_provider(&accepted.fix) {
        (candidate.time, accepted.fix.time)
    } else {
        (received_at, accepted.accepted_at)
    };
    millis_between(last_time, time) * 1.0e-3
}

/// Accuracy-versus-age comparison shared by every provider kind
#[derive(Debug, Clone)]
pub struct NativeAcceptance {
    default_speed_mps: f64,
}

impl NativeAcceptance {
    pub fn new(default_speed_mps: f64) -> Self {
        Self { default_speed_mps }
    }

    /// A candidate wins when its accuracy beats the accepted accuracy inflated
    /// by how far the device could have travelled since.
    pub fn is_better(
        &self,
        candidate: Option<&LocationFix>,
        accepted: Option<&AcceptedLocation>,
        received_at: DateTime<Utc>,
    ) -> bool {
        let Some(candidate) = candidate else {
            return false;
        };
        let Some(accepted) = accepted else {
            return true;
        };

        let speed = self
            .default_speed_mps
            .max((candidate.speed + accepted.fix.speed) / 2.0);
        let dt = elapsed_secs(candidate, accepted, received_at);

        candidate.accuracy < accepted.fix.accuracy + speed * dt
    }
}

/// Acceptance for an aggregated provider: its own fixes always win and
/// nothing displaces a fix it produced.
#[derive(Debug, Clone)]
pub struct AggregatedAcceptance {
    provider: String,
    base: NativeAcceptance,
}

impl AggregatedAcceptance {
    pub fn new(provider: impl Into<String>, default_speed_mps: f64) -> Self {
        Self {
            provider: provider.into(),
            base: NativeAcceptance::new(default_speed_mps),
        }
    }

    fn is_aggregated(&self, fix: &LocationFix) -> bool {
        fix.provider
            .as_deref()
            .is_some_and(|p| p.eq_ignore_ascii_case(&self.provider))
    }

    pub fn is_better(
        &self,
        candidate: Option<&LocationFix>,
        accepted: Option<&AcceptedLocation>,
        received_at: DateTime<Utc>,
    ) -> bool {
        let Some(candidate) = candidate else {
            return false;
        };
        let Some(accepted) = accepted else {
            return true;
        };

        if self.is_aggregated(candidate) {
            return true;
        }
        if self.is_aggregated(&accepted.fix) {
            return false;
        }

        self.base
            .is_better(Some(candidate), Some(accepted), received_at)
    }
}

/// Acceptance strategy selected by provider kind
#[derive(Debug, Clone)]
pub enum AcceptancePolicy {
    Native(NativeAcceptance),
    Aggregated(AggregatedAcceptance),
}

impl AcceptancePolicy {
    pub fn new(kind: ProviderKind, config: &AcceptanceConfig) -> Self {
        match kind {
            ProviderKind::Native => Self::Native(NativeAcceptance::new(config.default_speed_mps)),
            ProviderKind::Aggregated => Self::Aggregated(AggregatedAcceptance::new(
                config.aggregated_provider.clone(),
                config.default_speed_mps,
            )),
        }
    }

    pub fn is_better(
        &self,
        candidate: Option<&LocationFix>,
        accepted: Option<&AcceptedLocation>,
        received_at: DateTime<Utc>,
    ) -> bool {
        match self {
            Self::Native(policy) => policy.is_better(candidate, accepted, received_at),
            Self::Aggregated(policy) => policy.is_better(candidate, accepted, received_at),
        }
    }
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self::new(ProviderKind::Native, &AcceptanceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn fix(accuracy: f64, secs: i64, provider: &str) -> LocationFix {
        LocationFix::new(48.85, 2.35, accuracy, at(secs)).with_provider(provider)
    }

    fn accepted(fix: LocationFix, secs: i64) -> AcceptedLocation {
        AcceptedLocation::new(fix, at(secs))
    }

    #[test]
    fn test_missing_candidate_never_wins() {
        let policy = AcceptancePolicy::default();
        let current = accepted(fix(10.0, 0, "gps"), 0);
        assert!(!policy.is_better(None, Some(&current), at(1)));
        assert!(!policy.is_better(None, None, at(1)));
    }

    #[test]
    fn test_first_fix_always_wins() {
        let policy = AcceptancePolicy::default();
        let candidate = fix(5000.0, 0, "network");
        assert!(policy.is_better(Some(&candidate), None, at(0)));
    }

    #[test]
    fn test_less_accurate_but_newer_fix_wins() {
        let policy = AcceptancePolicy::default();
        let current = accepted(fix(10.0, 0, "gps"), 0);
        let candidate = fix(20.0, 5, "gps");

        // 20 < 10 + 5 * 5
        assert!(policy.is_better(Some(&candidate), Some(&current), at(5)));
    }

    #[test]
    fn test_much_less_accurate_fix_rejected() {
        let policy = AcceptancePolicy::default();
        let current = accepted(fix(10.0, 0, "gps"), 0);
        let candidate = fix(40.0, 5, "gps");

        // 40 >= 10 + 5 * 5
        assert!(!policy.is_better(Some(&candidate), Some(&current), at(5)));
    }

    #[test]
    fn test_boundary_is_strict() {
        let policy = AcceptancePolicy::default();
        let current = accepted(fix(10.0, 0, "gps"), 0);
        let candidate = fix(35.0, 5, "gps");
        assert!(!policy.is_better(Some(&candidate), Some(&current), at(5)));
    }

    #[test]
    fn test_average_speed_raises_allowance() {
        let policy = AcceptancePolicy::default();
        let current = accepted(fix(10.0, 0, "gps").with_speed(20.0), 0);
        let candidate = fix(80.0, 5, "gps").with_speed(10.0);

        // s = max(5, 15) = 15 -> 80 < 10 + 75
        assert!(policy.is_better(Some(&candidate), Some(&current), at(5)));
    }

    #[test]
    fn test_elapsed_prefers_monotonic() {
        let current = accepted(fix(10.0, 0, "gps").with_elapsed_realtime_nanos(1_000_000_000), 0);
        let candidate = fix(10.0, 100, "network").with_elapsed_realtime_nanos(3_500_000_000);

        assert_abs_diff_eq!(elapsed_secs(&candidate, &current, at(50)), 2.5);
    }

    #[test]
    fn test_elapsed_same_provider_uses_fix_times() {
        let current = accepted(fix(10.0, 0, "gps"), 40);
        let candidate = fix(10.0, 7, "gps");

        assert_abs_diff_eq!(elapsed_secs(&candidate, &current, at(100)), 7.0);
    }

    #[test]
    fn test_elapsed_different_provider_uses_reception_times() {
        // Network fix claims a time an hour in the future.
        let current = accepted(fix(10.0, 0, "gps"), 40);
        let candidate = fix(10.0, 3600, "network");

        assert_abs_diff_eq!(elapsed_secs(&candidate, &current, at(43)), 3.0);
    }

    #[test]
    fn test_aggregated_candidate_always_wins() {
        let policy = AcceptancePolicy::new(ProviderKind::Aggregated, &AcceptanceConfig::default());
        let current = accepted(fix(3.0, 0, "gps"), 0);
        let candidate = fix(500.0, 0, "FUSED");

        assert!(policy.is_better(Some(&candidate), Some(&current), at(0)));
    }

    #[test]
    fn test_aggregated_fix_never_displaced() {
        let policy = AcceptancePolicy::new(ProviderKind::Aggregated, &AcceptanceConfig::default());
        let current = accepted(fix(500.0, 0, "fused"), 0);

        for (accuracy, secs) in [(1.0, 0), (1.0, 3600), (0.5, 86_400)] {
            let candidate = fix(accuracy, secs, "gps");
            assert!(!policy.is_better(Some(&candidate), Some(&current), at(secs)));
        }
    }

    #[test]
    fn test_aggregated_falls_back_to_native_rule() {
        let policy = AcceptancePolicy::new(ProviderKind::Aggregated, &AcceptanceConfig::default());
        let current = accepted(fix(10.0, 0, "gps"), 0);

        assert!(policy.is_better(Some(&fix(20.0, 5, "network")), Some(&current), at(5)));
        assert!(!policy.is_better(Some(&fix(40.0, 5, "network")), Some(&current), at(5)));
    }
}
