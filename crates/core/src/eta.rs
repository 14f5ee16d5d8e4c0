//! Arrival estimation from remaining distance and speed.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::config::WALKING_SPEED_KMH;
use crate::error::{Result, TrackingError};

/// Whole minutes until arrival, and the instant that lands on.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EtaEstimate {
    pub minutes: f64,
    pub arrival: DateTime<Utc>,
}

/// Estimate the arrival for `distance_remaining_km`.
///
/// An observed speed is used when it is above zero, otherwise the fallback.
/// Minutes are rounded up, so any distance left counts as at least a minute.
pub fn estimate(
    distance_remaining_km: f64,
    observed_speed_kmh: Option<f64>,
    fallback_speed_kmh: f64,
    now: DateTime<Utc>,
) -> Result<EtaEstimate> {
    if !distance_remaining_km.is_finite() || distance_remaining_km < 0.0 {
        return Err(TrackingError::InvalidDistance(distance_remaining_km));
    }
    if !fallback_speed_kmh.is_finite() || fallback_speed_kmh <= 0.0 {
        return Err(TrackingError::InvalidSpeed(fallback_speed_kmh));
    }

    let speed_kmh = match observed_speed_kmh {
        Some(speed) if !speed.is_finite() || speed < 0.0 => {
            return Err(TrackingError::InvalidSpeed(speed));
        }
        Some(speed) if speed > 0.0 => speed,
        // A stationary bus tells us nothing about how fast it will move
        _ => fallback_speed_kmh,
    };

    let minutes = (distance_remaining_km * 60.0 / speed_kmh).ceil();
    if !minutes.is_finite() || minutes > i64::MAX as f64 {
        return Err(TrackingError::EtaOutOfRange);
    }

    let arrival = TimeDelta::try_minutes(minutes as i64)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or(TrackingError::EtaOutOfRange)?;

    Ok(EtaEstimate { minutes, arrival })
}

/// Walking time to a stop at the average walking pace.
pub fn walking_estimate(distance_km: f64, now: DateTime<Utc>) -> Result<EtaEstimate> {
    estimate(distance_km, None, WALKING_SPEED_KMH, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_two_km_at_fallback_speed() {
        let eta = estimate(2.0, None, 30.0, now()).unwrap();

        assert_eq!(eta.minutes, 4.0);
        assert_eq!(eta.arrival, now() + TimeDelta::minutes(4));
    }

    #[test]
    fn test_any_fraction_rounds_up() {
        assert_eq!(estimate(2.000_000_5, None, 30.0, now()).unwrap().minutes, 5.0);
    }

    #[test]
    fn test_rounds_up() {
        // 1 km at 40 km/h is 1.5 minutes
        assert_eq!(estimate(1.0, Some(40.0), 30.0, now()).unwrap().minutes, 2.0);
        // A few meters still counts as a minute
        assert_eq!(estimate(0.001, None, 30.0, now()).unwrap().minutes, 1.0);
    }

    #[test]
    fn test_zero_distance() {
        let eta = estimate(0.0, Some(25.0), 30.0, now()).unwrap();

        assert_eq!(eta.minutes, 0.0);
        assert_eq!(eta.arrival, now());
    }

    #[test]
    fn test_observed_speed_preferred() {
        assert_eq!(estimate(10.0, Some(60.0), 30.0, now()).unwrap().minutes, 10.0);
    }

    #[test]
    fn test_zero_observed_speed_falls_back() {
        assert_eq!(estimate(10.0, Some(0.0), 30.0, now()).unwrap().minutes, 20.0);
    }

    #[test]
    fn test_invalid_speeds() {
        assert!(matches!(
            estimate(1.0, Some(-5.0), 30.0, now()),
            Err(TrackingError::InvalidSpeed(_))
        ));
        assert!(matches!(
            estimate(1.0, Some(f64::NAN), 30.0, now()),
            Err(TrackingError::InvalidSpeed(_))
        ));
        assert!(matches!(
            estimate(1.0, Some(f64::INFINITY), 30.0, now()),
            Err(TrackingError::InvalidSpeed(_))
        ));
        assert!(matches!(
            estimate(1.0, None, 0.0, now()),
            Err(TrackingError::InvalidSpeed(_))
        ));
        assert!(matches!(
            estimate(1.0, None, -30.0, now()),
            Err(TrackingError::InvalidSpeed(_))
        ));
    }

    #[test]
    fn test_invalid_distance() {
        assert!(matches!(
            estimate(-1.0, None, 30.0, now()),
            Err(TrackingError::InvalidDistance(_))
        ));
        assert!(matches!(
            estimate(f64::NAN, None, 30.0, now()),
            Err(TrackingError::InvalidDistance(_))
        ));
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            estimate(1e300, None, 1e-300, now()),
            Err(TrackingError::EtaOutOfRange)
        ));
    }

    #[test]
    fn test_walking() {
        // 0.5 km at 5 km/h is 6 minutes
        assert_eq!(walking_estimate(0.5, now()).unwrap().minutes, 6.0);
    }
}
