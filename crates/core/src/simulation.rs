//! Simulated bus movement for demos and tests.
//!
//! [`RoutePlayback`] drives a bus along a route's polyline at a constant
//! speed, emitting one position sample per interval, and always finishes
//! with a sample on the final polyline point.

use bus_alarm_transit::{Coordinate, PositionSample, Route, distance_km};
use chrono::{DateTime, TimeDelta, Utc};
use geo::HaversineIntermediate;
use itertools::Itertools;

use crate::error::{Result, TrackingError};

/// Slack for the final leg, so summed float distances still land on the end.
const END_TOLERANCE_KM: f64 = 1e-9;

pub struct RoutePlayback {
    polyline: Vec<Coordinate>,
    /// Distance from the start to each polyline point
    cumulative_km: Vec<f64>,
    speed_kmh: f64,
    interval: TimeDelta,
    start: DateTime<Utc>,
    step: i32,
    finished: bool,
}

impl RoutePlayback {
    pub fn new(route: &Route, speed_kmh: f64, interval: TimeDelta, start: DateTime<Utc>) -> Result<Self> {
        route.validate()?;
        if !speed_kmh.is_finite() || speed_kmh <= 0.0 {
            return Err(TrackingError::InvalidSpeed(speed_kmh));
        }
        if interval <= TimeDelta::zero() {
            return Err(TrackingError::InvalidInterval(interval));
        }

        let mut cumulative_km = vec![0.0];
        for (a, b) in route.polyline.iter().tuple_windows() {
            let traveled = cumulative_km.last().copied().unwrap_or_default();
            cumulative_km.push(traveled + distance_km(*a, *b));
        }

        Ok(Self {
            polyline: route.polyline.clone(),
            cumulative_km,
            speed_kmh,
            interval,
            start,
            step: 0,
            finished: false,
        })
    }

    pub fn total_km(&self) -> f64 {
        self.cumulative_km.last().copied().unwrap_or_default()
    }

    /// Point `km` along the polyline
    fn position_at(&self, km: f64) -> Option<Coordinate> {
        let segment = self
            .cumulative_km
            .iter()
            .rposition(|traveled| *traveled <= km)
            .unwrap_or(0);

        let (Some(&a), Some(&b)) = (self.polyline.get(segment), self.polyline.get(segment + 1)) else {
            return self.polyline.last().copied();
        };

        let length = self.cumulative_km[segment + 1] - self.cumulative_km[segment];
        if length <= 0.0 {
            return Some(a);
        }

        let fraction = ((km - self.cumulative_km[segment]) / length).clamp(0.0, 1.0);
        Some(
            a.to_point()
                .haversine_intermediate(&b.to_point(), fraction)
                .into(),
        )
    }
}

impl Iterator for RoutePlayback {
    type Item = PositionSample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let elapsed = self.interval.checked_mul(self.step)?;
        let timestamp = self.start.checked_add_signed(elapsed)?;
        let next_step = self.step.checked_add(1)?;

        let hours = elapsed.num_milliseconds() as f64 / 3_600_000.0;
        let traveled = self.speed_kmh * hours;

        let coordinates = if traveled >= self.total_km() - END_TOLERANCE_KM {
            self.finished = true;
            *self.polyline.last()?
        } else {
            self.position_at(traveled)?
        };

        self.step = next_step;
        Some(PositionSample::new(coordinates, timestamp).with_speed(self.speed_kmh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus_alarm_transit::{RouteIdentifier, Stop, StopIdentifier};
    use bus_alarm_transit::spatial::queries::equator_km_to_degrees;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn at_km(km: f64) -> Coordinate {
        Coordinate::new(0.0, equator_km_to_degrees(km))
    }

    fn route() -> Route {
        let stops = vec![
            Stop {
                id: StopIdentifier::new("a"),
                sequence_index: 0,
                name: "A".into(),
                coordinates: at_km(0.0),
            },
            Stop {
                id: StopIdentifier::new("b"),
                sequence_index: 1,
                name: "B".into(),
                coordinates: at_km(2.0),
            },
        ];

        Route {
            id: RouteIdentifier::new("shuttle"),
            name: "Shuttle".into(),
            polyline: vec![at_km(0.0), at_km(1.0), at_km(2.0)],
            stops,
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 7, 0, 0).unwrap()
    }

    #[test]
    fn test_playback_reaches_end() {
        // 2 km at 30 km/h with a sample every minute: 0, 0.5, ... 2.0 km
        let samples: Vec<_> = RoutePlayback::new(&route(), 30.0, TimeDelta::minutes(1), start())
            .unwrap()
            .collect();

        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0].coordinates, at_km(0.0));
        assert_eq!(samples[4].coordinates, at_km(2.0));
        assert_eq!(samples[4].timestamp, start() + TimeDelta::minutes(4));
        assert!(samples.iter().all(|s| s.speed_kmh == Some(30.0)));
    }

    #[test]
    fn test_playback_interpolates() {
        let mut playback = RoutePlayback::new(&route(), 30.0, TimeDelta::minutes(3), start()).unwrap();

        playback.next();
        let second = playback.next().unwrap();

        // 1.5 km in, halfway along the second segment
        assert_relative_eq!(distance_km(at_km(0.0), second.coordinates), 1.5, max_relative = 1e-6);
    }

    #[test]
    fn test_playback_rejects_bad_input() {
        assert!(matches!(
            RoutePlayback::new(&route(), 0.0, TimeDelta::minutes(1), start()),
            Err(TrackingError::InvalidSpeed(_))
        ));
        assert!(RoutePlayback::new(&route(), 30.0, TimeDelta::zero(), start()).is_err());
    }
}
