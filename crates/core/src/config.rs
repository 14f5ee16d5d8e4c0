//! Tracking and alarm configuration.
//!
//! Defaults mirror the constants the app ships with.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackingError};

/// Average road speed of a bus, used when a sample carries no speed
pub const BUS_AVERAGE_SPEED_KMH: f64 = 30.0;

pub const WALKING_SPEED_KMH: f64 = 5.0;

pub const DEFAULT_SNOOZE_MINUTES: u32 = 5;

/// Radius within which a rider counts as "at" a stop
pub const STOP_PROXIMITY_RADIUS_KM: f64 = 0.5;

pub const SAMPLE_INTERVAL_SECS: u64 = 5;

/// Knobs for a tracking session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Speed assumed when a position sample carries none
    pub fallback_speed_kmh: f64,
    pub walking_speed_kmh: f64,
    pub snooze_minutes: u32,
    pub proximity_radius_km: f64,
    /// How often the position source is expected to report
    pub sample_interval_secs: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            fallback_speed_kmh: BUS_AVERAGE_SPEED_KMH,
            walking_speed_kmh: WALKING_SPEED_KMH,
            snooze_minutes: DEFAULT_SNOOZE_MINUTES,
            proximity_radius_km: STOP_PROXIMITY_RADIUS_KM,
            sample_interval_secs: SAMPLE_INTERVAL_SECS,
        }
    }
}

impl TrackingConfig {
    pub fn validate(&self) -> Result<()> {
        for speed in [self.fallback_speed_kmh, self.walking_speed_kmh] {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(TrackingError::InvalidSpeed(speed));
            }
        }
        if self.snooze_minutes == 0 {
            return Err(TrackingError::InvalidSnooze(self.snooze_minutes));
        }
        if !self.proximity_radius_km.is_finite() || self.proximity_radius_km < 0.0 {
            return Err(TrackingError::InvalidDistance(self.proximity_radius_km));
        }
        Ok(())
    }
}

/// How long before arrival the alarm should go off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct AlarmConfig {
    lead_time_minutes: u32,
}

impl AlarmConfig {
    /// Lead times offered by the alarm picker. Any positive value is accepted.
    pub const OPTIONS: [u32; 6] = [5, 10, 15, 20, 25, 30];

    pub const DEFAULT_LEAD_TIME_MINUTES: u32 = 15;

    pub fn new(lead_time_minutes: u32) -> Result<Self> {
        if lead_time_minutes == 0 {
            return Err(TrackingError::InvalidLeadTime(lead_time_minutes));
        }
        Ok(Self { lead_time_minutes })
    }

    pub fn lead_time_minutes(&self) -> u32 {
        self.lead_time_minutes
    }

    /// Whether this lead time is one the picker offers
    pub fn is_preset(&self) -> bool {
        Self::OPTIONS.contains(&self.lead_time_minutes)
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            lead_time_minutes: Self::DEFAULT_LEAD_TIME_MINUTES,
        }
    }
}

impl TryFrom<u32> for AlarmConfig {
    type Error = TrackingError;

    fn try_from(lead_time_minutes: u32) -> Result<Self> {
        Self::new(lead_time_minutes)
    }
}

impl From<AlarmConfig> for u32 {
    fn from(config: AlarmConfig) -> Self {
        config.lead_time_minutes
    }
}
