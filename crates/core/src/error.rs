use bus_alarm_transit::TransitError;

use crate::alarm::AlarmState;

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error(transparent)]
    Transit(#[from] TransitError),

    #[error("Invalid speed: {0} km/h")]
    InvalidSpeed(f64),

    #[error("Invalid sample interval: {0}")]
    InvalidInterval(chrono::TimeDelta),

    #[error("Invalid distance: {0} km")]
    InvalidDistance(f64),

    #[error("Estimated arrival is out of the representable time range")]
    EtaOutOfRange,

    #[error("Cannot {operation} while alarm is {state}")]
    InvalidTransition {
        state: AlarmState,
        operation: &'static str,
    },

    #[error("Lead time must be at least one minute, got {0}")]
    InvalidLeadTime(u32),

    #[error("Snooze must be at least one minute, got {0}")]
    InvalidSnooze(u32),

    #[error("Cannot {operation} after the session was stopped")]
    SessionStopped { operation: &'static str },

    #[error("Snooze end is out of the representable time range")]
    SnoozeOutOfRange,

    #[error("Inconsistent alarm snapshot: {0}")]
    InvalidAlarmSnapshot(String),
}

pub type Result<T> = std::result::Result<T, TrackingError>;
