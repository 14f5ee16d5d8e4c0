//! # bus-alarm-core
//!
//! Arrival estimation and the "wake me before my stop" alarm.
//!
//! A [`TrackingSession`] follows one bus toward one stop. Feed it position
//! samples and it publishes a [`TrackingSnapshot`] after each one, firing the
//! rider's alarm once the ETA drops within their lead time.

pub mod alarm;
pub mod config;
pub mod error;
pub mod eta;
pub mod notify;
pub mod session;
pub mod simulation;

// Re-export transit from the transit crate
pub use bus_alarm_transit as transit;

pub use alarm::{AlarmEngine, AlarmSnapshot, AlarmState, AlarmTransition};
pub use config::{AlarmConfig, TrackingConfig};
pub use error::{Result, TrackingError};
pub use eta::EtaEstimate;
pub use notify::{AlarmNotice, NotificationSink, TracingNotifier};
pub use session::{SessionSetup, Subscription, TrackingSession, TrackingSnapshot};
pub use simulation::RoutePlayback;
