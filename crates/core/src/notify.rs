//! Where fired alarms go.
//!
//! The core only decides *that* a rider should be alerted. Delivering the
//! alert (push notification, sound, vibration) belongs to the host.

use std::sync::Arc;

use bus_alarm_transit::{RouteIdentifier, StopIdentifier};
use tracing::info;

/// Everything a host needs to word an "your bus is close" alert.
#[derive(Clone, Debug, PartialEq)]
pub struct AlarmNotice {
    pub route_id: RouteIdentifier,
    pub stop_id: StopIdentifier,
    pub stop_name: Arc<str>,
    pub eta_minutes: f64,
    pub distance_remaining_km: f64,
    pub lead_time_minutes: u32,
}

pub trait NotificationSink: Send + Sync {
    fn alarm_fired(&self, notice: &AlarmNotice);
}

impl<F> NotificationSink for F
where
    F: Fn(&AlarmNotice) + Send + Sync,
{
    fn alarm_fired(&self, notice: &AlarmNotice) {
        self(notice)
    }
}

/// Logs alarms instead of delivering them. Handy for simulations.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn alarm_fired(&self, notice: &AlarmNotice) {
        info!(
            route = %notice.route_id,
            stop = %notice.stop_id,
            stop_name = %notice.stop_name,
            eta_minutes = notice.eta_minutes,
            distance_km = notice.distance_remaining_km,
            lead_time = notice.lead_time_minutes,
            "bus arriving soon"
        );
    }
}
