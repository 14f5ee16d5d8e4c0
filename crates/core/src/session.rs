//! A tracking session: one rider, one bus route, one target stop.
//!
//! The session turns each position sample into route progress, an ETA and
//! an alarm decision, then publishes a [`TrackingSnapshot`] to subscribers.
//!
//! Calls are expected to be serialized by the host (one sample at a time per
//! session); `&mut self` receivers enforce that within Rust.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bus_alarm_transit::{
    bearing_degrees, is_within_km, progress_to_stop, Coordinate, PositionSample, Route, StopIdentifier,
    TransitError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::alarm::{AlarmEngine, AlarmSnapshot, AlarmState, AlarmTransition};
use crate::config::{AlarmConfig, BUS_AVERAGE_SPEED_KMH, STOP_PROXIMITY_RADIUS_KM};
use crate::error::{Result, TrackingError};
use crate::eta;
use crate::notify::{AlarmNotice, NotificationSink};

/// What the rider sees after each sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    pub bus_location: Coordinate,
    pub distance_remaining_km: f64,
    pub eta_minutes: f64,
    pub arrival_time: DateTime<Utc>,
    pub alarm_state: AlarmState,
    /// Direction of travel since the previous sample, if the bus moved
    pub heading_degrees: Option<f64>,
    pub recorded_at: DateTime<Utc>,
    /// Bus is within the proximity radius of the target stop
    pub near_stop: bool,
    /// Set on the final snapshot, when the bus reaches the stop
    pub arrived: bool,
}

/// Everything needed to start tracking.
#[derive(Clone, Debug)]
pub struct SessionSetup {
    pub route: Arc<Route>,
    pub target_stop: StopIdentifier,
    pub alarm: AlarmConfig,
    pub fallback_speed_kmh: f64,
    pub proximity_radius_km: f64,
    /// Alarm state persisted by a previous run of the host, if any
    pub restored_alarm: Option<AlarmSnapshot>,
}

impl SessionSetup {
    pub fn new(route: Arc<Route>, target_stop: impl Into<StopIdentifier>, alarm: AlarmConfig) -> Self {
        Self {
            route,
            target_stop: target_stop.into(),
            alarm,
            fallback_speed_kmh: BUS_AVERAGE_SPEED_KMH,
            proximity_radius_km: STOP_PROXIMITY_RADIUS_KM,
            restored_alarm: None,
        }
    }

    pub fn with_fallback_speed(mut self, speed_kmh: f64) -> Self {
        self.fallback_speed_kmh = speed_kmh;
        self
    }

    pub fn with_proximity_radius(mut self, radius_km: f64) -> Self {
        self.proximity_radius_km = radius_km;
        self
    }

    pub fn with_restored_alarm(mut self, snapshot: AlarmSnapshot) -> Self {
        self.restored_alarm = Some(snapshot);
        self
    }
}

// ============================================================================
// Subscribers
// ============================================================================

type Callback = Arc<dyn Fn(&TrackingSnapshot) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
}

fn lock(subscribers: &Mutex<Subscribers>) -> MutexGuard<'_, Subscribers> {
    // A panicking callback never holds the lock, so the list is still sound
    subscribers.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle returned by [`TrackingSession::subscribe`].
///
/// Dropping the handle does *not* unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription {
    id: u64,
    subscribers: Weak<Mutex<Subscribers>>,
}

impl Subscription {
    /// Stop receiving snapshots. Safe to call more than once, and from
    /// inside a callback.
    pub fn unsubscribe(&self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            lock(&subscribers).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Tracking,
    Arrived,
    Stopped,
}

pub struct TrackingSession {
    route: Arc<Route>,
    target_stop: StopIdentifier,
    alarm: AlarmConfig,
    fallback_speed_kmh: f64,
    proximity_radius_km: f64,
    engine: AlarmEngine,
    phase: Phase,
    last_snapshot: Option<TrackingSnapshot>,
    subscribers: Arc<Mutex<Subscribers>>,
    notifier: Option<Arc<dyn NotificationSink>>,
}

impl TrackingSession {
    /// Validate the setup and arm the alarm.
    ///
    /// A restored alarm snapshot takes precedence over `setup.alarm`, lead
    /// time included, unless it was idle, in which case the session arms fresh.
    pub fn start(setup: SessionSetup) -> Result<Self> {
        let SessionSetup {
            route,
            target_stop,
            alarm,
            fallback_speed_kmh,
            proximity_radius_km,
            restored_alarm,
        } = setup;

        route.validate()?;
        if route.stop(&target_stop).is_none() {
            return Err(TransitError::UnknownStop(target_stop).into());
        }
        if !fallback_speed_kmh.is_finite() || fallback_speed_kmh <= 0.0 {
            return Err(TrackingError::InvalidSpeed(fallback_speed_kmh));
        }
        if !proximity_radius_km.is_finite() || proximity_radius_km < 0.0 {
            return Err(TrackingError::InvalidDistance(proximity_radius_km));
        }

        let engine = match restored_alarm {
            Some(snapshot) if snapshot.state != AlarmState::Idle => AlarmEngine::restore(snapshot)?,
            _ => {
                let mut engine = AlarmEngine::new();
                engine.arm(alarm)?;
                engine
            }
        };
        let alarm = match engine.lead_time_minutes() {
            Some(lead_time_minutes) => AlarmConfig::new(lead_time_minutes)?,
            None => alarm,
        };

        info!(
            route = %route.id,
            stop = %target_stop,
            lead_time = ?engine.lead_time_minutes(),
            alarm = %engine.state(),
            "tracking started"
        );

        Ok(Self {
            route,
            target_stop,
            alarm,
            fallback_speed_kmh,
            proximity_radius_km,
            engine,
            phase: Phase::Tracking,
            last_snapshot: None,
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
            notifier: None,
        })
    }

    /// Send fired alarms to `sink`.
    pub fn with_notifier(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.notifier = Some(Arc::new(sink));
        self
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    pub fn target_stop(&self) -> &StopIdentifier {
        &self.target_stop
    }

    pub fn alarm_config(&self) -> AlarmConfig {
        self.alarm
    }

    pub fn alarm_state(&self) -> AlarmState {
        self.engine.state()
    }

    /// Alarm state in a form the host can persist and hand back to `start`.
    pub fn alarm_snapshot(&self) -> AlarmSnapshot {
        self.engine.snapshot()
    }

    pub fn last_snapshot(&self) -> Option<&TrackingSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn has_arrived(&self) -> bool {
        self.phase == Phase::Arrived
    }

    pub fn is_stopped(&self) -> bool {
        self.phase == Phase::Stopped
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).entries.len()
    }

    /// Register a listener, called synchronously for every published
    /// snapshot in subscription order.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&TrackingSnapshot) + Send + Sync + 'static,
    {
        let mut subscribers = lock(&self.subscribers);
        let id = subscribers.next_id;
        subscribers.next_id += 1;
        subscribers.entries.push((id, Arc::new(callback)));

        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Ingest one position sample.
    ///
    /// Returns `Ok(None)` when the sample was ignored because the session
    /// has stopped or the bus already arrived. A rejected sample leaves the
    /// session untouched.
    pub fn on_position_sample(&mut self, sample: PositionSample) -> Result<Option<TrackingSnapshot>> {
        match self.phase {
            Phase::Tracking => {}
            Phase::Arrived | Phase::Stopped => {
                debug!(phase = ?self.phase, "position sample ignored");
                return Ok(None);
            }
        }

        let progress = progress_to_stop(&self.route, sample.coordinates, &self.target_stop)?;
        let estimate = eta::estimate(
            progress.distance_remaining_to_stop_km,
            sample.speed_kmh,
            self.fallback_speed_kmh,
            sample.timestamp,
        )?;

        if let Some(previous) = &self.last_snapshot {
            if sample.timestamp < previous.recorded_at {
                warn!(
                    sample = %sample.timestamp,
                    previous = %previous.recorded_at,
                    "position sample older than the previous one"
                );
            }
        }

        let heading_degrees = self
            .last_snapshot
            .as_ref()
            .map(|previous| previous.bus_location)
            .filter(|previous| *previous != sample.coordinates)
            .map(|previous| bearing_degrees(previous, sample.coordinates));

        let near_stop = self
            .route
            .stop(&self.target_stop)
            .is_some_and(|stop| is_within_km(sample.coordinates, stop.coordinates, self.proximity_radius_km));

        let transition = self.engine.on_eta_update(estimate.minutes);
        let arrived = progress.distance_remaining_to_stop_km <= 0.0;

        let snapshot = TrackingSnapshot {
            bus_location: sample.coordinates,
            distance_remaining_km: progress.distance_remaining_to_stop_km,
            eta_minutes: estimate.minutes,
            arrival_time: estimate.arrival,
            alarm_state: self.engine.state(),
            heading_degrees,
            recorded_at: sample.timestamp,
            near_stop,
            arrived,
        };

        debug!(
            segment = progress.nearest_polyline_index,
            traveled_km = progress.distance_traveled_km,
            remaining_km = snapshot.distance_remaining_km,
            eta_minutes = snapshot.eta_minutes,
            alarm = %snapshot.alarm_state,
            "position sample processed"
        );

        if transition == AlarmTransition::Fired {
            self.notify(&snapshot);
        }

        if arrived {
            self.phase = Phase::Arrived;
            info!(route = %self.route.id, stop = %self.target_stop, "bus arrived at stop");
        }

        self.last_snapshot = Some(snapshot.clone());
        self.publish(&snapshot);

        Ok(Some(snapshot))
    }

    /// Advance the alarm clock. Drive this from a coarse timer.
    pub fn tick(&mut self, now: DateTime<Utc>) -> AlarmTransition {
        if self.phase == Phase::Stopped {
            return AlarmTransition::Unchanged;
        }
        self.engine.tick(now)
    }

    pub fn snooze(&mut self, snooze_minutes: u32, now: DateTime<Utc>) -> Result<()> {
        self.engine.snooze(snooze_minutes, now)
    }

    /// Change the lead time, or arm an idle alarm.
    pub fn reconfigure_alarm(&mut self, alarm: AlarmConfig) -> Result<()> {
        self.ensure_not_stopped("reconfigure the alarm")?;
        self.engine.arm(alarm)?;
        self.alarm = alarm;
        Ok(())
    }

    /// Track a different stop on the same route, with a fresh alarm.
    pub fn retarget(&mut self, target_stop: impl Into<StopIdentifier>, alarm: AlarmConfig) -> Result<()> {
        self.ensure_not_stopped("retarget")?;
        let target_stop = target_stop.into();
        if self.route.stop(&target_stop).is_none() {
            return Err(TransitError::UnknownStop(target_stop).into());
        }

        self.engine.reset();
        self.engine.arm(alarm)?;
        self.alarm = alarm;
        self.target_stop = target_stop;
        self.last_snapshot = None;
        self.phase = Phase::Tracking;

        info!(route = %self.route.id, stop = %self.target_stop, "tracking retargeted");
        Ok(())
    }

    /// Clear arrival and alarm state so samples are accepted again.
    ///
    /// The alarm is left idle until [`Self::reconfigure_alarm`] arms it.
    /// Does nothing once the session is stopped.
    pub fn reset(&mut self) {
        if self.phase == Phase::Stopped {
            return;
        }
        self.engine.reset();
        self.last_snapshot = None;
        self.phase = Phase::Tracking;
    }

    /// Tear the session down for good: no more samples, alarms or subscribers.
    pub fn stop(&mut self) {
        if self.phase == Phase::Stopped {
            return;
        }

        self.engine.reset();
        self.phase = Phase::Stopped;
        lock(&self.subscribers).entries.clear();
        info!(route = %self.route.id, stop = %self.target_stop, "tracking stopped");
    }

    fn ensure_not_stopped(&self, operation: &'static str) -> Result<()> {
        if self.phase == Phase::Stopped {
            return Err(TrackingError::SessionStopped { operation });
        }
        Ok(())
    }

    fn notify(&self, snapshot: &TrackingSnapshot) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let Some(stop) = self.route.stop(&self.target_stop) else {
            return;
        };

        notifier.alarm_fired(&AlarmNotice {
            route_id: self.route.id.clone(),
            stop_id: stop.id.clone(),
            stop_name: stop.name.clone(),
            eta_minutes: snapshot.eta_minutes,
            distance_remaining_km: snapshot.distance_remaining_km,
            lead_time_minutes: self.engine.lead_time_minutes().unwrap_or(self.alarm.lead_time_minutes()),
        });
    }

    fn publish(&self, snapshot: &TrackingSnapshot) {
        // Copy first so callbacks can (un)subscribe without affecting this pass
        let callbacks: Vec<Callback> = lock(&self.subscribers)
            .entries
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();

        for callback in callbacks {
            callback(snapshot);
        }
    }
}
