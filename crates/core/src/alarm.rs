//! Lead-time alarm state machine.
//!
//! ```text
//!          arm            eta <= lead          snooze(n)
//!   Idle ───────▶ Armed ─────────────▶ Fired ───────────▶ Snoozed
//!    ▲              ▲                                       │
//!    │              └───────────── tick(now >= re_arm_at) ──┘
//!    └──────────────────── reset (from any state) ──────────
//! ```
//!
//! The engine fires at most once per arm/reset cycle. The threshold is
//! inclusive: an ETA equal to the lead time fires straight away.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, info};

use crate::config::AlarmConfig;
use crate::error::{Result, TrackingError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlarmState {
    #[default]
    Idle,
    Armed,
    Fired,
    Snoozed,
}

/// What a call did to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlarmTransition {
    Unchanged,
    /// The threshold was crossed; notify the rider.
    Fired,
    /// A snooze ran out and the alarm is live again.
    Rearmed,
}

impl AlarmTransition {
    pub fn fired(self) -> bool {
        self == Self::Fired
    }
}

/// Persistable form of an engine, for restoring after the host restarts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmSnapshot {
    pub state: AlarmState,
    pub lead_time_minutes: Option<u32>,
    pub re_arm_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default)]
pub struct AlarmEngine {
    state: AlarmState,
    config: Option<AlarmConfig>,
    re_arm_at: Option<DateTime<Utc>>,
}

impl AlarmEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an engine from a persisted snapshot.
    pub fn restore(snapshot: AlarmSnapshot) -> Result<Self> {
        let config = snapshot.lead_time_minutes.map(AlarmConfig::new).transpose()?;

        let consistent = match snapshot.state {
            AlarmState::Idle => config.is_none() && snapshot.re_arm_at.is_none(),
            AlarmState::Armed | AlarmState::Fired => {
                config.is_some() && snapshot.re_arm_at.is_none()
            }
            AlarmState::Snoozed => config.is_some() && snapshot.re_arm_at.is_some(),
        };
        if !consistent {
            return Err(TrackingError::InvalidAlarmSnapshot(format!("{snapshot:?}")));
        }

        Ok(Self {
            state: snapshot.state,
            config,
            re_arm_at: snapshot.re_arm_at,
        })
    }

    pub fn snapshot(&self) -> AlarmSnapshot {
        AlarmSnapshot {
            state: self.state,
            lead_time_minutes: self.lead_time_minutes(),
            re_arm_at: self.re_arm_at,
        }
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn lead_time_minutes(&self) -> Option<u32> {
        self.config.map(|c| c.lead_time_minutes())
    }

    pub fn re_arm_at(&self) -> Option<DateTime<Utc>> {
        self.re_arm_at
    }

    /// Arm the alarm, or change the lead time of one that is already set.
    ///
    /// A fired alarm has to be reset before it can be armed again.
    pub fn arm(&mut self, config: AlarmConfig) -> Result<()> {
        match self.state {
            AlarmState::Fired => {
                return Err(TrackingError::InvalidTransition {
                    state: self.state,
                    operation: "arm",
                });
            }
            AlarmState::Idle => {
                self.state = AlarmState::Armed;
                info!(lead_time = config.lead_time_minutes(), "alarm armed");
            }
            AlarmState::Armed | AlarmState::Snoozed => {
                debug!(
                    state = %self.state,
                    lead_time = config.lead_time_minutes(),
                    "alarm lead time updated"
                );
            }
        }

        self.config = Some(config);
        Ok(())
    }

    /// Feed a fresh ETA. Only an armed alarm reacts.
    pub fn on_eta_update(&mut self, eta_minutes: f64) -> AlarmTransition {
        let Some(config) = self.config else {
            return AlarmTransition::Unchanged;
        };
        if self.state != AlarmState::Armed {
            return AlarmTransition::Unchanged;
        }

        if eta_minutes <= f64::from(config.lead_time_minutes()) {
            self.state = AlarmState::Fired;
            info!(eta_minutes, lead_time = config.lead_time_minutes(), "alarm fired");
            AlarmTransition::Fired
        } else {
            AlarmTransition::Unchanged
        }
    }

    /// Silence a fired alarm for `snooze_minutes`.
    pub fn snooze(&mut self, snooze_minutes: u32, now: DateTime<Utc>) -> Result<()> {
        if self.state != AlarmState::Fired {
            return Err(TrackingError::InvalidTransition {
                state: self.state,
                operation: "snooze",
            });
        }
        if snooze_minutes == 0 {
            return Err(TrackingError::InvalidSnooze(snooze_minutes));
        }

        let re_arm_at = TimeDelta::try_minutes(i64::from(snooze_minutes))
            .and_then(|delta| now.checked_add_signed(delta))
            .ok_or(TrackingError::SnoozeOutOfRange)?;
        self.state = AlarmState::Snoozed;
        self.re_arm_at = Some(re_arm_at);
        info!(%re_arm_at, "alarm snoozed");
        Ok(())
    }

    /// Advance the clock; re-arms a snoozed alarm once its time is up.
    pub fn tick(&mut self, now: DateTime<Utc>) -> AlarmTransition {
        match (self.state, self.re_arm_at) {
            (AlarmState::Snoozed, Some(re_arm_at)) if now >= re_arm_at => {
                self.state = AlarmState::Armed;
                self.re_arm_at = None;
                info!("alarm re-armed after snooze");
                AlarmTransition::Rearmed
            }
            _ => AlarmTransition::Unchanged,
        }
    }

    /// Back to `Idle`, forgetting the lead time.
    pub fn reset(&mut self) {
        if self.state != AlarmState::Idle {
            debug!(state = %self.state, "alarm reset");
        }
        self.state = AlarmState::Idle;
        self.config = None;
        self.re_arm_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 7, 30, 0).unwrap()
    }

    fn armed(lead: u32) -> AlarmEngine {
        let mut engine = AlarmEngine::new();
        engine.arm(AlarmConfig::new(lead).unwrap()).unwrap();
        engine
    }

    #[test]
    fn test_starts_idle() {
        let engine = AlarmEngine::new();
        assert_eq!(engine.state(), AlarmState::Idle);
        assert_eq!(engine.lead_time_minutes(), None);
    }

    #[test]
    fn test_idle_ignores_eta() {
        let mut engine = AlarmEngine::new();
        assert_eq!(engine.on_eta_update(0.0), AlarmTransition::Unchanged);
        assert_eq!(engine.state(), AlarmState::Idle);
    }

    #[test]
    fn test_fires_once_on_threshold_crossing() {
        let mut engine = armed(15);

        let fired: Vec<bool> = [20.0, 16.0, 15.0, 10.0]
            .into_iter()
            .map(|eta| engine.on_eta_update(eta).fired())
            .collect();

        assert_eq!(fired, vec![false, false, true, false]);
        assert_eq!(engine.state(), AlarmState::Fired);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut engine = armed(10);
        assert!(engine.on_eta_update(10.0).fired());
    }

    #[test]
    fn test_zero_eta_fires() {
        let mut engine = armed(5);
        assert!(engine.on_eta_update(0.0).fired());
    }

    #[test]
    fn test_rearm_updates_lead_time() {
        let mut engine = armed(15);
        engine.arm(AlarmConfig::new(5).unwrap()).unwrap();

        assert_eq!(engine.state(), AlarmState::Armed);
        assert_eq!(engine.lead_time_minutes(), Some(5));
        assert!(!engine.on_eta_update(10.0).fired());
        assert!(engine.on_eta_update(5.0).fired());
    }

    #[test]
    fn test_arm_while_fired_rejected() {
        let mut engine = armed(15);
        engine.on_eta_update(3.0);

        let result = engine.arm(AlarmConfig::new(20).unwrap());

        assert!(matches!(
            result,
            Err(TrackingError::InvalidTransition { state: AlarmState::Fired, .. })
        ));
        assert_eq!(engine.state(), AlarmState::Fired);
        assert_eq!(engine.lead_time_minutes(), Some(15));
    }

    #[test]
    fn test_snooze_and_rearm() {
        let mut engine = armed(15);
        engine.on_eta_update(12.0);
        engine.snooze(5, now()).unwrap();
        assert_eq!(engine.state(), AlarmState::Snoozed);

        // Snoozed alarms don't fire
        assert_eq!(engine.on_eta_update(1.0), AlarmTransition::Unchanged);

        assert_eq!(engine.tick(now() + TimeDelta::minutes(4)), AlarmTransition::Unchanged);
        assert_eq!(engine.state(), AlarmState::Snoozed);

        assert_eq!(engine.tick(now() + TimeDelta::minutes(5)), AlarmTransition::Rearmed);
        assert_eq!(engine.state(), AlarmState::Armed);
        assert_eq!(engine.re_arm_at(), None);

        // Ready to fire again
        assert!(engine.on_eta_update(11.0).fired());
    }

    #[test]
    fn test_snooze_requires_fired() {
        let mut engine = armed(15);

        let result = engine.snooze(5, now());

        assert!(matches!(
            result,
            Err(TrackingError::InvalidTransition { state: AlarmState::Armed, .. })
        ));
        assert_eq!(engine.state(), AlarmState::Armed);
    }

    #[test]
    fn test_zero_snooze_rejected() {
        let mut engine = armed(15);
        engine.on_eta_update(1.0);

        assert!(matches!(engine.snooze(0, now()), Err(TrackingError::InvalidSnooze(0))));
        assert_eq!(engine.state(), AlarmState::Fired);
    }

    #[test]
    fn test_snooze_past_end_of_time_rejected() {
        let mut engine = armed(15);
        engine.on_eta_update(1.0);

        let result = engine.snooze(5, DateTime::<Utc>::MAX_UTC - TimeDelta::minutes(1));

        assert!(matches!(result, Err(TrackingError::SnoozeOutOfRange)));
        assert_eq!(engine.state(), AlarmState::Fired);
        assert_eq!(engine.re_arm_at(), None);
    }

    #[test]
    fn test_arm_while_snoozed_keeps_snooze() {
        let mut engine = armed(15);
        engine.on_eta_update(1.0);
        engine.snooze(5, now()).unwrap();

        engine.arm(AlarmConfig::new(20).unwrap()).unwrap();

        assert_eq!(engine.state(), AlarmState::Snoozed);
        assert_eq!(engine.lead_time_minutes(), Some(20));
    }

    #[test]
    fn test_tick_outside_snooze_is_noop() {
        let mut engine = armed(15);
        assert_eq!(engine.tick(now()), AlarmTransition::Unchanged);
        assert_eq!(engine.state(), AlarmState::Armed);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut engine = armed(15);
        engine.on_eta_update(1.0);

        engine.reset();
        let first = engine.snapshot();
        engine.reset();

        assert_eq!(engine.state(), AlarmState::Idle);
        assert_eq!(engine.snapshot(), first);
        assert_eq!(first.lead_time_minutes, None);
    }

    #[test]
    fn test_reset_then_arm_fires_again() {
        let mut engine = armed(15);
        assert!(engine.on_eta_update(1.0).fired());

        engine.reset();
        engine.arm(AlarmConfig::new(15).unwrap()).unwrap();

        assert!(engine.on_eta_update(1.0).fired());
    }

    #[test]
    fn test_snapshot_restore() {
        let mut engine = armed(10);
        engine.on_eta_update(2.0);
        engine.snooze(5, now()).unwrap();

        let json = serde_json::to_string(&engine.snapshot()).unwrap();
        let snapshot: AlarmSnapshot = serde_json::from_str(&json).unwrap();
        let mut restored = AlarmEngine::restore(snapshot).unwrap();

        assert_eq!(restored.state(), AlarmState::Snoozed);
        assert_eq!(restored.lead_time_minutes(), Some(10));
        assert_eq!(restored.tick(now() + TimeDelta::minutes(5)), AlarmTransition::Rearmed);
    }

    #[test]
    fn test_restore_rejects_inconsistent_snapshot() {
        let armed_without_lead = AlarmSnapshot {
            state: AlarmState::Armed,
            lead_time_minutes: None,
            re_arm_at: None,
        };
        assert!(matches!(
            AlarmEngine::restore(armed_without_lead),
            Err(TrackingError::InvalidAlarmSnapshot(_))
        ));

        let zero_lead = AlarmSnapshot {
            state: AlarmState::Armed,
            lead_time_minutes: Some(0),
            re_arm_at: None,
        };
        assert!(matches!(
            AlarmEngine::restore(zero_lead),
            Err(TrackingError::InvalidLeadTime(0))
        ));
    }

    #[test]
    fn test_state_names() {
        assert_eq!(AlarmState::Snoozed.to_string(), "snoozed");
        assert_eq!("fired".parse::<AlarmState>().unwrap(), AlarmState::Fired);
    }
}
