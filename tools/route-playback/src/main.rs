use anyhow::{bail, Context, Result};
use bus_alarm_core::transit::prelude::*;
use bus_alarm_core::{
    eta, AlarmConfig, AlarmState, AlarmTransition, RoutePlayback, SessionSetup, TracingNotifier, TrackingConfig,
    TrackingSession, TrackingSnapshot,
};
use chrono::{TimeDelta, Utc};
use clap::Parser;
use std::{fs, path::PathBuf, time::Duration};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod demo;

#[derive(Parser, Debug)]
#[command(
    name = "route-playback",
    author,
    version,
    about = "Play a simulated bus along a route and watch the arrival alarm",
    long_about = "Drives a bus along a route polyline at a constant speed, feeding each \
                  position into a tracking session. Every snapshot is logged, along with \
                  the alarm firing once the ETA to the target stop drops within the lead time.\n\n\
                  Without --routes the built-in BUS001 and BUS002 routes are used."
)]
struct Args {
    /// JSON file with a list of routes
    #[arg(short, long)]
    routes: Option<PathBuf>,

    /// Route to follow
    #[arg(short, long, default_value = "BUS001")]
    bus: String,

    /// Stop to set the alarm for (defaults to the last stop of the route)
    #[arg(short, long)]
    stop: Option<String>,

    /// Minutes before arrival the alarm goes off
    #[arg(short, long, default_value_t = AlarmConfig::DEFAULT_LEAD_TIME_MINUTES)]
    lead_time: u32,

    /// Simulated bus speed in km/h
    #[arg(long, default_value_t = 40.0)]
    speed: f64,

    /// Real time between samples in milliseconds
    #[arg(long, default_value_t = 250)]
    interval_ms: u64,

    /// Snooze the alarm when it fires instead of dismissing it
    #[arg(long)]
    snooze: bool,

    /// JSON tracking config (fallback speed, snooze length, sample interval)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output (show debug messages)
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().without_time())
        .with(filter)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<TrackingConfig> {
    let Some(path) = path else {
        return Ok(TrackingConfig::default());
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: TrackingConfig = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    config.validate().context("Invalid tracking config")?;
    Ok(config)
}

fn load_routes(path: Option<&PathBuf>) -> Result<StaticRouteProvider> {
    let routes = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read routes {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse routes {}", path.display()))?
        }
        None => demo::routes(),
    };

    StaticRouteProvider::from_routes(routes).context("Invalid route data")
}

fn log_snapshot(snapshot: &TrackingSnapshot) {
    info!(
        lat = snapshot.bus_location.latitude,
        lon = snapshot.bus_location.longitude,
        remaining_km = snapshot.distance_remaining_km,
        eta_minutes = snapshot.eta_minutes,
        arrival = %snapshot.arrival_time.format("%H:%M"),
        alarm = %snapshot.alarm_state,
        near_stop = snapshot.near_stop,
        "bus position"
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let config = load_config(args.config.as_ref())?;
    let provider = load_routes(args.routes.as_ref())?;

    let route = provider
        .require_route(&RouteIdentifier::new(&args.bus))
        .with_context(|| format!("Available routes: {}", route_list(&provider)))?;

    let target_stop = match &args.stop {
        Some(stop) => StopIdentifier::new(stop),
        None => match route.stops.last() {
            Some(stop) => stop.id.clone(),
            None => bail!("Route {} has no stops", route.id),
        },
    };
    let stop_name = route
        .stop(&target_stop)
        .map(|stop| stop.name.clone())
        .with_context(|| format!("Stop {target_stop} is not on route {}", route.id))?;

    let alarm = AlarmConfig::new(args.lead_time).context("Invalid lead time")?;
    if !alarm.is_preset() {
        warn!(lead_time = args.lead_time, "lead time is not one of the app's presets");
    }

    info!("=== Route Playback ===");
    info!("Route: {} ({}, {:.2} km)", route.id, route.name, route.length_km());
    info!("Target: {} ({})", stop_name, target_stop);
    info!("Alarm: {} min before arrival", alarm.lead_time_minutes());

    let start = Utc::now();
    let sample_interval = TimeDelta::try_seconds(config.sample_interval_secs as i64)
        .context("Sample interval out of range")?;
    let playback = RoutePlayback::new(&route, args.speed, sample_interval, start)
        .context("Cannot play back route")?;

    // Stops the rider could walk to from where the bus sets off
    if let Some(origin) = route.polyline.first() {
        for nearby in provider.stops_near(*origin, config.proximity_radius_km) {
            let walk = eta::estimate(nearby.distance_km, None, config.walking_speed_kmh, start)?;
            info!(
                route = %nearby.route_id,
                stop = %nearby.stop.name,
                walk_minutes = walk.minutes,
                "stop near the start of the route"
            );
        }
    }

    let setup = SessionSetup::new(route.clone(), target_stop, alarm)
        .with_fallback_speed(config.fallback_speed_kmh)
        .with_proximity_radius(config.proximity_radius_km);
    let mut session = TrackingSession::start(setup)?.with_notifier(TracingNotifier);
    let subscription = session.subscribe(log_snapshot);

    let mut timer = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    let mut samples = 0usize;
    let mut last_at = start;

    for sample in playback {
        timer.tick().await;

        let now = sample.timestamp;
        if session.tick(now) == AlarmTransition::Rearmed {
            info!("snooze over, alarm armed again");
        }

        let Some(snapshot) = session.on_position_sample(sample)? else {
            break;
        };
        samples += 1;
        last_at = snapshot.recorded_at;

        if snapshot.alarm_state == AlarmState::Fired {
            if args.snooze {
                session.snooze(config.snooze_minutes, now)?;
                info!(minutes = config.snooze_minutes, "alarm snoozed");
            } else {
                // Dismissing leaves the alarm idle for the rest of the ride
                session.reset();
                info!("alarm dismissed");
            }
        }

        if snapshot.arrived {
            break;
        }
    }

    subscription.unsubscribe();
    session.stop();

    info!("=== Playback Complete ===");
    info!("Samples: {}", samples);
    info!("Simulated time: {} min", (last_at - start).num_minutes());

    Ok(())
}

fn route_list(provider: &StaticRouteProvider) -> String {
    let mut ids: Vec<String> = provider.all_routes().iter().map(|r| r.id.to_string()).collect();
    ids.sort();
    ids.join(", ")
}
