// 50 Hz loop dispatching gait commands
// Gaits block for seconds at a time, so they run one at a time on a
// blocking worker while this loop keeps draining the command topic and
// publishing telemetry. A command arriving mid-gait replaces the queued
// successor; it never interrupts the gait already walking.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{self, JoinHandle};
use tokio::time::interval;
use tracing::{info, warn};

// local imports
use crate::config::{
    BATTERY_PERIOD, FOOT_CALIBRATION, HARDWARE_ENABLED, LOOP_HZ, MOTION_RATE_DEG_S,
    SERVO_CHANNELS, SERVO_PORT, TOPIC_BATTERY, TOPIC_CMD_GAIT, TOPIC_HEALTH,
};
use crate::gait::{Legs, HEXAPOD};
use crate::messages::{BatteryTelemetry, GaitCommand, RuntimeHealth};
use crate::motion::{MotionDispatcher, MotionState};
use crate::servo::{DriverError, ServoDriver, SimServo, Ssc32Servo};

/// Build a fully configured driver: every actuator bound to its output at
/// the common ramp rate, every foot calibrated for its linkage. `None`
/// selects the simulator.
pub fn setup_driver(port: Option<&str>) -> Result<Box<dyn ServoDriver>, DriverError> {
    let mut driver: Box<dyn ServoDriver> = match port {
        Some(port) => Box::new(Ssc32Servo::open(port)?),
        None => {
            info!("Hardware disabled, driving the simulator");
            Box::new(SimServo::new())
        }
    };

    for (actuator, &channel) in SERVO_CHANNELS.iter().enumerate() {
        driver.configure(actuator, channel)?;
        driver.set_motion_rate(actuator, MOTION_RATE_DEG_S)?;
    }
    for foot in HEXAPOD.all_feet().iter() {
        driver.calibrate(foot, FOOT_CALIBRATION)?;
    }
    Ok(driver)
}

struct Runtime {
    queued: Option<GaitCommand>,
    active: Option<JoinHandle<()>>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            queued: None,
            active: None,
        }
    }

    /// Process incoming command
    fn on_command(&mut self, cmd: GaitCommand) {
        info!("Received command: {:?}", cmd);
        if let Some(stale) = self.queued.replace(cmd) {
            warn!("Dropping queued {:?} in favor of {:?}", stale, cmd);
        }
    }

    /// Reap a finished gait, then start the queued command if the legs
    /// are free.
    async fn advance(&mut self, legs: &Arc<Legs>) -> Result<(), task::JoinError> {
        if self.active.as_ref().is_some_and(|gait| gait.is_finished()) {
            if let Some(gait) = self.active.take() {
                gait.await?;
                info!("Gait finished");
            }
        }
        if self.active.is_none() {
            if let Some(cmd) = self.queued.take() {
                let legs = legs.clone();
                self.active = Some(task::spawn_blocking(move || execute(&legs, cmd)));
            }
        }
        Ok(())
    }

    fn health(&self) -> RuntimeHealth {
        if self.active.is_some() {
            RuntimeHealth::Walking
        } else {
            RuntimeHealth::Idle
        }
    }
}

/// Run one command to completion on the calling (blocking) thread.
fn execute(legs: &Legs, cmd: GaitCommand) {
    match cmd {
        GaitCommand::Tripod { cycles } => legs.tripod(cycles),
        GaitCommand::Sway { cycles } => legs.sway(cycles),
        GaitCommand::Bob { cycles } => legs.bob(cycles),
        GaitCommand::Ripple { cycles } => legs.ripple(cycles),
        GaitCommand::HipsLeft => legs.hips_left(),
        GaitCommand::HipsRight => legs.hips_right(),
        GaitCommand::HipsCenter => legs.hips_center(),
        GaitCommand::FeetUp => legs.feet_up(),
        GaitCommand::FeetUpHigh => legs.feet_up_high(),
        GaitCommand::FeetDown => legs.feet_down(),
        GaitCommand::FeetIn => legs.feet_in(),
        GaitCommand::Neutral => legs.neutral(),
        GaitCommand::Showcase => legs.showcase(),
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let port = if HARDWARE_ENABLED {
        Some(SERVO_PORT)
    } else {
        None
    };
    let driver: Arc<dyn ServoDriver> = Arc::from(setup_driver(port)?);

    let state = Arc::new(MotionState::new());
    let legs = Arc::new(Legs::new(
        MotionDispatcher::new(state, driver.clone()),
        &HEXAPOD,
    ));

    info!("Staggering servos to neutral...");
    let startup = legs.clone();
    task::spawn_blocking(move || startup.stagger_to_neutral()).await?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_GAIT).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;
    let pub_battery = session.declare_publisher(TOPIC_BATTERY).await?;

    let mut runtime = Runtime::new();
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));
    let mut battery_read_at: Option<Instant> = None;

    info!("Runtime started: {}Hz loop", LOOP_HZ);
    info!("Subscribed to: {}", TOPIC_CMD_GAIT);
    info!("Publishing to: {}, {}", TOPIC_HEALTH, TOPIC_BATTERY);

    loop {
        tick.tick().await;

        // 1. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<GaitCommand>(&payload) {
                Ok(cmd) => {
                    runtime.on_command(cmd);
                }
                Err(e) => {
                    warn!("Failed to parse command: {}", e);
                }
            }
        }

        // 2. Reap / start gait work
        runtime.advance(&legs).await?;

        // 3. Battery telemetry on its own period
        if battery_read_at.is_none_or(|at| at.elapsed() >= BATTERY_PERIOD) {
            battery_read_at = Some(Instant::now());
            match driver.read_battery_mv() {
                Ok(mv) => {
                    info!("Battery: {}.{:02} V", mv / 1000, (mv % 1000) / 10);
                    let telemetry = serde_json::to_string(&BatteryTelemetry { battery_mv: mv })?;
                    pub_battery.put(telemetry).await?;
                }
                Err(e) => {
                    warn!("Battery read failed: {}", e);
                }
            }
        }

        // 4. Publish health
        let health_json = serde_json::to_string(&runtime.health())?;
        pub_health.put(health_json).await?;
    }
}
