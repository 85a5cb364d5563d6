// SSC-32 serial servo controller driver.
//
// The controller speaks a text line protocol:
//   "#<ch>P<pulse>T<time>\r"  timed move, controller owns the ramp
//   "VER\r"                   firmware banner, CR-terminated
//   "VA\r"                    one raw byte of battery analog
//
// A commanded move is considered done when its time window elapses; the
// shared scheduler fires the completion then. The controller offers no
// positive completion report during a ramp, so the window is the contract.

use std::io::Read;
use std::sync::Mutex;
use std::time::Duration;

use serialport::{self, SerialPort};
use tracing::{debug, info, warn};

use crate::motion::Completion;
use crate::servo::schedule::CompletionScheduler;
use crate::servo::{
    move_duration, DriverError, PulseCalibration, Result, ServoChannel, ServoDriver,
    DEFAULT_RATE_DEG_S,
};

/// Default serial configuration for the controller
pub const DEFAULT_BAUD: u32 = 115_200;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Outputs on one board.
const MAX_CHANNELS: u8 = 32;

/// The battery query returns one count per this many millivolts.
const BATTERY_MV_PER_COUNT: u32 = 59;

/// Longest version banner we accept before declaring the link garbage.
const MAX_BANNER_BYTES: usize = 64;

struct Channel {
    pin: u8,
    rate_deg_s: u32,
    cal: PulseCalibration,
    last_cdeg: i32,
}

struct Bus {
    port: Box<dyn SerialPort>,
    channels: Vec<Option<Channel>>,
}

/// Driver for an SSC-32 style serial servo controller.
pub struct Ssc32Servo {
    bus: Mutex<Bus>,
    scheduler: CompletionScheduler,
}

impl Ssc32Servo {
    /// Open the port and probe the controller. A board that does not
    /// answer the version query fails the open.
    pub fn open(port_name: &str) -> Result<Ssc32Servo> {
        Self::open_with_baud(port_name, DEFAULT_BAUD)
    }

    pub fn open_with_baud(port_name: &str, baud: u32) -> Result<Ssc32Servo> {
        info!("Opening servo controller on {}", port_name);
        let mut port = serialport::new(port_name, baud)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        let banner = probe(port.as_mut())?;
        info!("Servo controller firmware: {}", banner.trim());

        Ok(Ssc32Servo {
            bus: Mutex::new(Bus {
                port,
                channels: Vec::new(),
            }),
            scheduler: CompletionScheduler::new(),
        })
    }
}

/// Ask for the firmware banner and read it through the trailing CR.
fn probe(port: &mut dyn SerialPort) -> Result<String> {
    send(port, "VER\r")?;

    let mut banner = String::new();
    let mut byte = [0u8; 1];
    loop {
        match port.read(&mut byte) {
            Ok(1) if byte[0] == b'\r' => return Ok(banner),
            Ok(1) => banner.push(byte[0] as char),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                return Err(DriverError::Probe {
                    reason: if banner.is_empty() {
                        "no answer to version query".to_string()
                    } else {
                        format!("unterminated version reply {:?}", banner)
                    },
                });
            }
            Err(e) => return Err(DriverError::Io(e)),
        }
        if banner.len() > MAX_BANNER_BYTES {
            return Err(DriverError::Probe {
                reason: "oversized version reply".to_string(),
            });
        }
    }
}

fn send(port: &mut dyn SerialPort, command: &str) -> std::io::Result<()> {
    port.write_all(command.as_bytes())?;
    port.flush()
}

/// One timed-move command in the controller's line protocol.
fn format_move(pin: u8, pulse_us: u32, time_ms: u64) -> String {
    format!("#{}P{}T{}\r", pin, pulse_us, time_ms)
}

impl ServoDriver for Ssc32Servo {
    fn configure(&mut self, actuator: usize, channel: ServoChannel) -> Result<()> {
        let pin = channel.pin();
        if pin >= MAX_CHANNELS {
            return Err(DriverError::ChannelOutOfRange { pin });
        }
        let mut bus = self.bus.lock().unwrap();
        if bus.channels.len() <= actuator {
            bus.channels.resize_with(actuator + 1, || None);
        }
        bus.channels[actuator] = Some(Channel {
            pin,
            rate_deg_s: DEFAULT_RATE_DEG_S,
            cal: PulseCalibration::default(),
            last_cdeg: 0,
        });
        debug!("actuator {} on controller channel {}", actuator, pin);
        Ok(())
    }

    fn set_motion_rate(&mut self, actuator: usize, deg_per_s: u32) -> Result<()> {
        if deg_per_s == 0 {
            return Err(DriverError::ZeroMotionRate);
        }
        let mut bus = self.bus.lock().unwrap();
        let channel = bus
            .channels
            .get_mut(actuator)
            .and_then(|c| c.as_mut())
            .ok_or(DriverError::NotConfigured { actuator })?;
        channel.rate_deg_s = deg_per_s;
        Ok(())
    }

    fn calibrate(&mut self, actuator: usize, cal: PulseCalibration) -> Result<()> {
        let mut bus = self.bus.lock().unwrap();
        let channel = bus
            .channels
            .get_mut(actuator)
            .and_then(|c| c.as_mut())
            .ok_or(DriverError::NotConfigured { actuator })?;
        channel.cal = cal;
        debug!(
            "actuator {} calibrated {}..{} us{}",
            actuator,
            cal.min_us,
            cal.max_us,
            if cal.invert { " inverted" } else { "" }
        );
        Ok(())
    }

    fn move_to(&self, actuator: usize, target_cdeg: i32, done: Completion) {
        let mut bus = self.bus.lock().unwrap();
        let (pin, pulse, travel) = {
            let Some(channel) = bus.channels.get_mut(actuator).and_then(|c| c.as_mut()) else {
                warn!("move for unconfigured actuator {}", actuator);
                done.complete();
                return;
            };
            let pulse = channel.cal.pulse_for(target_cdeg);
            let travel = move_duration(
                target_cdeg.abs_diff(channel.last_cdeg),
                channel.rate_deg_s,
            );
            channel.last_cdeg = target_cdeg;
            (channel.pin, pulse, travel)
        };

        // a failed write is logged and the timed completion still fires,
        // so a noisy link degrades motion instead of hanging the gait
        let command = format_move(pin, pulse, travel.as_millis() as u64);
        if let Err(e) = send(bus.port.as_mut(), &command) {
            warn!("move command for channel {} failed: {}", pin, e);
        }
        drop(bus);

        self.scheduler.defer(travel, done);
    }

    fn read_battery_mv(&self) -> Result<u32> {
        let mut bus = self.bus.lock().unwrap();
        send(bus.port.as_mut(), "VA\r")?;
        let mut count = [0u8; 1];
        bus.port.read_exact(&mut count)?;
        Ok(count[0] as u32 * BATTERY_MV_PER_COUNT)
    }
}
