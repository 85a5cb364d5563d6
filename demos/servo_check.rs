// Servo check: verifies the controller link before anything moves
//
// Opens the port, probes the controller firmware, and reads battery
// voltage. The only movement it can cause is an optional, confirmed
// staggered move to neutral at the end.
//
// Usage: cargo run --example servo_check -- [port]
// Example: cargo run --example servo_check -- /dev/ttyUSB0

use hexwalk::config::SERVO_PORT;
use hexwalk::gait::{Legs, HEXAPOD};
use hexwalk::motion::{MotionDispatcher, MotionState};
use hexwalk::runtime::setup_driver;
use hexwalk::servo::ssc32::DEFAULT_BAUD;
use std::io::{self, Write};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("debug".parse().unwrap()),
        )
        .init();

    // Get port from args or use default
    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| SERVO_PORT.to_string());

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Hexwalk Servo Check (READ-MOSTLY)               ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Probes the controller and reads battery voltage. Movement   ║");
    println!("║  happens only after an explicit confirmation at the end.     ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("Serial port: {}", port);
    println!();

    println!("Step 1: Opening port and probing the controller...");
    let driver = match setup_driver(Some(&port)) {
        Ok(driver) => {
            println!("  ✓ Controller responding, twelve channels configured");
            driver
        }
        Err(e) => {
            println!("  ✗ Controller check failed: {}", e);
            println!();
            println!("Troubleshooting:");
            println!("  - Check the port path is correct");
            println!("  - Verify the board has power (a browned-out board drops the link)");
            println!("  - Confirm the board's baud strap matches {}", DEFAULT_BAUD);
            return Err(e.into());
        }
    };
    println!();

    println!("Step 2: Reading battery voltage...");
    match driver.read_battery_mv() {
        Ok(mv) => {
            println!("  Battery: {}.{:02} V", mv / 1000, (mv % 1000) / 10);
            if mv < 6_400 {
                println!("  ⚠ Pack is low; charge before walking");
            }
        }
        Err(e) => println!("  ✗ Battery read failed: {}", e),
    }
    println!();

    print!("Stagger all servos to neutral now? [y/N]: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    if !input.trim().eq_ignore_ascii_case("y") {
        println!("Done without moving anything.");
        return Ok(());
    }

    let legs = Legs::new(
        MotionDispatcher::new(Arc::new(MotionState::new()), Arc::from(driver)),
        &HEXAPOD,
    );
    legs.stagger_to_neutral();
    println!("  ✓ Chassis at neutral");
    println!();
    println!(
        "Next step: cargo run --example servo_test -- --port {}",
        port
    );

    Ok(())
}
