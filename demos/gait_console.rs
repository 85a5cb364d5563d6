// Keyboard gait console: one key, one gait command over zenoh
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use hexwalk::config::TOPIC_CMD_GAIT;
use hexwalk::messages::GaitCommand;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_GAIT).await?;

    info!("Gaits: T=tripod, S=sway, B=bob, R=ripple");
    info!("Poses: U=feet up, H=feet high, D=feet down, I=feet in");
    info!("       arrows=hips left/center/right, N=neutral");
    info!("X=showcase, Q=quit");

    enable_raw_mode()?;
    let result = run_console(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_console(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        // Poll for key with 20ms timeout
        if !event::poll(Duration::from_millis(20))? {
            continue;
        }
        let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }

        // Cycle counts match the showcase tuning
        let cmd = match code {
            KeyCode::Char('t') => Some(GaitCommand::Tripod { cycles: 5 }),
            KeyCode::Char('s') => Some(GaitCommand::Sway { cycles: 2 }),
            KeyCode::Char('b') => Some(GaitCommand::Bob { cycles: 3 }),
            KeyCode::Char('r') => Some(GaitCommand::Ripple { cycles: 4 }),
            KeyCode::Char('u') => Some(GaitCommand::FeetUp),
            KeyCode::Char('h') => Some(GaitCommand::FeetUpHigh),
            KeyCode::Char('d') => Some(GaitCommand::FeetDown),
            KeyCode::Char('i') => Some(GaitCommand::FeetIn),
            KeyCode::Left => Some(GaitCommand::HipsLeft),
            KeyCode::Right => Some(GaitCommand::HipsRight),
            KeyCode::Down => Some(GaitCommand::HipsCenter),
            KeyCode::Char('n') => Some(GaitCommand::Neutral),
            KeyCode::Char('x') => Some(GaitCommand::Showcase),
            KeyCode::Char('q') | KeyCode::Esc => break,
            _ => None,
        };

        if let Some(cmd) = cmd {
            info!("Sending {:?}", cmd);
            publisher.put(serde_json::to_string(&cmd)?).await?;
        }
    }

    Ok(())
}
