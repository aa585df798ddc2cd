mod console;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;

use courier_dispatch::{run_session, Coordinator, OperatorIntent};
use courier_link::autodetect::{resolve_port, run_autodetect};
use courier_link::sim::{SimulatedOpener, SimulatedRobot};
use courier_link::{LinkConfig, RobotLink, SerialOpener};
use courier_nav::origin::{resolve_origin, OriginCfg};
use courier_nav::{doctor as nav_doctor, AnimationCfg, Geofence, ZoneCfg};

use console::{ConsoleMap, ConsoleStatus};

#[derive(Debug, Parser)]
#[command(name = "courier", version, about = "Courier - delivery robot dispatch console")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the config file.
    Doctor,
    /// Start an operator session on stdin.
    Run {
        /// Drive an in-process simulated robot instead of the serial port.
        #[arg(long)]
        simulate: bool,
    },
    Link {
        #[command(subcommand)]
        cmd: LinkCmd,
    },
}

#[derive(Debug, Subcommand)]
enum LinkCmd {
    /// Probe serial ports/bauds for robot telemetry.
    Autodetect,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Config {
    link: LinkConfig,
    origin: OriginCfg,
    zone: ZoneCfg,
    animation: AnimationCfg,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Run { simulate } => run(&cfg, simulate).await?,
        Command::Link { cmd } => link_cmd(&cfg, cmd).await?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    nav_doctor::check_zone(&cfg.zone)?;
    nav_doctor::check_origin(&cfg.origin)?;
    nav_doctor::check_animation(&cfg.animation)?;

    if cfg.link.autodetect {
        info!("doctor: link autodetect enabled (OK)");
    } else {
        anyhow::ensure!(
            cfg.link.serial_dev.as_ref().map(|s| !s.is_empty()).unwrap_or(false),
            "link.serial_dev missing"
        );
    }
    anyhow::ensure!(cfg.link.baud.map(|b| b > 0).unwrap_or(true), "link.baud invalid");

    info!("doctor: OK");
    Ok(())
}

async fn link_cmd(cfg: &Config, cmd: LinkCmd) -> Result<()> {
    match cmd {
        LinkCmd::Autodetect => {
            let res = run_autodetect(&cfg.link).await;
            if let Some((dev, baud)) = res.chosen {
                println!("CHOSEN: {} @ {}", dev, baud);
            } else {
                println!("CHOSEN: none");
            }
            for p in res.probes {
                println!(
                    "probe dev={} baud={} telemetry={} {}ms note={}",
                    p.dev, p.baud, p.telemetry_seen, p.elapsed_ms, p.note
                );
            }
            Ok(())
        }
    }
}

async fn run(cfg: &Config, simulate: bool) -> Result<()> {
    info!("run: starting");

    let base = resolve_origin(&cfg.origin).await;
    let zone = Geofence::around(base, cfg.zone.size_deg);

    let link = if simulate {
        info!("run: simulated robot at {}", base);
        RobotLink::new(SimulatedOpener::new(SimulatedRobot::new(base)))
    } else {
        let (dev, baud) = resolve_port(&cfg.link).await?;
        info!("run: robot on {} @ {}", dev, baud);
        RobotLink::new(SerialOpener::new(dev, baud))
    };

    let mut coord = Coordinator::new(
        link,
        ConsoleMap::stdout(),
        ConsoleStatus::stdout(),
        base,
        zone,
        cfg.animation.clone(),
    );

    let (tx, rx) = mpsc::channel::<OperatorIntent>(32);

    let ctrl_c_tx = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = ctrl_c_tx.send(OperatorIntent::Quit).await;
        }
    });

    // EOF on stdin ends the session like `quit`.
    console::spawn_operator_input(tx);

    println!("{}", console::HELP);
    run_session(&mut coord, rx).await;

    info!("run: stopped");
    Ok(())
}
