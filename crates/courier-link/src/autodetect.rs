use anyhow::{Context, Result};
use courier_proto::{FrameDecoder, TelemetryFrame};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use crate::port::{Port, PortOpener, SerialOpener};
use crate::{LinkConfig, DEFAULT_BAUD};

#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub dev: String,
    pub baud: u32,
    pub telemetry_seen: bool,
    pub elapsed_ms: u64,
    pub note: String,
}

#[derive(Debug, Clone)]
pub struct AutodetectResult {
    pub chosen: Option<(String, u32)>,
    pub probes: Vec<ProbeResult>,
}

pub fn default_candidate_devs() -> Vec<String> {
    vec![
        "/dev/ttyACM0".into(),
        "/dev/ttyACM1".into(),
        "/dev/ttyUSB0".into(),
        "/dev/ttyUSB1".into(),
        "/dev/serial0".into(),
        "/dev/ttyS0".into(),
    ]
}

pub fn default_candidate_bauds() -> Vec<u32> {
    vec![9600, 57600, 115200]
}

/// Waits up to `wait` for one decodable telemetry frame on a freshly opened port.
pub async fn probe_port(opener: &mut dyn PortOpener, wait: Duration) -> Result<bool> {
    let mut port = opener.open().with_context(|| format!("open {}", opener.describe()))?;
    match tokio::time::timeout(wait, first_frame(port.as_mut())).await {
        Ok(seen) => Ok(seen?),
        Err(_) => Ok(false),
    }
}

async fn first_frame(port: &mut dyn Port) -> std::io::Result<bool> {
    let mut decoder = FrameDecoder::<TelemetryFrame>::default();
    let mut buf = [0u8; 256];
    loop {
        let n = port.read(&mut buf).await?;
        if n == 0 {
            return Ok(false);
        }
        if decoder.feed(&buf[..n]).iter().any(|f| f.is_ok()) {
            return Ok(true);
        }
    }
}

pub async fn autodetect_link(
    candidate_devs: Vec<String>,
    candidate_bauds: Vec<u32>,
    probe_timeout: Duration,
) -> AutodetectResult {
    let mut probes = Vec::new();

    for dev in candidate_devs {
        for baud in &candidate_bauds {
            let start = Instant::now();
            let mut opener = SerialOpener::new(dev.clone(), *baud);

            let (seen, note) = match probe_port(&mut opener, probe_timeout).await {
                Ok(true) => (true, "telemetry".to_string()),
                Ok(false) => (false, "no telemetry".to_string()),
                Err(e) => {
                    warn!("link autodetect probe failed dev={} baud={} err={:#}", dev, baud, e);
                    (false, format!("open failed: {:#}", e))
                }
            };
            probes.push(ProbeResult {
                dev: dev.clone(),
                baud: *baud,
                telemetry_seen: seen,
                elapsed_ms: start.elapsed().as_millis() as u64,
                note,
            });

            if seen {
                info!("link autodetect: OK {} @ {}", dev, baud);
                return AutodetectResult { chosen: Some((dev, *baud)), probes };
            }
        }
    }

    AutodetectResult { chosen: None, probes }
}

pub async fn run_autodetect(cfg: &LinkConfig) -> AutodetectResult {
    let devs = cfg.candidate_devs.clone().unwrap_or_else(default_candidate_devs);
    let bauds = cfg.candidate_bauds.clone().unwrap_or_else(default_candidate_bauds);
    let timeout = Duration::from_millis(cfg.probe_timeout_ms.unwrap_or(1500));
    autodetect_link(devs, bauds, timeout).await
}

/// Port and baud to use: autodetected, or taken from config.
pub async fn resolve_port(cfg: &LinkConfig) -> Result<(String, u32)> {
    if cfg.autodetect {
        let res = run_autodetect(cfg).await;
        if let Some((dev, baud)) = res.chosen {
            return Ok((dev, baud));
        }
        anyhow::bail!("link autodetect failed: no telemetry on any candidate port");
    }
    let dev = cfg.serial_dev.clone().context("link.serial_dev missing (autodetect=false)")?;
    Ok((dev, cfg.baud.unwrap_or(DEFAULT_BAUD)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MemoryOpener;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn probe_sees_telemetry() {
        let mut opener = MemoryOpener::new("probe");
        let mut robot = opener.attach();
        robot.write_all(b"noise\n{\"battery\":80}\n").await.unwrap();
        assert!(probe_port(&mut opener, Duration::from_millis(500)).await.unwrap());
    }

    #[tokio::test]
    async fn probe_times_out_on_silent_port() {
        let mut opener = MemoryOpener::new("silent");
        let _robot = opener.attach();
        assert!(!probe_port(&mut opener, Duration::from_millis(50)).await.unwrap());
    }

    #[tokio::test]
    async fn probe_reports_open_failure() {
        let mut opener = MemoryOpener::new("absent");
        assert!(probe_port(&mut opener, Duration::from_millis(50)).await.is_err());
    }

    #[tokio::test]
    async fn fixed_port_from_config() {
        let cfg = LinkConfig { serial_dev: Some("/dev/ttyACM0".into()), ..LinkConfig::default() };
        assert_eq!(resolve_port(&cfg).await.unwrap(), ("/dev/ttyACM0".to_string(), 9600));
        assert!(resolve_port(&LinkConfig::default()).await.is_err());
    }
}
