//! Session origin: the robot's base and the centre of the operating zone.
//!
//! Resolved once at startup from config or a GNSS receiver. Any failure
//! falls back to `FALLBACK_ORIGIN` so the session can still start.

use anyhow::{Context, Result};
use courier_proto::Coordinate;
use serde::Deserialize;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{info, warn};

pub const FALLBACK_ORIGIN: Coordinate = Coordinate::new(0.0, 0.0);

#[derive(Debug, Clone, Deserialize)]
pub struct OriginCfg {
    /// fixed | nmea-serial | nmea-file
    #[serde(default = "default_source")]
    pub source: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub nmea_device: Option<String>,
    pub nmea_baud: Option<u32>,
    pub nmea_file: Option<String>,
    /// How long to wait for a GNSS fix before falling back.
    pub timeout_ms: Option<u64>,
}

fn default_source() -> String {
    "fixed".into()
}

impl Default for OriginCfg {
    fn default() -> Self {
        Self {
            source: default_source(),
            lat: None,
            lng: None,
            nmea_device: None,
            nmea_baud: None,
            nmea_file: None,
            timeout_ms: None,
        }
    }
}

pub enum NmeaSource {
    Serial(BufReader<SerialStream>),
    File(BufReader<File>),
}

impl NmeaSource {
    pub fn serial(dev: &str, baud: u32) -> Result<Self> {
        let port = tokio_serial::new(dev, baud)
            .open_native_async()
            .with_context(|| format!("open gnss serial {}", dev))?;
        Ok(Self::Serial(BufReader::new(port)))
    }

    pub async fn file(path: &str) -> Result<Self> {
        let f = File::open(path).await.with_context(|| format!("open nmea file {}", path))?;
        Ok(Self::File(BufReader::new(f)))
    }

    /// Reads sentences until a valid RMC fix. `None` when a file runs out.
    pub async fn next_fix(&mut self) -> Result<Option<Coordinate>> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = match self {
                NmeaSource::Serial(r) => r.read_line(&mut line).await.context("read gnss serial")?,
                NmeaSource::File(r) => r.read_line(&mut line).await.context("read nmea file")?,
            };
            if n == 0 {
                return Ok(None);
            }
            if let Some(fix) = parse_rmc(line.trim()) {
                return Ok(Some(fix));
            }
        }
    }
}

pub async fn resolve_origin(cfg: &OriginCfg) -> Coordinate {
    match locate(cfg).await {
        Ok(c) => {
            info!("origin: {} via {}", c, cfg.source);
            c
        }
        Err(e) => {
            warn!("origin: {:#} - falling back to {}", e, FALLBACK_ORIGIN);
            FALLBACK_ORIGIN
        }
    }
}

async fn locate(cfg: &OriginCfg) -> Result<Coordinate> {
    let timeout = Duration::from_millis(cfg.timeout_ms.unwrap_or(5000));
    let mut src = match cfg.source.as_str() {
        "fixed" => {
            let lat = cfg.lat.context("origin.lat missing")?;
            let lng = cfg.lng.context("origin.lng missing")?;
            let c = Coordinate::new(lat, lng);
            anyhow::ensure!(c.is_valid(), "origin coordinates invalid: {}", c);
            return Ok(c);
        }
        "nmea-serial" => {
            let dev = cfg.nmea_device.as_ref().context("origin.nmea_device missing")?;
            NmeaSource::serial(dev, cfg.nmea_baud.unwrap_or(9600))?
        }
        "nmea-file" => {
            let path = cfg.nmea_file.as_ref().context("origin.nmea_file missing")?;
            NmeaSource::file(path).await?
        }
        other => anyhow::bail!("unknown origin.source: {}", other),
    };

    let fix = tokio::time::timeout(timeout, src.next_fix())
        .await
        .context("timed out waiting for gnss fix")??;
    fix.context("no RMC fix in nmea source")
}

/// Parses an active RMC sentence into a coordinate.
pub fn parse_rmc(s: &str) -> Option<Coordinate> {
    if !(s.starts_with("$GNRMC") || s.starts_with("$GPRMC")) {
        return None;
    }
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() <= 6 || parts[2] != "A" {
        return None;
    }
    // parts[3]=lat ddmm.mmmm, parts[4]=N/S, parts[5]=lon dddmm.mmmm, parts[6]=E/W
    let lat = parse_deg_min(parts[3], parts[4])?;
    let lng = parse_deg_min(parts[5], parts[6])?;
    Some(Coordinate::new(lat, lng))
}

fn parse_deg_min(v: &str, hemi: &str) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let dot = v.find('.')?;
    let deg_len = if dot > 4 { 3 } else { 2 };
    let deg: f64 = v.get(..deg_len)?.parse().ok()?;
    let min: f64 = v.get(deg_len..)?.parse().ok()?;
    let mut out = deg + (min / 60.0);
    if hemi == "S" || hemi == "W" {
        out = -out;
    }
    Some(out)
}
