use anyhow::Result;

use crate::geofence::ZoneCfg;
use crate::origin::OriginCfg;
use crate::reconcile::AnimationCfg;

pub fn check_zone(zone: &ZoneCfg) -> Result<()> {
    anyhow::ensure!(zone.size_deg.is_finite() && zone.size_deg > 0.0, "zone.size_deg must be positive");
    // ~1.1 km; anything larger is not a yard-scale delivery zone
    anyhow::ensure!(zone.size_deg <= 0.01, "zone.size_deg too large ({})", zone.size_deg);
    Ok(())
}

pub fn check_origin(origin: &OriginCfg) -> Result<()> {
    match origin.source.as_str() {
        "fixed" => {
            let (Some(lat), Some(lng)) = (origin.lat, origin.lng) else {
                anyhow::bail!("origin.lat/origin.lng required for fixed origin");
            };
            anyhow::ensure!(lat.abs() <= 90.0 && lng.abs() <= 180.0, "origin coordinates invalid");
        }
        "nmea-serial" => {
            anyhow::ensure!(
                origin.nmea_device.as_ref().map(|s| !s.is_empty()).unwrap_or(false),
                "origin.nmea_device missing"
            );
        }
        "nmea-file" => {
            anyhow::ensure!(
                origin.nmea_file.as_ref().map(|s| !s.is_empty()).unwrap_or(false),
                "origin.nmea_file missing"
            );
        }
        other => anyhow::bail!("unknown origin.source: {}", other),
    }
    Ok(())
}

pub fn check_animation(anim: &AnimationCfg) -> Result<()> {
    anyhow::ensure!(anim.steps >= 1, "animation.steps must be >= 1");
    anyhow::ensure!(anim.duration_ms <= 60_000, "animation.duration_ms should be <= 60s");
    Ok(())
}
