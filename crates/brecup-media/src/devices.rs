//! Compute device enumeration.

use tracing::{info, warn};

use brecup_models::DeviceId;

use crate::command::{CommandRunner, ExternalCommand};
use crate::error::{MediaError, MediaResult};

/// `nvidia-smi -L` output reported in dry-run mode (two devices).
pub const PLACEHOLDER_DEVICE_LISTING: &str =
    "GPU 0: Placeholder GPU (UUID: GPU-0)\nGPU 1: Placeholder GPU (UUID: GPU-1)";

/// Parse a `CUDA_VISIBLE_DEVICES` value.
///
/// Accepts `0,1` as well as `NAME=0,1`; everything after the last `=` is
/// split on commas. Empty entries are dropped, and a device listed twice
/// keeps only its first position.
pub fn parse_visible_devices(value: &str) -> Vec<DeviceId> {
    let list = value.rsplit('=').next().unwrap_or(value);
    let mut devices: Vec<DeviceId> = Vec::new();
    for id in list.split(',').map(str::trim).filter(|id| !id.is_empty()) {
        let device = DeviceId::new(id);
        if devices.contains(&device) {
            warn!(device = %device, "device listed twice, ignoring duplicate");
            continue;
        }
        devices.push(device);
    }
    devices
}

/// Count devices in `nvidia-smi -L` output (one line per device).
pub fn count_listed_devices(listing: &str) -> usize {
    listing.lines().filter(|line| !line.trim().is_empty()).count()
}

/// Resolve the device set once for the whole run.
///
/// An explicit `visible` list wins; otherwise the devices are counted with
/// `nvidia-smi -L` and numbered from zero.
pub async fn enumerate_devices(
    runner: &CommandRunner,
    visible: Option<&str>,
) -> MediaResult<Vec<DeviceId>> {
    let devices = match visible.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => parse_visible_devices(value),
        None => {
            let cmd = ExternalCommand::new("nvidia-smi").arg("-L");
            let listing = runner.output(&cmd, PLACEHOLDER_DEVICE_LISTING).await?;
            (0..count_listed_devices(&listing))
                .map(DeviceId::from_index)
                .collect()
        }
    };

    if devices.is_empty() {
        return Err(MediaError::NoDevices(
            visible.map_or_else(|| "nvidia-smi listed none".to_string(), |v| format!("CUDA_VISIBLE_DEVICES={v}")),
        ));
    }

    info!("Found {} devices", devices.len());
    Ok(devices)
}
