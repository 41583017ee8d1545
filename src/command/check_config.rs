use anyhow::{Context, Result};

use fieldpoll::helpers::base_path;
use fieldpoll::node_mgmt::config::BoxKind;
use fieldpoll::node_mgmt::{ConfigSource, FileConfigSource};

/// Load both device documents and print what would be polled
pub fn check_config() -> Result<()> {
    let config_dir = base_path::config_dir();
    let config = FileConfigSource::new(&config_dir)
        .load()
        .with_context(|| format!("Invalid configuration in {}", config_dir.display()))?;

    println!("Configuration in {} is valid", config_dir.display());
    for kind in [BoxKind::Heatpump, BoxKind::Groundpipe] {
        let boxes: Vec<_> = config.boxes_of(kind).collect();
        println!(
            "{}: {} device(s), {} enabled",
            kind,
            boxes.len(),
            boxes.iter().filter(|b| b.enabled).count()
        );
        for device in boxes {
            let ids = device.sub_addresses;
            println!(
                "  {} at {} slaves {}/{}/{}{}",
                device.device_id,
                device.endpoint,
                ids.temp1,
                ids.temp2,
                ids.flow,
                if device.enabled { "" } else { " (disabled)" }
            );
        }
    }

    println!(
        "power_meter: {} device(s), {} enabled",
        config.power_meters.len(),
        config.power_meters.iter().filter(|m| m.enabled).count()
    );
    for meter in &config.power_meters {
        println!(
            "  {} at {} slave {} energy {:?}@{:#06x}{}",
            meter.device_id,
            meter.endpoint,
            meter.slave_id,
            meter.energy.encoding,
            meter.energy.register,
            if meter.enabled { "" } else { " (disabled)" }
        );
    }
    Ok(())
}
