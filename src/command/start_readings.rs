use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::argsets::{Family, StartReadingsArgs};
use fieldpoll::data_mgmt::persistence::{ReadingSink, SqliteSink};
use fieldpoll::helpers::fmt_opt_ts;
use fieldpoll::node_mgmt::{ConfigSource, FileConfigSource, Settings};
use fieldpoll::readers::modbus_rtu_tcp::{RtuOverTcpConnector, TransportRegistry};
use fieldpoll::service::{
    BoxSensorJob, CollectionJob, CollectionService, OrchestratorJob, PowerMeterJob,
};

/// Run collection until Ctrl-C, or a single cycle with `--once`
pub async fn start_readings(args: StartReadingsArgs) -> Result<()> {
    let settings = Settings::from_env()?;
    let interval = match args.interval {
        Some(0) => bail!("--interval must be at least 1 second"),
        Some(secs) => Duration::from_secs(secs),
        None => settings.collection_interval,
    };

    let registry = Arc::new(
        TransportRegistry::new(Arc::new(RtuOverTcpConnector::new(settings.io_timeout)))
            .with_connect_retry(settings.connect_retry_window),
    );
    let sink = SqliteSink::open(settings.readings_db_path()).await?;
    log::info!(
        "Collecting {:?} from config in {}, storing to {}",
        args.family,
        settings.config_dir.display(),
        sink.db().path().display()
    );
    let sink: Arc<dyn ReadingSink> = Arc::new(sink);
    let config: Arc<dyn ConfigSource> = Arc::new(FileConfigSource::new(&settings.config_dir));

    let result = match args.family {
        Family::All => {
            let job = OrchestratorJob::new(config, registry.clone(), sink);
            run(job, &settings, interval, args.once).await
        }
        Family::Power => {
            let job = PowerMeterJob::new(config, registry.clone(), sink);
            run(job, &settings, interval, args.once).await
        }
        Family::Box => {
            let job = BoxSensorJob::new(config, registry.clone(), sink);
            run(job, &settings, interval, args.once).await
        }
    };

    registry.close_all().await;
    result
}

async fn run<J: CollectionJob>(
    job: J,
    settings: &Settings,
    interval: Duration,
    once: bool,
) -> Result<()> {
    let service = CollectionService::new(job).with_stop_timeout(settings.stop_timeout);

    if once {
        let results = service.collect_now().await?;
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    service.start(interval);
    tokio::signal::ctrl_c().await?;
    log::info!("Received Ctrl-C, stopping collection");
    service.stop().await;

    let stats = service.stats();
    log::info!(
        "{} cycles: {} succeeded, {} failed, last success {}",
        stats.total,
        stats.success,
        stats.fail,
        fmt_opt_ts(stats.last_success_time)
    );
    Ok(())
}
