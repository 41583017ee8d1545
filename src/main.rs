mod argsets;
mod command;

use anyhow::{anyhow, Result};
use env_logger::Env;

use fieldpoll::constants::{defaults, envvars};
use fieldpoll::helpers::load_dotenv;

const CMD_START_READINGS: &str = "start-readings";
const CMD_CHECK_CONFIG: &str = "check-config";

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    env_logger::Builder::from_env(Env::default().filter_or(envvars::LOG_LEVEL, defaults::LOG_LEVEL))
        .init();

    let mut args = pico_args::Arguments::from_env();
    match args.subcommand()?.as_deref() {
        Some(CMD_START_READINGS) => {
            let start_args = argsets::StartReadingsArgs {
                family: args.opt_value_from_str("--family")?.unwrap_or_default(),
                interval: args.opt_value_from_str("--interval")?,
                once: args.contains("--once"),
            };
            reject_leftovers(args)?;
            command::start_readings(start_args).await
        }
        Some(CMD_CHECK_CONFIG) => {
            reject_leftovers(args)?;
            command::check_config()
        }
        _ => Err(anyhow!(
            "Subcommand must be one of '{}', '{}'",
            CMD_START_READINGS,
            CMD_CHECK_CONFIG
        )),
    }
}

fn reject_leftovers(args: pico_args::Arguments) -> Result<()> {
    let rest = args.finish();
    if !rest.is_empty() {
        return Err(anyhow!("Unexpected arguments: {:?}", rest));
    }
    Ok(())
}
