use std::str::FromStr;

use anyhow::anyhow;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Family {
    #[default]
    All,
    Power,
    Box,
}

impl FromStr for Family {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Family::All),
            "power" => Ok(Family::Power),
            "box" => Ok(Family::Box),
            other => Err(anyhow!(
                "Unknown family '{}', expected 'all', 'power' or 'box'",
                other
            )),
        }
    }
}

pub struct StartReadingsArgs {
    pub family: Family,
    /// Overrides COLLECTION_INTERVAL, seconds
    pub interval: Option<u64>,
    pub once: bool,
}
