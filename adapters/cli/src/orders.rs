//! Tower build orders supplied on the command line.

use std::{fmt, str::FromStr};

use anyhow::{anyhow, Context};

/// Request to build `kind` on tower spot `spot` before play starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TowerOrder {
    pub(crate) spot: usize,
    pub(crate) kind: String,
}

impl FromStr for TowerOrder {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (spot, kind) = value
            .split_once(':')
            .ok_or_else(|| anyhow!("expected SPOT:KIND, got `{value}`"))?;
        let spot = spot
            .trim()
            .parse()
            .with_context(|| format!("tower spot `{spot}` is not an index"))?;
        let kind = kind.trim();
        if kind.is_empty() {
            return Err(anyhow!("tower order `{value}` names no tower type"));
        }
        Ok(Self {
            spot,
            kind: kind.to_owned(),
        })
    }
}

impl fmt::Display for TowerOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.spot, self.kind)
    }
}
