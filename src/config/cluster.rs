use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// A branch known at start-up, registered before any heartbeat arrives.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BranchSeed {
    pub name: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ClusterConfig {
    /// Branches pre-registered when the hub starts
    #[serde(default)]
    pub branches: Vec<BranchSeed>,
}

impl ClusterConfig {
    /// Validates the seed list
    /// # Errors
    /// Returns `Error::InvalidConfig` on blank names, port 0 or duplicate names
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for seed in &self.branches {
            if seed.name.trim().is_empty() {
                return Err(Error::InvalidConfig("branch name cannot be empty".into()));
            }

            if seed.port == 0 {
                return Err(Error::InvalidConfig(format!(
                    "branch {} must specify a non-zero port",
                    seed.name
                )));
            }

            if !names.insert(seed.name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "Duplicate branch name {} in cluster.branches",
                    seed.name
                )));
            }
        }

        Ok(())
    }
}
