//! Common types shared by the rosa command-line tool
//!
//! Mirrors the clusters_mgmt resources the CLI reads and writes, plus the
//! naming rules used for operator IAM roles and policies.

pub mod cluster;
pub mod nodepool;
pub mod sts;
pub mod version;

pub use cluster::{Cluster, ClusterVersion};
pub use nodepool::{NodePool, NodePoolAutoscaling, NodePoolBuilder};
pub use sts::{OperatorIamRole, StsOperator};

use serde::{Deserialize, Serialize};

/// How mutating IAM actions are carried out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// The CLI performs the actions itself
    #[default]
    Auto,
    /// The CLI prints the equivalent commands for the user to run
    Manual,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Auto, Mode::Manual];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::Manual => "manual",
        }
    }

    /// Accepted values, comma separated, for error messages
    pub fn allowed() -> String {
        Self::ALL
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Mode::Auto),
            "manual" => Ok(Mode::Manual),
            other => Err(Error::InvalidMode(other.to_string())),
        }
    }
}

/// Identity of the AWS caller running the CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Creator {
    pub account_id: String,
    pub arn: String,
}

/// Errors raised while validating or deriving resource values
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid mode '{0}'. Allowed values are {modes}", modes = Mode::allowed())]
    InvalidMode(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("Invalid ARN '{0}'")]
    InvalidArn(String),

    #[error("Cluster '{0}' is not an STS cluster")]
    NotSts(String),
}

pub type Result<T> = std::result::Result<T, Error>;
