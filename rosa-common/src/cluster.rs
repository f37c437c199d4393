//! Cluster resource as returned by the clusters_mgmt API

use crate::sts::OperatorIamRole;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

pub const STATE_READY: &str = "ready";

/// Managed OpenShift cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub version: ClusterVersion,
    #[serde(default)]
    pub hypershift: Hypershift,
    #[serde(default)]
    pub aws: Option<ClusterAws>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterVersion {
    /// Version resource id, e.g. `openshift-v4.12.3`
    pub id: String,
    /// Plain version, e.g. `4.12.3`
    #[serde(default)]
    pub raw_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hypershift {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterAws {
    #[serde(default)]
    pub sts: Option<ClusterSts>,
}

/// STS configuration of a cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSts {
    #[serde(default)]
    pub enabled: bool,
    /// ARN of the installer account role
    pub role_arn: String,
    #[serde(default)]
    pub support_role_arn: Option<String>,
    #[serde(default)]
    pub operator_role_prefix: String,
    #[serde(default)]
    pub oidc_endpoint_url: String,
    #[serde(default)]
    pub operator_iam_roles: Vec<OperatorIamRole>,
}

impl Cluster {
    pub fn is_ready(&self) -> bool {
        self.state == STATE_READY
    }

    /// Hosted control plane cluster
    pub fn is_hosted(&self) -> bool {
        self.hypershift.enabled
    }

    pub fn sts(&self) -> Result<&ClusterSts> {
        self.aws
            .as_ref()
            .and_then(|aws| aws.sts.as_ref())
            .filter(|sts| !sts.role_arn.is_empty())
            .ok_or_else(|| Error::NotSts(self.id.clone()))
    }

    /// Operator roles currently registered on the cluster
    pub fn operator_iam_roles(&self) -> &[OperatorIamRole] {
        self.aws
            .as_ref()
            .and_then(|aws| aws.sts.as_ref())
            .map(|sts| sts.operator_iam_roles.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `key` refers to this cluster by id, name or external id
    pub fn matches_key(&self, key: &str) -> bool {
        self.id == key || self.name == key || self.external_id.as_deref() == Some(key)
    }
}

/// Cluster keys are ids, names or external ids: letters, digits, `-` and `_`
pub fn is_valid_cluster_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
