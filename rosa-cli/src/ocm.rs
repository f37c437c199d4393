//! Clusters management service operations used by the commands

use crate::api::{query, ApiClient, ClientError, List};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rosa_common::sts::CredRequests;
use rosa_common::{version, Cluster, NodePool, StsOperator};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const API_PREFIX: &str = "/api/clusters_mgmt/v1";

/// Policy types served by the sts_policies inquiry
pub const OPERATOR_ROLE_POLICY_TYPE: &str = "OperatorRole";

/// Event keys and body fields sent to the service
pub mod events {
    pub const UPGRADE_OPERATOR_ROLES_AUTO: &str = "ROSAUpgradeOperatorRolesModeAuto";
    pub const RESPONSE: &str = "response";
    pub const FAILURE: &str = "failure";
    pub const VERSION: &str = "version";
    pub const IS_THROTTLE: &str = "is_throttle";
}

/// Operations against the managed service
#[async_trait]
pub trait OcmClient: Send + Sync {
    /// Find a cluster by id, name or external id
    async fn find_cluster(&self, key: &str) -> Result<Option<Cluster>>;

    /// Major.minor of the default OpenShift version
    async fn default_version(&self) -> Result<String>;

    /// Versions the given version resource can be upgraded to
    async fn available_upgrades(&self, version_id: &str) -> Result<Vec<String>>;

    /// Operator credential requests, keyed by request name
    async fn cred_requests(&self, hosted: bool) -> Result<CredRequests>;

    /// Policy templates of the given type, keyed by policy id
    async fn policies(&self, policy_type: &str) -> Result<BTreeMap<String, String>>;

    async fn node_pools(&self, cluster_id: &str) -> Result<Vec<NodePool>>;

    async fn node_pool(&self, cluster_id: &str, node_pool_id: &str) -> Result<Option<NodePool>>;

    async fn create_node_pool(&self, cluster_id: &str, node_pool: &NodePool) -> Result<NodePool>;

    async fn update_node_pool(&self, cluster_id: &str, node_pool: &NodePool) -> Result<NodePool>;

    /// Record a usage event
    async fn log_event(&self, key: &str, body: HashMap<String, String>) -> Result<()>;
}

#[derive(Deserialize)]
struct VersionResource {
    raw_id: String,
    #[serde(default)]
    available_upgrades: Vec<String>,
}

#[derive(Deserialize)]
struct CredRequestItem {
    name: String,
    operator: StsOperator,
}

#[derive(Deserialize)]
struct PolicyItem {
    id: String,
    #[serde(default)]
    details: String,
}

#[derive(Serialize)]
struct Event<'a> {
    key: &'a str,
    body: HashMap<String, String>,
}

/// Service client over HTTP
pub struct OcmApi {
    api: ApiClient,
}

impl OcmApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl OcmClient for OcmApi {
    async fn find_cluster(&self, key: &str) -> Result<Option<Cluster>> {
        let search = format!(
            "id = '{key}' or name = '{key}' or external_id = '{key}'",
            key = key
        );
        let path = format!("{}/clusters{}", API_PREFIX, query(&[("search", &search), ("size", "2")]));
        let clusters: List<Cluster> = self.api.get(&path).await?;

        match clusters.items.len() {
            0 => Ok(None),
            1 => Ok(clusters.items.into_iter().next()),
            _ => bail!("There are {} clusters with identifier or name '{}'", clusters.total, key),
        }
    }

    async fn default_version(&self) -> Result<String> {
        let path = format!(
            "{}/versions{}",
            API_PREFIX,
            query(&[
                ("search", "enabled = 'true' and rosa_enabled = 'true' and default = 'true'"),
                ("size", "1"),
            ])
        );
        let versions: List<VersionResource> = self.api.get(&path).await?;
        let default = versions
            .items
            .into_iter()
            .next()
            .context("No default version is available")?;

        Ok(version::major_minor(&default.raw_id)?)
    }

    async fn available_upgrades(&self, version_id: &str) -> Result<Vec<String>> {
        let path = format!("{}/versions/{}", API_PREFIX, urlencoding::encode(version_id));
        let version: VersionResource = self.api.get(&path).await?;
        Ok(version.available_upgrades)
    }

    async fn cred_requests(&self, hosted: bool) -> Result<CredRequests> {
        let path = format!(
            "{}/aws_inquiries/sts_credential_requests{}",
            API_PREFIX,
            query(&[("is_hypershift", if hosted { "true" } else { "false" })])
        );
        let requests: List<CredRequestItem> = self.api.get(&path).await?;
        Ok(requests
            .items
            .into_iter()
            .map(|item| (item.name, item.operator))
            .collect())
    }

    async fn policies(&self, policy_type: &str) -> Result<BTreeMap<String, String>> {
        let search = format!("policy_type = '{}'", policy_type);
        let path = format!(
            "{}/aws_inquiries/sts_policies{}",
            API_PREFIX,
            query(&[("search", &search)])
        );
        let policies: List<PolicyItem> = self.api.get(&path).await?;
        Ok(policies
            .items
            .into_iter()
            .map(|item| (item.id, item.details))
            .collect())
    }

    async fn node_pools(&self, cluster_id: &str) -> Result<Vec<NodePool>> {
        let path = format!("{}/clusters/{}/node_pools", API_PREFIX, cluster_id);
        let pools: List<NodePool> = self.api.get(&path).await?;
        Ok(pools.items)
    }

    async fn node_pool(&self, cluster_id: &str, node_pool_id: &str) -> Result<Option<NodePool>> {
        let path = format!(
            "{}/clusters/{}/node_pools/{}",
            API_PREFIX,
            cluster_id,
            urlencoding::encode(node_pool_id)
        );
        match self.api.get(&path).await {
            Ok(pool) => Ok(Some(pool)),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_node_pool(&self, cluster_id: &str, node_pool: &NodePool) -> Result<NodePool> {
        let path = format!("{}/clusters/{}/node_pools", API_PREFIX, cluster_id);
        Ok(self.api.post(&path, node_pool).await?)
    }

    async fn update_node_pool(&self, cluster_id: &str, node_pool: &NodePool) -> Result<NodePool> {
        let path = format!(
            "{}/clusters/{}/node_pools/{}",
            API_PREFIX,
            cluster_id,
            urlencoding::encode(&node_pool.id)
        );
        Ok(self.api.patch(&path, node_pool).await?)
    }

    async fn log_event(&self, key: &str, body: HashMap<String, String>) -> Result<()> {
        let path = format!("{}/events", API_PREFIX);
        self.api.post_empty(&path, &Event { key, body }).await?;
        Ok(())
    }
}
