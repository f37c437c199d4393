//! STS operator roles, account roles and the IAM names derived from them

use crate::cluster::Cluster;
use crate::{version, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// IAM names are capped at 64 characters
pub const MAX_NAME_LENGTH: usize = 64;

pub const INSTALLER_ROLE_SUFFIX: &str = "-Installer-Role";

/// Account role kinds whose policies carry a version tag
pub const ACCOUNT_ROLE_SUFFIXES: [&str; 4] = [
    INSTALLER_ROLE_SUFFIX,
    "-Support-Role",
    "-Worker-Role",
    "-ControlPlane-Role",
];

/// Key of the operator trust policy template
pub const OPERATOR_TRUST_POLICY: &str = "operator_iam_role_policy";

pub mod tags {
    pub const CLUSTER_ID: &str = "rosa_cluster_id";
    pub const OPERATOR_NAMESPACE: &str = "operator_namespace";
    pub const OPERATOR_NAME: &str = "operator_name";
    pub const RED_HAT_MANAGED: &str = "red-hat-managed";
    pub const OPENSHIFT_VERSION: &str = "rosa_openshift_version";
    pub const ROLE_PREFIX: &str = "rosa_role_prefix";
}

/// Operator role registered on a cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorIamRole {
    pub name: String,
    pub namespace: String,
    pub role_arn: String,
}

/// Operator described by a credential request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StsOperator {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub service_accounts: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub min_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub max_version: String,
}

/// Credential requests keyed by credential request name
pub type CredRequests = BTreeMap<String, StsOperator>;

fn truncate(name: String) -> String {
    if name.len() > MAX_NAME_LENGTH {
        name[..MAX_NAME_LENGTH].to_string()
    } else {
        name
    }
}

/// `<operator_role_prefix>-<namespace>-<name>`
pub fn operator_role_name(cluster: &Cluster, operator: &StsOperator) -> Result<String> {
    let prefix = &cluster.sts()?.operator_role_prefix;
    Ok(truncate(format!(
        "{}-{}-{}",
        prefix, operator.namespace, operator.name
    )))
}

/// `<account prefix>-<namespace>-<name>`
pub fn operator_policy_name(prefix: &str, namespace: &str, name: &str) -> String {
    truncate(format!("{}-{}-{}", prefix, namespace, name))
}

pub fn operator_policy_arn(
    account_id: &str,
    prefix: &str,
    namespace: &str,
    name: &str,
    path: &str,
) -> String {
    format!(
        "arn:aws:iam::{}:policy{}{}",
        account_id,
        path,
        operator_policy_name(prefix, namespace, name)
    )
}

/// Template id of the permission policy for a credential request
pub fn operator_policy_key(cred_request: &str) -> String {
    format!("openshift_{}_policy", cred_request)
}

pub fn account_role_name(prefix: &str, suffix: &str) -> String {
    truncate(format!("{}{}", prefix, suffix))
}

/// Parsed `arn:aws:iam::<account>:role<path><name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleArn {
    pub account_id: String,
    pub path: String,
    pub name: String,
}

impl std::str::FromStr for RoleArn {
    type Err = Error;

    fn from_str(arn: &str) -> Result<Self> {
        let invalid = || Error::InvalidArn(arn.to_string());

        let parts: Vec<&str> = arn.splitn(6, ':').collect();
        if parts.len() != 6 || parts[0] != "arn" || parts[2] != "iam" {
            return Err(invalid());
        }
        let resource = parts[5].strip_prefix("role/").ok_or_else(invalid)?;
        let (path, name) = match resource.rfind('/') {
            Some(idx) => (format!("/{}/", &resource[..idx]), &resource[idx + 1..]),
            None => ("/".to_string(), resource),
        };
        if name.is_empty() || parts[4].is_empty() {
            return Err(invalid());
        }

        Ok(RoleArn {
            account_id: parts[4].to_string(),
            path,
            name: name.to_string(),
        })
    }
}

/// Account role prefix of the cluster, taken from the installer role name
pub fn account_role_prefix(cluster: &Cluster) -> Result<String> {
    let sts = cluster.sts()?;
    let arn: RoleArn = sts.role_arn.parse()?;
    arn.name
        .strip_suffix(INSTALLER_ROLE_SUFFIX)
        .filter(|prefix| !prefix.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidArn(sts.role_arn.clone()))
}

/// IAM path of the installer account role (`/` when none)
pub fn account_role_path(cluster: &Cluster) -> Result<String> {
    let arn: RoleArn = cluster.sts()?.role_arn.parse()?;
    Ok(arn.path)
}

/// Credential requests that apply at `target_version` but have no matching
/// operator role on the cluster.
///
/// A credential request applies when it has no minimum version or the target
/// is at least that minimum. Roles are matched on (namespace, name).
pub fn find_missing_operator_roles(
    cluster: &Cluster,
    cred_requests: &CredRequests,
    target_version: &str,
) -> Result<CredRequests> {
    let existing = cluster.operator_iam_roles();
    let mut missing = CredRequests::new();

    for (key, operator) in cred_requests {
        if !operator.min_version.is_empty()
            && !version::is_at_least(target_version, &operator.min_version)?
        {
            continue;
        }
        let present = existing
            .iter()
            .any(|role| role.namespace == operator.namespace && role.name == operator.name);
        if !present {
            missing.insert(key.clone(), operator.clone());
        }
    }

    Ok(missing)
}

/// Render the trust policy of an operator role from its template
pub fn operator_trust_policy(
    template: &str,
    cluster: &Cluster,
    account_id: &str,
    operator: &StsOperator,
) -> Result<String> {
    let issuer_url = cluster.sts()?.oidc_endpoint_url.as_str();
    let issuer = issuer_url
        .trim_start_matches("https://")
        .trim_end_matches('/');
    if issuer.is_empty() {
        return Err(Error::Validation(format!(
            "Cluster '{}' has no OIDC endpoint",
            cluster.id
        )));
    }
    let provider_arn = format!("arn:aws:iam::{}:oidc-provider/{}", account_id, issuer);
    let service_accounts = operator
        .service_accounts
        .iter()
        .map(|sa| format!("\"system:serviceaccount:{}:{}\"", operator.namespace, sa))
        .collect::<Vec<_>>()
        .join(",");

    Ok(template
        .replace("%{oidc_provider_arn}", &provider_arn)
        .replace("%{issuer_url}", issuer)
        .replace("%{service_accounts}", &service_accounts))
}
