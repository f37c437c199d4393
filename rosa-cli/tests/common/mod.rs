//! In-memory service, IAM and prompt doubles shared by the integration tests

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use rosa_cli::aws::{IamClient, PolicySpec, RoleSpec};
use rosa_cli::interactive::Prompter;
use rosa_cli::ocm::OcmClient;
use rosa_cli::output::Reporter;
use rosa_cli::runtime::Runtime;
use rosa_common::cluster::{ClusterAws, ClusterSts, ClusterVersion, Hypershift};
use rosa_common::sts::CredRequests;
use rosa_common::{Cluster, Creator, NodePool, OperatorIamRole, StsOperator};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ACCOUNT_ID: &str = "123456789012";
pub const OPERATOR_ROLE_PREFIX: &str = "demo-p4x1";

/// Remote call that changes state
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateNodePool(NodePool),
    UpdateNodePool(NodePool),
    LogEvent(String),
    EnsureRole(String),
    AttachRolePolicy(String, String),
    CreatePolicy(String),
    CreatePolicyVersion(String),
    TagPolicy(String),
}

pub type Calls = Arc<Mutex<Vec<Call>>>;

fn record(calls: &Calls, call: Call) {
    calls.lock().unwrap().push(call);
}

pub fn cluster(hosted: bool) -> Cluster {
    Cluster {
        id: "c1".to_string(),
        name: "demo".to_string(),
        state: "ready".to_string(),
        version: ClusterVersion {
            id: "openshift-v4.12.5".to_string(),
            raw_id: "4.12.5".to_string(),
        },
        hypershift: Hypershift { enabled: hosted },
        aws: Some(ClusterAws {
            sts: Some(ClusterSts {
                enabled: true,
                role_arn: format!("arn:aws:iam::{}:role/Demo-Installer-Role", ACCOUNT_ID),
                operator_role_prefix: OPERATOR_ROLE_PREFIX.to_string(),
                oidc_endpoint_url: "https://oidc.example.com/c1".to_string(),
                operator_iam_roles: vec![OperatorIamRole {
                    namespace: "openshift-ingress-operator".to_string(),
                    name: "cloud-credentials".to_string(),
                    role_arn: format!(
                        "arn:aws:iam::{}:role/demo-p4x1-openshift-ingress-operator-cloud-credentials",
                        ACCOUNT_ID
                    ),
                }],
                ..Default::default()
            }),
        }),
        ..Default::default()
    }
}

pub fn operator(namespace: &str, name: &str) -> StsOperator {
    StsOperator {
        namespace: namespace.to_string(),
        name: name.to_string(),
        service_accounts: vec![format!("{}-sa", name)],
        ..Default::default()
    }
}

/// Credential requests: `ingress` has a role on the fixture cluster, `ebs` does not
pub fn cred_requests() -> CredRequests {
    CredRequests::from([
        (
            "ingress".to_string(),
            operator("openshift-ingress-operator", "cloud-credentials"),
        ),
        (
            "ebs".to_string(),
            operator("openshift-cluster-csi-drivers", "ebs-cloud-credentials"),
        ),
    ])
}

pub fn policy_templates() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "openshift_ingress_policy".to_string(),
            r#"{"Statement":[{"Action":["elasticloadbalancing:*"]}]}"#.to_string(),
        ),
        (
            "openshift_ebs_policy".to_string(),
            r#"{"Statement":[{"Action":["ec2:AttachVolume"]}]}"#.to_string(),
        ),
        (
            "operator_iam_role_policy".to_string(),
            r#"{"Principal":{"Federated":"%{oidc_provider_arn}"},"Condition":{"StringEquals":{"%{issuer_url}:sub":[%{service_accounts}]}}}"#
                .to_string(),
        ),
    ])
}

pub fn operator_policy_arn(namespace: &str, name: &str) -> String {
    format!("arn:aws:iam::{}:policy/Demo-{}-{}", ACCOUNT_ID, namespace, name)
}

pub struct FakeOcm {
    pub clusters: Vec<Cluster>,
    pub default_version: String,
    pub available_upgrades: Vec<String>,
    pub cred_requests: CredRequests,
    pub policies: BTreeMap<String, String>,
    pub node_pools: Vec<NodePool>,
    pub calls: Calls,
}

impl FakeOcm {
    pub fn new(calls: &Calls) -> Self {
        Self {
            clusters: vec![cluster(true)],
            default_version: "4.13".to_string(),
            available_upgrades: vec!["4.13.0".to_string(), "4.13.1".to_string()],
            cred_requests: cred_requests(),
            policies: policy_templates(),
            node_pools: Vec::new(),
            calls: calls.clone(),
        }
    }
}

#[async_trait]
impl OcmClient for FakeOcm {
    async fn find_cluster(&self, key: &str) -> Result<Option<Cluster>> {
        Ok(self.clusters.iter().find(|c| c.matches_key(key)).cloned())
    }

    async fn default_version(&self) -> Result<String> {
        Ok(self.default_version.clone())
    }

    async fn available_upgrades(&self, _version_id: &str) -> Result<Vec<String>> {
        Ok(self.available_upgrades.clone())
    }

    async fn cred_requests(&self, _hosted: bool) -> Result<CredRequests> {
        Ok(self.cred_requests.clone())
    }

    async fn policies(&self, _policy_type: &str) -> Result<BTreeMap<String, String>> {
        Ok(self.policies.clone())
    }

    async fn node_pools(&self, _cluster_id: &str) -> Result<Vec<NodePool>> {
        Ok(self.node_pools.clone())
    }

    async fn node_pool(&self, _cluster_id: &str, node_pool_id: &str) -> Result<Option<NodePool>> {
        Ok(self.node_pools.iter().find(|p| p.id == node_pool_id).cloned())
    }

    async fn create_node_pool(&self, _cluster_id: &str, node_pool: &NodePool) -> Result<NodePool> {
        record(&self.calls, Call::CreateNodePool(node_pool.clone()));
        let mut created = node_pool.clone();
        created.id = "workers-1".to_string();
        Ok(created)
    }

    async fn update_node_pool(&self, _cluster_id: &str, node_pool: &NodePool) -> Result<NodePool> {
        record(&self.calls, Call::UpdateNodePool(node_pool.clone()));
        Ok(node_pool.clone())
    }

    async fn log_event(&self, key: &str, _body: HashMap<String, String>) -> Result<()> {
        record(&self.calls, Call::LogEvent(key.to_string()));
        Ok(())
    }
}

pub struct FakeIam {
    /// Existing roles, name to ARN
    pub roles: BTreeMap<String, String>,
    pub attached: BTreeMap<String, Vec<String>>,
    /// Existing policies, ARN to tags
    pub policy_tags: BTreeMap<String, BTreeMap<String, String>>,
    pub fail_attach: bool,
    pub fail_policy_version: Option<String>,
    pub calls: Calls,
}

impl FakeIam {
    /// Account roles current at 4.13, operator policies tagged `operator_policy_version`
    pub fn new(calls: &Calls, operator_policy_version: &str) -> Self {
        let installer_policy = format!("arn:aws:iam::{}:policy/Demo-Installer-Role-Policy", ACCOUNT_ID);
        let mut policy_tags = BTreeMap::from([(installer_policy.clone(), version_tag("4.13"))]);
        for op in cred_requests().values() {
            policy_tags.insert(
                operator_policy_arn(&op.namespace, &op.name),
                version_tag(operator_policy_version),
            );
        }

        Self {
            roles: BTreeMap::from([(
                "Demo-Installer-Role".to_string(),
                format!("arn:aws:iam::{}:role/Demo-Installer-Role", ACCOUNT_ID),
            )]),
            attached: BTreeMap::from([("Demo-Installer-Role".to_string(), vec![installer_policy])]),
            policy_tags,
            fail_attach: false,
            fail_policy_version: None,
            calls: calls.clone(),
        }
    }
}

pub fn version_tag(version: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("rosa_openshift_version".to_string(), version.to_string())])
}

#[async_trait]
impl IamClient for FakeIam {
    async fn caller_identity(&self) -> Result<Creator> {
        Ok(Creator {
            account_id: ACCOUNT_ID.to_string(),
            arn: format!("arn:aws:iam::{}:user/admin", ACCOUNT_ID),
        })
    }

    async fn role_arn(&self, role_name: &str) -> Result<Option<String>> {
        Ok(self.roles.get(role_name).cloned())
    }

    async fn ensure_role(&self, role: &RoleSpec) -> Result<String> {
        record(&self.calls, Call::EnsureRole(role.name.clone()));
        Ok(format!("arn:aws:iam::{}:role{}{}", ACCOUNT_ID, role.path, role.name))
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        if self.fail_attach {
            bail!("NoSuchEntity: policy '{}' does not exist", policy_arn);
        }
        record(
            &self.calls,
            Call::AttachRolePolicy(role_name.to_string(), policy_arn.to_string()),
        );
        Ok(())
    }

    async fn attached_role_policies(&self, role_name: &str) -> Result<Vec<String>> {
        Ok(self.attached.get(role_name).cloned().unwrap_or_default())
    }

    async fn policy_tags(&self, policy_arn: &str) -> Result<Option<BTreeMap<String, String>>> {
        Ok(self.policy_tags.get(policy_arn).cloned())
    }

    async fn create_policy(&self, policy: &PolicySpec) -> Result<String> {
        record(&self.calls, Call::CreatePolicy(policy.name.clone()));
        Ok(format!("arn:aws:iam::{}:policy{}{}", ACCOUNT_ID, policy.path, policy.name))
    }

    async fn create_policy_version(&self, policy_arn: &str, _document: &str) -> Result<()> {
        if let Some(message) = &self.fail_policy_version {
            return Err(anyhow!("{}", message));
        }
        record(&self.calls, Call::CreatePolicyVersion(policy_arn.to_string()));
        Ok(())
    }

    async fn tag_policy(&self, policy_arn: &str, _tags: &BTreeMap<String, String>) -> Result<()> {
        record(&self.calls, Call::TagPolicy(policy_arn.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Bool(bool),
    Int(i32),
    Choice(String),
}

/// Answers prompts in order and remembers the questions asked
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    pub asked: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            asked: Arc::default(),
        }
    }

    fn next(&self, question: &str) -> Result<Answer> {
        self.asked.lock().unwrap().push(question.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("unexpected prompt '{}'", question))
    }
}

impl Prompter for ScriptedPrompter {
    fn get_bool(&self, question: &str, _default: bool) -> Result<bool> {
        match self.next(question)? {
            Answer::Bool(b) => Ok(b),
            other => bail!("expected a bool for '{}', scripted {:?}", question, other),
        }
    }

    fn get_int(&self, question: &str, _default: i32) -> Result<i32> {
        match self.next(question)? {
            Answer::Int(i) => Ok(i),
            other => bail!("expected an int for '{}', scripted {:?}", question, other),
        }
    }

    fn get_option(&self, question: &str, options: &[&str], _default: &str) -> Result<String> {
        match self.next(question)? {
            Answer::Choice(c) if options.contains(&c.as_str()) => Ok(c),
            other => bail!("expected one of {:?} for '{}', scripted {:?}", options, question, other),
        }
    }
}

/// Runtime over fakes with captured output and no reconcile wait
pub fn runtime(ocm: FakeOcm, prompter: ScriptedPrompter) -> Runtime {
    Runtime::new(Box::new(ocm))
        .with_prompter(Box::new(prompter))
        .with_reporter(Reporter::capture())
        .with_reconcile_delay(Duration::ZERO)
}

pub async fn runtime_with_iam(
    ocm: FakeOcm,
    iam: FakeIam,
    prompter: ScriptedPrompter,
    work_dir: &Path,
) -> Runtime {
    runtime(ocm, prompter)
        .with_work_dir(work_dir)
        .with_aws(Box::new(iam))
        .await
        .unwrap()
}

pub fn calls(calls: &Calls) -> Vec<Call> {
    calls.lock().unwrap().clone()
}
