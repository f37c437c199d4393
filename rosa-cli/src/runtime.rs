//! Clients and I/O shared by the commands

use crate::aws::IamClient;
use crate::interactive::{Prompter, TerminalPrompter};
use crate::ocm::OcmClient;
use crate::output::Reporter;
use anyhow::{bail, Context, Result};
use rosa_common::cluster::is_valid_cluster_key;
use rosa_common::{Cluster, Creator};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Time given to the service to pick up newly created operator roles
pub const RECONCILE_DELAY: Duration = Duration::from_secs(5);

pub struct Runtime {
    pub ocm: Box<dyn OcmClient>,
    iam: Option<Box<dyn IamClient>>,
    creator: Option<Creator>,
    pub prompter: Box<dyn Prompter>,
    pub reporter: Reporter,
    /// Where manual mode saves policy documents
    pub work_dir: PathBuf,
    pub reconcile_delay: Duration,
}

impl Runtime {
    pub fn new(ocm: Box<dyn OcmClient>) -> Self {
        Self {
            ocm,
            iam: None,
            creator: None,
            prompter: Box::new(TerminalPrompter),
            reporter: Reporter::stdout(),
            work_dir: PathBuf::from("."),
            reconcile_delay: RECONCILE_DELAY,
        }
    }

    /// Attach an IAM client and resolve the caller identity
    pub async fn with_aws(mut self, iam: Box<dyn IamClient>) -> Result<Self> {
        let creator = iam
            .caller_identity()
            .await
            .context("Failed to get AWS creator")?;
        debug!("AWS caller is '{}'", creator.arn);
        self.creator = Some(creator);
        self.iam = Some(iam);
        Ok(self)
    }

    pub fn with_prompter(mut self, prompter: Box<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_reconcile_delay(mut self, delay: Duration) -> Self {
        self.reconcile_delay = delay;
        self
    }

    pub fn iam(&self) -> Result<&dyn IamClient> {
        self.iam
            .as_deref()
            .context("AWS client is not configured")
    }

    pub fn creator(&self) -> Result<&Creator> {
        self.creator
            .as_ref()
            .context("AWS creator is not configured")
    }

    /// Cluster by id, name or external id; a missing cluster is an error
    pub async fn fetch_cluster(&self, key: &str) -> Result<Cluster> {
        if !is_valid_cluster_key(key) {
            bail!(
                "Cluster name, identifier or external identifier '{}' isn't valid: it \
                 must contain only letters, digits, dashes and underscores",
                key
            );
        }

        debug!("Loading cluster '{}'", key);
        self.ocm
            .find_cluster(key)
            .await
            .with_context(|| format!("Failed to get cluster '{}'", key))?
            .with_context(|| format!("There is no cluster with identifier or name '{}'", key))
    }

    /// Ask a yes/no question defaulting to yes; `yes` answers it up front
    pub fn confirm(&self, yes: bool, question: &str) -> Result<bool> {
        if yes {
            return Ok(true);
        }
        self.prompter.get_bool(question, true)
    }
}
