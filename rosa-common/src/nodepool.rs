//! Node pools of hosted clusters

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Set of worker machines with a uniform configuration
///
/// Exactly one of `replicas` and `autoscaling` is set on a complete pool.
/// Update requests are partial, so every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePool {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<NodePoolAutoscaling>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_node_pool: Option<AwsNodePool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodePoolStatus>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePoolAutoscaling {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replica: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replica: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AwsNodePool {
    pub instance_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePoolStatus {
    #[serde(default)]
    pub current_replicas: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl NodePool {
    pub fn builder() -> NodePoolBuilder {
        NodePoolBuilder::default()
    }

    /// Human readable size: `3` or `1-5` for autoscaled pools
    pub fn size_display(&self) -> String {
        match (&self.autoscaling, self.replicas) {
            (Some(a), _) => format!(
                "{}-{}",
                a.min_replica.unwrap_or_default(),
                a.max_replica.unwrap_or_default()
            ),
            (None, Some(r)) => r.to_string(),
            (None, None) => String::new(),
        }
    }
}

impl NodePoolAutoscaling {
    pub fn new(min_replica: i32, max_replica: i32) -> Self {
        Self {
            min_replica: Some(min_replica),
            max_replica: Some(max_replica),
        }
    }
}

/// Builder for create and update requests
#[derive(Debug, Clone, Default)]
pub struct NodePoolBuilder {
    id: Option<String>,
    replicas: Option<i32>,
    autoscaling: Option<NodePoolAutoscaling>,
    instance_type: Option<String>,
}

impl NodePoolBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn replicas(mut self, replicas: i32) -> Self {
        self.replicas = Some(replicas);
        self
    }

    pub fn autoscaling(mut self, autoscaling: NodePoolAutoscaling) -> Self {
        self.autoscaling = Some(autoscaling);
        self
    }

    pub fn instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = Some(instance_type.into());
        self
    }

    pub fn build(self) -> Result<NodePool> {
        if self.replicas.is_some() && self.autoscaling.is_some() {
            return Err(Error::Validation(
                "Replicas can't be set when autoscaling is enabled".to_string(),
            ));
        }
        if let Some(replicas) = self.replicas {
            if replicas < 0 {
                return Err(Error::Validation(
                    "The number of machine pool replicas needs to be a non-negative integer"
                        .to_string(),
                ));
            }
        }
        if let Some(autoscaling) = &self.autoscaling {
            validate_autoscaling(autoscaling.min_replica, autoscaling.max_replica)?;
        }

        Ok(NodePool {
            id: self.id.unwrap_or_default(),
            replicas: self.replicas,
            autoscaling: self.autoscaling,
            aws_node_pool: self
                .instance_type
                .map(|instance_type| AwsNodePool { instance_type }),
            ..Default::default()
        })
    }
}

/// Bounds must be non-negative and ordered when both are known
pub fn validate_autoscaling(min: Option<i32>, max: Option<i32>) -> Result<()> {
    if min.is_some_and(|m| m < 0) {
        return Err(Error::Validation(
            "Min replicas needs to be a non-negative integer".to_string(),
        ));
    }
    if max.is_some_and(|m| m < 0) {
        return Err(Error::Validation(
            "Max replicas needs to be a non-negative integer".to_string(),
        ));
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(Error::Validation(format!(
                "Min replicas ({}) can't be greater than max replicas ({})",
                min, max
            )));
        }
    }
    Ok(())
}
