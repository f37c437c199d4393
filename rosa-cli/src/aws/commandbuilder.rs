//! `aws` CLI command strings printed in manual mode

use std::collections::BTreeMap;

const LINE_BREAK: &str = " \\\n\t";

/// One `aws <service> <action> --param value ...` invocation
#[derive(Debug, Clone)]
pub struct AwsCommand {
    service: &'static str,
    action: &'static str,
    params: Vec<String>,
}

impl AwsCommand {
    pub fn iam(action: &'static str) -> Self {
        Self {
            service: "iam",
            action,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl AsRef<str>) -> Self {
        self.params.push(format!("--{} {}", name, value.as_ref()));
        self
    }

    /// Switch without a value, e.g. `--set-as-default`
    pub fn flag(mut self, name: &str) -> Self {
        self.params.push(format!("--{}", name));
        self
    }

    /// `--tags Key=k,Value=v ...`; nothing is added for an empty map
    pub fn tags(self, tags: &BTreeMap<String, String>) -> Self {
        if tags.is_empty() {
            return self;
        }
        let value = tags
            .iter()
            .map(|(k, v)| format!("Key={},Value={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        self.param("tags", value)
    }

    pub fn build(&self) -> String {
        let mut cmd = format!("aws {} {}", self.service, self.action);
        for param in &self.params {
            cmd.push_str(LINE_BREAK);
            cmd.push_str(param);
        }
        cmd
    }
}

/// Commands separated by a blank line
pub fn join_commands(commands: &[String]) -> String {
    commands.join("\n\n")
}

/// `file://<name>` reference for policy documents saved next to the commands
pub fn file_ref(file_name: &str) -> String {
    format!("file://{}", file_name)
}
