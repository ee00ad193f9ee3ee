//! kubectl executor.
//!
//! Runs whitelisted read-only kubectl verbs against the configured cluster
//! and renders the result as chat text.

use std::{path::PathBuf, process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::process::Command;

use skb_core::{config::Config, domain::Platform, ports::Executor};

#[derive(Clone, Debug)]
pub struct KubectlConfig {
    pub enabled: bool,
    /// Only run commands arriving from the authorized conversation.
    pub restrict_access: bool,
    pub cluster_name: String,
    pub context: Option<String>,
    pub default_namespace: String,
    pub allowed_verbs: Vec<String>,
    pub binary: PathBuf,
    pub timeout: Duration,
}

impl KubectlConfig {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            enabled: cfg.kubectl_enabled,
            restrict_access: cfg.kubectl_restrict_access,
            cluster_name: cfg.cluster_name.clone(),
            context: cfg.kubectl_context.clone(),
            default_namespace: cfg.kubectl_default_namespace.clone(),
            allowed_verbs: cfg.kubectl_commands.clone(),
            binary: cfg.kubectl_path.clone(),
            timeout: cfg.kubectl_timeout,
        }
    }
}

/// Verbs that never take a namespace.
const CLUSTER_SCOPED_VERBS: &[&str] = &[
    "api-resources",
    "api-versions",
    "cluster-info",
    "explain",
    "version",
];

/// What to do with one request, decided before anything is spawned.
#[derive(Debug, PartialEq, Eq)]
enum Plan {
    Reply(String),
    Run(Vec<String>),
}

#[derive(Clone, Debug)]
pub struct KubectlExecutor {
    cfg: KubectlConfig,
}

impl KubectlExecutor {
    pub fn new(cfg: KubectlConfig) -> Self {
        Self { cfg }
    }

    fn plan(&self, authorized: bool, request: &str) -> Plan {
        let mut words = request.split_whitespace().peekable();
        if words.peek() == Some(&"kubectl") {
            words.next();
        }
        let Some(verb) = words.next() else {
            return Plan::Reply(self.help());
        };
        let verb = verb.to_ascii_lowercase();

        match verb.as_str() {
            "help" => return Plan::Reply(self.help()),
            "ping" => return Plan::Reply(format!("pong from cluster '{}'", self.cfg.cluster_name)),
            _ => {}
        }

        if !self.cfg.allowed_verbs.iter().any(|v| *v == verb) {
            return Plan::Reply(format!(
                "Command not supported. Send an empty message or `help` to see the allowed commands on cluster '{}'.",
                self.cfg.cluster_name
            ));
        }
        if !self.cfg.enabled {
            return Plan::Reply(format!(
                "Sorry, the admin hasn't given me permission to execute kubectl command on cluster '{}'.",
                self.cfg.cluster_name
            ));
        }
        if self.cfg.restrict_access && !authorized {
            return Plan::Reply(String::new());
        }

        let args: Vec<String> = words.map(str::to_string).collect();
        if let Some(flag) = args.iter().find(|a| is_streaming_flag(&verb, a)) {
            return Plan::Reply(format!(
                "`{flag}` streams output and never completes; run the command without it."
            ));
        }
        Plan::Run(self.argv(verb, args))
    }

    fn argv(&self, verb: String, args: Vec<String>) -> Vec<String> {
        let has_namespace = CLUSTER_SCOPED_VERBS.contains(&verb.as_str())
            || args.iter().any(|a| is_namespace_flag(a));
        let mut argv = Vec::with_capacity(args.len() + 5);
        argv.push(verb);
        argv.extend(args);
        if let Some(ctx) = &self.cfg.context {
            argv.push("--context".to_string());
            argv.push(ctx.clone());
        }
        if !has_namespace {
            argv.push("-n".to_string());
            argv.push(self.cfg.default_namespace.clone());
        }
        argv
    }

    fn help(&self) -> String {
        format!(
            "Cluster: {}\nAllowed kubectl commands: {}\nAlso available: ping, help",
            self.cfg.cluster_name,
            self.cfg.allowed_verbs.join(", ")
        )
    }

    async fn run(&self, argv: &[String]) -> String {
        tracing::debug!(binary = %self.cfg.binary.display(), ?argv, "Running kubectl");
        let child = Command::new(&self.cfg.binary)
            .args(argv)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        // dropping the timed-out future kills the child
        let Ok(output) = tokio::time::timeout(self.cfg.timeout, child).await else {
            tracing::warn!(timeout_secs = self.cfg.timeout.as_secs_f32(), "kubectl timed out");
            return format!(
                "kubectl on cluster '{}' did not finish within {}s and was stopped.",
                self.cfg.cluster_name,
                self.cfg.timeout.as_secs()
            );
        };

        match output {
            Ok(out) if out.status.success() => format!(
                "Cluster: {}\n{}",
                self.cfg.cluster_name,
                String::from_utf8_lossy(&out.stdout)
            ),
            Ok(out) => {
                tracing::warn!(status = %out.status, "kubectl exited with failure");
                let stderr = String::from_utf8_lossy(&out.stderr);
                if stderr.trim().is_empty() {
                    String::from_utf8_lossy(&out.stdout).into_owned()
                } else {
                    stderr.into_owned()
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to spawn kubectl");
                format!("Failed to run kubectl on cluster '{}': {e}", self.cfg.cluster_name)
            }
        }
    }
}

fn is_namespace_flag(arg: &str) -> bool {
    matches!(arg, "-A" | "--namespace" | "--all-namespaces")
        || arg.starts_with("--namespace=")
        || arg.starts_with("--all-namespaces=")
        // -n, -n=ns and -nns
        || (arg.starts_with("-n") && !arg.starts_with("--"))
}

/// Flags that keep kubectl running until it is killed. `-f` only follows
/// for `logs`; elsewhere it names a manifest.
fn is_streaming_flag(verb: &str, arg: &str) -> bool {
    let name = arg.split_once('=').map_or(arg, |(name, _)| name);
    match name {
        "-w" | "--watch" | "--watch-only" => true,
        "-f" | "--follow" => verb == "logs",
        _ => false,
    }
}

#[async_trait]
impl Executor for KubectlExecutor {
    async fn execute(&self, platform: Platform, authorized: bool, request: &str) -> String {
        tracing::debug!(platform = platform.as_str(), authorized, request, "kubectl request");
        match self.plan(authorized, request.trim()) {
            Plan::Reply(text) => text,
            Plan::Run(argv) => self.run(&argv).await,
        }
    }
}
