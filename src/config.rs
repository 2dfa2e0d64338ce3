use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_SOPS_BINARY: &str = "sops";
const DEFAULT_SOPS_TIMEOUT_SECS: u64 = 240;
const DEFAULT_AWS_OPERATION_TIMEOUT_SECS: u64 = 30;

/// Which backend this function publishes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    SecretsManager,
    SsmParameter,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "secrets-manager" => Ok(Self::SecretsManager),
            "ssm-parameter" => Ok(Self::SsmParameter),
            other => bail!("unknown provider kind '{other}', expected secrets-manager or ssm-parameter"),
        }
    }
}

/// What happens when the SSM `PutParameter` call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteFailurePolicy {
    /// Log the failure and report success.
    #[default]
    Lenient,
    /// Fail the invocation.
    Strict,
}

impl FromStr for WriteFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => bail!("unknown write failure policy '{other}', expected lenient or strict"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub sops_binary: PathBuf,
    pub sops_timeout: Duration,
    pub aws_operation_timeout: Duration,
    pub write_failure_policy: WriteFailurePolicy,
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let kind = lookup("SOPS_PROVIDER_KIND")
            .context("Missing SOPS_PROVIDER_KIND")?
            .parse()?;

        let sops_binary = lookup("SOPS_BINARY")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SOPS_BINARY.to_string())
            .into();

        let sops_timeout = seconds(&lookup, "SOPS_TIMEOUT_SECS", DEFAULT_SOPS_TIMEOUT_SECS)?;
        let aws_operation_timeout = seconds(
            &lookup,
            "AWS_OPERATION_TIMEOUT_SECS",
            DEFAULT_AWS_OPERATION_TIMEOUT_SECS,
        )?;

        let write_failure_policy = match lookup("SSM_WRITE_FAILURE_POLICY") {
            Some(value) => value.parse()?,
            None => WriteFailurePolicy::default(),
        };

        Ok(Self {
            kind,
            sops_binary,
            sops_timeout,
            aws_operation_timeout,
            write_failure_policy,
        })
    }
}

fn seconds(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: u64) -> Result<Duration> {
    let secs = match lookup(name) {
        Some(value) => value
            .parse::<u64>()
            .with_context(|| format!("{name} is not a valid number of seconds: '{value}'"))?,
        None => default,
    };
    if secs == 0 {
        bail!("{name} must be greater than zero");
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ProviderConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ProviderConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("SOPS_PROVIDER_KIND", "secrets-manager")]).unwrap();

        assert_eq!(config.kind, ProviderKind::SecretsManager);
        assert_eq!(config.sops_binary, PathBuf::from("sops"));
        assert_eq!(config.sops_timeout, Duration::from_secs(240));
        assert_eq!(config.aws_operation_timeout, Duration::from_secs(30));
        assert_eq!(config.write_failure_policy, WriteFailurePolicy::Lenient);
    }

    #[test]
    fn overrides_are_read() {
        let config = config(&[
            ("SOPS_PROVIDER_KIND", "ssm-parameter"),
            ("SOPS_BINARY", "/opt/bin/sops"),
            ("SOPS_TIMEOUT_SECS", "60"),
            ("AWS_OPERATION_TIMEOUT_SECS", "5"),
            ("SSM_WRITE_FAILURE_POLICY", "strict"),
        ])
        .unwrap();

        assert_eq!(config.kind, ProviderKind::SsmParameter);
        assert_eq!(config.sops_binary, PathBuf::from("/opt/bin/sops"));
        assert_eq!(config.sops_timeout, Duration::from_secs(60));
        assert_eq!(config.aws_operation_timeout, Duration::from_secs(5));
        assert_eq!(config.write_failure_policy, WriteFailurePolicy::Strict);
    }

    #[test]
    fn kind_is_required() {
        assert!(config(&[]).is_err());
        assert!(config(&[("SOPS_PROVIDER_KIND", "vault")]).is_err());
    }

    #[test]
    fn bad_timeouts_are_rejected() {
        assert!(config(&[("SOPS_PROVIDER_KIND", "secrets-manager"), ("SOPS_TIMEOUT_SECS", "soon")]).is_err());
        assert!(config(&[("SOPS_PROVIDER_KIND", "secrets-manager"), ("SOPS_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn bad_policy_is_rejected() {
        assert!(config(&[
            ("SOPS_PROVIDER_KIND", "ssm-parameter"),
            ("SSM_WRITE_FAILURE_POLICY", "ignore")
        ])
        .is_err());
    }
}
