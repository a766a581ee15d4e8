//! Environment-driven configuration for the oracle binary

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use oracle_core::{OracleError, OracleResult};
use oracle_research::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use oracle_signer::{ProposalDomain, DEFAULT_VALIDITY_SECS, POLYGON_CHAIN_ID};
use oracle_tools::ToolStackOptions;

#[derive(Clone)]
pub struct OracleConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub private_key: Option<String>,
    pub chain_id: u64,
    pub verifying_contract: Option<Address>,
    pub proposal_validity: Duration,
    pub tools: ToolStackOptions,
    pub run_timeout: Duration,
}

impl OracleConfig {
    pub fn from_env() -> OracleResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> OracleResult<Self> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let verifying_contract = get("ORACLE_VERIFYING_CONTRACT")
            .map(|raw| {
                Address::from_str(&raw).map_err(|e| {
                    OracleError::config(format!("ORACLE_VERIFYING_CONTRACT is not an address: {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            private_key: get("ORACLE_PRIVATE_KEY"),
            chain_id: parse_or(&get, "ORACLE_CHAIN_ID", POLYGON_CHAIN_ID)?,
            verifying_contract,
            proposal_validity: Duration::from_secs(parse_or(&get, "ORACLE_PROPOSAL_VALIDITY_SECS", DEFAULT_VALIDITY_SECS)?),
            tools: ToolStackOptions {
                timeout: Duration::from_secs(parse_or(&get, "ORACLE_TOOL_TIMEOUT_SECS", 30)?),
                max_retries: parse_or(&get, "ORACLE_TOOL_RETRIES", 2)?,
                retry_delay: Duration::from_millis(parse_or(&get, "ORACLE_TOOL_RETRY_DELAY_MS", 500)?),
            },
            run_timeout: Duration::from_secs(parse_or(&get, "ORACLE_RUN_TIMEOUT_SECS", 300)?),
        })
    }

    pub fn require_openai_key(&self) -> OracleResult<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| OracleError::config("OPENAI_API_KEY environment variable not set"))
    }

    pub fn require_private_key(&self) -> OracleResult<&str> {
        self.private_key
            .as_deref()
            .ok_or_else(|| OracleError::config("ORACLE_PRIVATE_KEY environment variable not set"))
    }

    pub fn domain(&self) -> OracleResult<ProposalDomain> {
        let contract = self
            .verifying_contract
            .ok_or_else(|| OracleError::config("ORACLE_VERIFYING_CONTRACT environment variable not set"))?;
        Ok(ProposalDomain::new(self.chain_id, contract))
    }

    pub fn can_sign(&self) -> bool {
        self.private_key.is_some() && self.verifying_contract.is_some()
    }
}

fn parse_or<T, F>(get: &F, name: &str, default: T) -> OracleResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| OracleError::config(format!("{name}={raw:?} is invalid: {e}"))),
        None => Ok(default),
    }
}

impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("has_openai_key", &self.openai_api_key.is_some())
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("has_private_key", &self.private_key.is_some())
            .field("chain_id", &self.chain_id)
            .field("verifying_contract", &self.verifying_contract)
            .field("proposal_validity", &self.proposal_validity)
            .field("tools", &self.tools)
            .field("run_timeout", &self.run_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> OracleResult<OracleConfig> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        OracleConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(config.openai_model, "gpt-4o");
        assert_eq!(config.chain_id, 137);
        assert_eq!(config.proposal_validity, Duration::from_secs(3600));
        assert_eq!(config.tools.timeout, Duration::from_secs(30));
        assert_eq!(config.tools.max_retries, 2);
        assert_eq!(config.tools.retry_delay, Duration::from_millis(500));
        assert_eq!(config.run_timeout, Duration::from_secs(300));
        assert!(!config.can_sign());
        assert!(config.require_openai_key().is_err());
        assert!(config.domain().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4.1"),
            ("ORACLE_PRIVATE_KEY", "0xabc"),
            ("ORACLE_CHAIN_ID", "80002"),
            ("ORACLE_VERIFYING_CONTRACT", "0x4bfb41d5b3570defd03c39a9a4d8de6bd8b8982e"),
            ("ORACLE_TOOL_RETRIES", "0"),
            ("ORACLE_RUN_TIMEOUT_SECS", "  60 "),
        ])
        .unwrap();

        assert_eq!(config.require_openai_key().unwrap(), "sk-test");
        assert_eq!(config.openai_model, "gpt-4.1");
        assert_eq!(config.tools.max_retries, 0);
        assert_eq!(config.run_timeout, Duration::from_secs(60));
        assert!(config.can_sign());
        assert_eq!(config.domain().unwrap().chain_id, 80002);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(config(&[("ORACLE_CHAIN_ID", "polygon")]), Err(OracleError::Config(_))));
        assert!(matches!(
            config(&[("ORACLE_VERIFYING_CONTRACT", "0x1234")]),
            Err(OracleError::Config(_))
        ));
        // Blank counts as unset
        assert!(config(&[("OPENAI_API_KEY", "  ")]).unwrap().openai_api_key.is_none());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = config(&[("OPENAI_API_KEY", "sk-secret"), ("ORACLE_PRIVATE_KEY", "0xdeadbeef")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("deadbeef"));
    }
}
