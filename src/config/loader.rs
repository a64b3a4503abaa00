//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
    let path = Path::new(path);

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| "Failed to parse config.toml")?;

    validate_config(&config)?;

    info!(
        chain_id = config.node.chain_id,
        modules = config.modules.len(),
        proposals = config.proposals.len(),
        auto_execute = config.keeper.auto_execute,
        "Configuration loaded successfully"
    );

    Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Parseable addresses and calldata
/// - Unique module names, resolvable proposal -> module references
/// - Non-empty batches and sensible scan parameters
fn validate_config(config: &AppConfig) -> Result<()> {
    anyhow::ensure!(
        !config.modules.is_empty(),
        "At least one execution module must be configured"
    );

    let mut names = HashSet::new();
    for (i, module) in config.modules.iter().enumerate() {
        anyhow::ensure!(
            names.insert(module.name.as_str()),
            "Module {} ({}) has a duplicate name",
            i,
            module.name
        );
        module
            .address
            .parse::<alloy::primitives::Address>()
            .with_context(|| format!("Module {} ({}) has an invalid address", i, module.name))?;
    }

    for (i, proposal) in config.proposals.iter().enumerate() {
        anyhow::ensure!(
            names.contains(proposal.module.as_str()),
            "Proposal {} ({}) references unknown module {}",
            i,
            proposal.proposal_id,
            proposal.module
        );
        anyhow::ensure!(
            !proposal.proposal_id.is_empty(),
            "Proposal {} has an empty proposal_id",
            i
        );
        anyhow::ensure!(
            !proposal.batches.is_empty(),
            "Proposal {} ({}) has no batches",
            i,
            proposal.proposal_id
        );
        for (nonce, batch) in proposal.batches.iter().enumerate() {
            anyhow::ensure!(
                !batch.transactions.is_empty(),
                "Proposal {} ({}) batch {} is empty",
                i,
                proposal.proposal_id,
                nonce
            );
        }
        // Surface parse errors at load time, not at first use.
        proposal.to_batches().with_context(|| {
            format!("Proposal {} ({}) has invalid transactions", i, proposal.proposal_id)
        })?;
    }

    anyhow::ensure!(config.scan.max_range > 0, "scan.max_range must be positive");
    anyhow::ensure!(config.scan.multiplier >= 2, "scan.multiplier must be at least 2");
    anyhow::ensure!(config.scan.width > 0, "scan.width must be positive");
    anyhow::ensure!(
        config.node.timeout_seconds > 0,
        "node.timeout_seconds must be positive"
    );
    config
        .node
        .multicall3
        .parse::<alloy::primitives::Address>()
        .context("node.multicall3 is not a valid address")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
        [keeper]
        name = "govexec-keeper"

        [node]
        rpc_url = "http://localhost:8545"
        chain_id = 100

        [[modules]]
        name = "safe-reality"
        kind = "reality"
        address = "0x1c511d88ba898b4D9cd9113D13B9c360a02Fcea1"
        safe_version = "1.3.0"

        [[proposals]]
        module = "safe-reality"
        proposal_id = "QmWqE2test"

        [[proposals.batches]]
        [[proposals.batches.transactions]]
        to = "0x000000000000000000000000000000000000dEaD"
        value = "1000000000000000000"
    "#;

    #[test]
    fn test_valid_config_parses() {
        let config: AppConfig = toml::from_str(VALID).unwrap();
        validate_config(&config).unwrap();
        assert_eq!(config.node.chain_id, 100);
        assert_eq!(config.keeper.poll_interval_seconds, 30);
        assert!(!config.keeper.auto_execute);
    }

    #[test]
    fn test_unknown_module_reference_rejected() {
        let broken = VALID.replace("module = \"safe-reality\"", "module = \"nope\"");
        let config: AppConfig = toml::from_str(&broken).unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_bad_address_rejected() {
        let broken = VALID.replace("0x000000000000000000000000000000000000dEaD", "not-an-address");
        let config: AppConfig = toml::from_str(&broken).unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_batch_rejected() {
        // Demote the member transaction to an empty list; the leftover
        // to/value keys are ignored unknown fields.
        let broken = VALID.replace("[[proposals.batches.transactions]]", "transactions = []");
        let config: AppConfig = toml::from_str(&broken).unwrap();
        assert!(validate_config(&config).is_err());
    }
}
