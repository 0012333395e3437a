use std::collections::HashSet;

use cohort_crypto::PublicKey;

use crate::{
    config::{AggregatorConfig, SigningCurve},
    errors::{ConfigError, ValidationIssue},
};

impl AggregatorConfig {
    /// Checks every rule and reports all violations at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut issues = Vec::new();

        if self.operator.signing_key.to_private_key().is_err() {
            issues.push(ValidationIssue::new(
                "operator.signing_key",
                "not a valid bn254 secret key",
            ));
        }
        if self.server.port == 0 {
            issues.push(ValidationIssue::new("server.port", "must be non-zero"));
        }

        validate_chains(self, &mut issues);
        validate_avss(self, &mut issues);
        validate_peers(self, &mut issues);

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }
}

fn validate_chains(config: &AggregatorConfig, issues: &mut Vec<ValidationIssue>) {
    if config.chains.is_empty() {
        issues.push(ValidationIssue::new("chains", "at least one chain is required"));
    }

    let mut seen = HashSet::new();
    for (i, chain) in config.chains.iter().enumerate() {
        let path = format!("chains[{i}]");
        if chain.name.trim().is_empty() {
            issues.push(ValidationIssue::new(format!("{path}.name"), "name is required"));
        }
        if chain.rpc_url.trim().is_empty() {
            issues.push(ValidationIssue::new(format!("{path}.rpc_url"), "rpc_url is required"));
        }
        if !chain.chain_id.is_supported() {
            issues.push(ValidationIssue::new(
                format!("{path}.chain_id"),
                format!("unsupported chain id {}", chain.chain_id),
            ));
        }
        if !seen.insert(chain.chain_id) {
            issues.push(ValidationIssue::new(
                format!("{path}.chain_id"),
                format!("chain id {} configured twice", chain.chain_id),
            ));
        }
        if chain.poll_interval_seconds == 0 {
            issues.push(ValidationIssue::new(
                format!("{path}.poll_interval_seconds"),
                "must be non-zero",
            ));
        }
        if let Some(sim) = chain.simulation.as_ref().filter(|s| s.enabled) {
            if sim.port == 0 {
                issues.push(ValidationIssue::new(format!("{path}.simulation.port"), "must be non-zero"));
            }
            if sim.automatic_poller && sim.task_interval_ms == 0 {
                issues.push(ValidationIssue::new(
                    format!("{path}.simulation.task_interval_ms"),
                    "must be non-zero",
                ));
            }
        }
    }

    if config.chain(config.l1_chain_id).is_none() {
        issues.push(ValidationIssue::new(
            "l1_chain_id",
            format!("{} must be one of the configured chains", config.l1_chain_id),
        ));
    }
}

fn validate_avss(config: &AggregatorConfig, issues: &mut Vec<ValidationIssue>) {
    if config.avss.is_empty() {
        issues.push(ValidationIssue::new("avss", "at least one avs is required"));
    }

    for (i, avs) in config.avss.iter().enumerate() {
        let path = format!("avss[{i}]");
        if avs.address.is_zero() {
            issues.push(ValidationIssue::new(format!("{path}.address"), "address is required"));
        }
        if avs.chain_ids.is_empty() {
            issues.push(ValidationIssue::new(format!("{path}.chain_ids"), "at least one chain is required"));
        }
        for chain_id in &avs.chain_ids {
            if config.chain(*chain_id).is_none() {
                issues.push(ValidationIssue::new(
                    format!("{path}.chain_ids"),
                    format!("chain {chain_id} is not configured"),
                ));
            }
        }
        if avs.threshold_percentage == 0 || avs.threshold_percentage > 100 {
            issues.push(ValidationIssue::new(
                format!("{path}.threshold_percentage"),
                format!("{} is outside (0, 100]", avs.threshold_percentage),
            ));
        }
        if avs.signing_curve != SigningCurve::Bn254 {
            issues.push(ValidationIssue::new(
                format!("{path}.signing_curve"),
                format!("{} is not supported, only bn254 is implemented", avs.signing_curve),
            ));
        }
    }
}

fn validate_peers(config: &AggregatorConfig, issues: &mut Vec<ValidationIssue>) {
    let groups = [
        ("peering.executor_peers", &config.peering.executor_peers),
        ("peering.aggregator_peers", &config.peering.aggregator_peers),
    ];
    for (group, peers) in groups {
        for (i, peer) in peers.iter().enumerate() {
            if peer.network_address.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    format!("{group}[{i}].network_address"),
                    "network_address is required",
                ));
            }
            if PublicKey::from_hex(peer.public_key.trim()).is_err() {
                issues.push(ValidationIssue::new(
                    format!("{group}[{i}].public_key"),
                    "not a valid bn254 public key",
                ));
            }
        }
    }
}
