use std::{fmt, path::PathBuf, time::Duration};

use alloy_primitives::Address;
use cohort_crypto::{PrivateKey, PublicKey};
use cohort_primitives::{core_contracts, ChainId, OperatorPeerInfo, OperatorSetId};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::ConfigError;

/// Default port of the aggregator RPC server.
pub const DEFAULT_SERVER_PORT: u16 = 9010;

const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 10;
const DEFAULT_TASK_INTERVAL_MS: u64 = 5_000;
const DEFAULT_THRESHOLD_PERCENTAGE: u8 = 100;
const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 3_000;

fn default_server_port() -> u16 {
    DEFAULT_SERVER_PORT
}

fn default_poll_interval_seconds() -> u64 {
    DEFAULT_POLL_INTERVAL_SECONDS
}

fn default_task_interval_ms() -> u64 {
    DEFAULT_TASK_INTERVAL_MS
}

fn default_threshold_percentage() -> u8 {
    DEFAULT_THRESHOLD_PERCENTAGE
}

fn default_response_timeout_ms() -> u64 {
    DEFAULT_RESPONSE_TIMEOUT_MS
}

/// Hex encoded BN254 secret scalar, wiped from memory on drop.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SigningKey(String);

impl SigningKey {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn to_private_key(&self) -> Result<PrivateKey, ConfigError> {
        PrivateKey::from_hex(self.0.trim()).map_err(ConfigError::SigningKey)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Identity the aggregator signs with.
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorConfig {
    pub address: Address,
    pub signing_key: SigningKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// URL executors send results to. Defaults to the local server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregator_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            aggregator_url: None,
        }
    }
}

impl ServerConfig {
    pub fn aggregator_url(&self) -> String {
        self.aggregator_url
            .clone()
            .unwrap_or_else(|| format!("http://127.0.0.1:{}", self.port))
    }
}

/// Local event injection instead of polling a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSimulationConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Port of the `poller_pushEvent` server.
    pub port: u16,

    /// Also emit a synthetic task every `task_interval_ms`.
    #[serde(default)]
    pub automatic_poller: bool,

    #[serde(default = "default_task_interval_ms")]
    pub task_interval_ms: u64,

    /// Operator set the synthetic tasks are addressed to.
    #[serde(default)]
    pub operator_set_id: OperatorSetId,
}

/// How events for a chain are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerKind {
    Evm,
    Manual {
        port: u16,
    },
    Simulated {
        port: u16,
        task_interval: Duration,
        operator_set_id: OperatorSetId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: ChainId,
    pub rpc_url: String,

    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    /// Watched in addition to the chain's core contracts.
    #[serde(default)]
    pub extra_contracts: Vec<Address>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<ChainSimulationConfig>,
}

impl ChainConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn poller_kind(&self) -> PollerKind {
        match &self.simulation {
            Some(sim) if sim.enabled && sim.automatic_poller => PollerKind::Simulated {
                port: sim.port,
                task_interval: Duration::from_millis(sim.task_interval_ms),
                operator_set_id: sim.operator_set_id,
            },
            Some(sim) if sim.enabled => PollerKind::Manual { port: sim.port },
            _ => PollerKind::Evm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningCurve {
    Bn254,
    Bls381,
}

impl fmt::Display for SigningCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningCurve::Bn254 => f.write_str("bn254"),
            SigningCurve::Bls381 => f.write_str("bls381"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxContract {
    pub chain_id: ChainId,
    pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvsConfig {
    pub address: Address,

    /// Per-call timeout when delivering tasks to executors.
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,

    pub chain_ids: Vec<ChainId>,

    pub signing_curve: SigningCurve,

    #[serde(default = "default_threshold_percentage")]
    pub threshold_percentage: u8,

    /// Pause before each certificate submission.
    #[serde(default)]
    pub write_delay_seconds: u64,

    /// Overrides the canonical task mailbox per chain.
    #[serde(default)]
    pub mailbox_contracts: Vec<MailboxContract>,
}

impl AvsConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn write_delay(&self) -> Duration {
        Duration::from_secs(self.write_delay_seconds)
    }

    /// Task mailbox on `chain_id`: the configured override, else the canonical deployment.
    pub fn mailbox_for(&self, chain_id: ChainId) -> Option<Address> {
        self.mailbox_contracts
            .iter()
            .find(|m| m.chain_id == chain_id)
            .map(|m| m.address)
            .or_else(|| core_contracts(chain_id).and_then(|c| c.task_mailbox))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    pub operator_address: Address,
    /// `host:port` of the operator's RPC server.
    pub network_address: String,
    /// Hex of the G1 and G2 public key forms.
    pub public_key: String,
    #[serde(default)]
    pub operator_set_ids: Vec<OperatorSetId>,
}

impl PeerConfig {
    pub fn to_peer_info(&self) -> Result<OperatorPeerInfo, ConfigError> {
        let public_key =
            PublicKey::from_hex(self.public_key.trim()).map_err(|source| ConfigError::PeerKey {
                operator: self.operator_address.to_string(),
                source,
            })?;
        Ok(OperatorPeerInfo {
            operator_address: self.operator_address,
            network_address: self.network_address.clone(),
            public_key,
            operator_set_ids: self.operator_set_ids.clone(),
        })
    }
}

/// Peering data known at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeeringConfig {
    #[serde(default)]
    pub executor_peers: Vec<PeerConfig>,
    #[serde(default)]
    pub aggregator_peers: Vec<PeerConfig>,
}

impl PeeringConfig {
    pub fn executor_peer_infos(&self) -> Result<Vec<OperatorPeerInfo>, ConfigError> {
        self.executor_peers.iter().map(PeerConfig::to_peer_info).collect()
    }

    pub fn aggregator_peer_infos(&self) -> Result<Vec<OperatorPeerInfo>, ConfigError> {
        self.aggregator_peers
            .iter()
            .map(PeerConfig::to_peer_info)
            .collect()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Appended to the service name, e.g. "prod" or "dev".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_label: Option<String>,

    /// OpenTelemetry OTLP endpoint URL for distributed tracing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otlp_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file_prefix: Option<String>,

    /// JSON lines instead of the compact format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_format: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Chain the operator registry lives on.
    pub l1_chain_id: ChainId,

    pub operator: OperatorConfig,

    #[serde(default)]
    pub server: ServerConfig,

    pub chains: Vec<ChainConfig>,

    pub avss: Vec<AvsConfig>,

    #[serde(default)]
    pub peering: PeeringConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AggregatorConfig {
    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }
}
