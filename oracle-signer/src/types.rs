//! Shared types for proposal signing

use alloy::primitives::{Address, B256, U256};
use oracle_core::{OracleError, ValidationError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// Custom serialization for U256 fields
// ============================================================================

/// Serialize U256 as a decimal string (e.g., "1000000" not "0xf4240")
fn serialize_u256_as_decimal<S>(value: &U256, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

/// Deserialize U256 from a decimal string
fn deserialize_u256_from_decimal<'de, D>(deserializer: D) -> std::result::Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    U256::from_str_radix(&s, 10).map_err(serde::de::Error::custom)
}

/// Serialize Address as checksum format
fn serialize_address_checksum<S>(value: &Address, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_checksum(None))
}

/// Deserialize Address from any format (checksum or lowercase)
fn deserialize_address<'de, D>(deserializer: D) -> std::result::Result<Address, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

// ============================================================================
// Domain
// ============================================================================

/// Protocol name hashed into the domain separator
pub const DOMAIN_NAME: &str = "PredictionMarketOracle";

/// Protocol version hashed into the domain separator
pub const DOMAIN_VERSION: &str = "1";

/// Polygon Chain ID
pub const POLYGON_CHAIN_ID: u64 = 137;

/// Default validity window of a signed proposal
pub const DEFAULT_VALIDITY_SECS: u64 = 3_600;

/// The chain and contract a proposal signature is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalDomain {
    pub chain_id: u64,
    /// Oracle contract that verifies proposals - checksum format
    #[serde(serialize_with = "serialize_address_checksum", deserialize_with = "deserialize_address")]
    pub verifying_contract: Address,
}

impl ProposalDomain {
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            chain_id,
            verifying_contract,
        }
    }
}

// ============================================================================
// Proposal
// ============================================================================

/// Typed-data payload attesting to a market outcome.
/// All integers are 256-bit to match on-chain `uint256` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    #[serde(serialize_with = "serialize_u256_as_decimal", deserialize_with = "deserialize_u256_from_decimal")]
    pub market_id: U256,
    #[serde(serialize_with = "serialize_u256_as_decimal", deserialize_with = "deserialize_u256_from_decimal")]
    pub outcome_id: U256,
    /// Market close time (unix seconds)
    #[serde(serialize_with = "serialize_u256_as_decimal", deserialize_with = "deserialize_u256_from_decimal")]
    pub close_time: U256,
    /// keccak256 of the ABI-encoded evidence URI list
    pub evidence_hash: B256,
    /// Earliest time the proposal may be submitted (unix seconds)
    #[serde(serialize_with = "serialize_u256_as_decimal", deserialize_with = "deserialize_u256_from_decimal")]
    pub not_before: U256,
    /// Latest time the proposal may be submitted (unix seconds)
    #[serde(serialize_with = "serialize_u256_as_decimal", deserialize_with = "deserialize_u256_from_decimal")]
    pub deadline: U256,
}

// ============================================================================
// Signature
// ============================================================================

/// Length of an r || s || v signature
pub const SIGNATURE_LENGTH: usize = 65;

/// 65-byte ECDSA signature with v in {27, 28}
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ProposalSignature([u8; SIGNATURE_LENGTH]);

impl ProposalSignature {
    /// Build from r, s and a raw or Ethereum-style recovery id
    pub fn from_parts(r: U256, s: U256, recovery_id: u8) -> Self {
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes[..32].copy_from_slice(&r.to_be_bytes::<32>());
        bytes[32..64].copy_from_slice(&s.to_be_bytes::<32>());
        bytes[64] = if recovery_id < 27 { recovery_id + 27 } else { recovery_id };
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SIGNATURE_LENGTH {
            return Err(SignerError::SignatureLength(bytes.len()));
        }
        if bytes.len() > SIGNATURE_LENGTH {
            return Err(SignerError::InvalidSignature(format!(
                "expected {SIGNATURE_LENGTH} bytes, got {}",
                bytes.len()
            )));
        }
        let mut out = [0u8; SIGNATURE_LENGTH];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = hex::decode(s.strip_prefix("0x").unwrap_or(s))
            .map_err(|e| SignerError::InvalidSignature(format!("invalid hex: {e}")))?;
        Self::from_slice(&raw)
    }

    pub fn r(&self) -> B256 {
        B256::from_slice(&self.0[..32])
    }

    pub fn s(&self) -> B256 {
        B256::from_slice(&self.0[32..64])
    }

    pub fn v(&self) -> u8 {
        self.0[64]
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for ProposalSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProposalSignature({})", self.to_hex())
    }
}

impl Serialize for ProposalSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ProposalSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s: String = Deserialize::deserialize(deserializer)?;
        ProposalSignature::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Signed proposal ready for hand-off to chain submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    pub proposal: Proposal,
    pub domain: ProposalDomain,
    /// EIP-712 signing digest
    pub digest: B256,
    pub signature: ProposalSignature,
    /// Signer address - checksum format
    #[serde(serialize_with = "serialize_address_checksum", deserialize_with = "deserialize_address")]
    pub signer: Address,
}

// ============================================================================
// Error Types
// ============================================================================

/// Signing errors
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Signature too short: expected 65 bytes, got {0}")]
    SignatureLength(usize),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    #[error("Recovery failed: {0}")]
    Recovery(String),

    #[error("Invalid proposal field {field}: {message}")]
    InvalidProposal { field: String, message: String },

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

impl SignerError {
    pub fn invalid_proposal(field: impl Into<String>, message: impl Into<String>) -> Self {
        SignerError::InvalidProposal {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<SignerError> for OracleError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::InvalidProposal { field, message } => {
                OracleError::Validation(ValidationError::new(field, message))
            }
            SignerError::MissingCredentials(msg) | SignerError::Wallet(msg) => OracleError::Config(msg),
            other => OracleError::Signature(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SignerError>;
