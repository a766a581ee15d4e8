//! Oracle Signer - EIP-712 attestation of market outcomes
//!
//! This crate provides:
//! - Signing key management (loading from env, generation, recovery)
//! - Evidence commitment over cited URIs
//! - EIP-712 digest construction for outcome proposals
//! - Proposal assembly and signing from a pipeline decision

pub mod eip712;
pub mod evidence;
pub mod proposal;
pub mod types;
pub mod wallet;

pub use eip712::{domain_separator, signing_digest, struct_hash};
pub use evidence::{encode_string_array, evidence_hash};
pub use proposal::{build_proposal, parse_market_id, verify_attestation, ProposalSigner};
pub use types::*;
pub use wallet::{recover_signer, verify_signature, OracleWallet};
