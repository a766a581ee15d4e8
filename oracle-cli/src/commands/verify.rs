//! `verify`: check a saved attestation offline

use std::path::PathBuf;

use alloy::primitives::Address;
use anyhow::{bail, Context};
use oracle_signer::{recover_signer, signing_digest, Attestation};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{emit_json, read_json};

#[derive(Debug, Clone)]
pub struct VerifyArgs {
    /// Attestation or full resolution report
    pub path: PathBuf,
    /// Require this signer instead of the one recorded in the attestation
    pub expected_signer: Option<Address>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AttestationFile {
    Report { attestation: Attestation },
    Bare(Attestation),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerificationResult {
    valid: bool,
    digest_matches: bool,
    recovered_signer: String,
    expected_signer: String,
}

pub async fn verify(args: VerifyArgs) -> anyhow::Result<()> {
    let file: AttestationFile = read_json(&args.path, "attestation").await?;
    let attestation = match file {
        AttestationFile::Report { attestation } | AttestationFile::Bare(attestation) => attestation,
    };

    let digest = signing_digest(&attestation.domain, &attestation.proposal);
    let digest_matches = digest == attestation.digest;
    let recovered = recover_signer(digest, attestation.signature.as_bytes()).context("signature recovery failed")?;
    let expected = args.expected_signer.unwrap_or(attestation.signer);

    let result = VerificationResult {
        valid: digest_matches && recovered == expected,
        digest_matches,
        recovered_signer: recovered.to_checksum(None),
        expected_signer: expected.to_checksum(None),
    };
    emit_json(&result, None).await?;

    if !result.valid {
        bail!("attestation does not verify against {}", result.expected_signer);
    }
    info!("Attestation verified for signer {}", result.recovered_signer);
    Ok(())
}
