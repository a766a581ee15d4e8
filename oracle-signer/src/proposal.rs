//! Turning a decision into a signed outcome proposal

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Duration, Utc};
use oracle_core::{Decision, MarketQuestion};
use tracing::{info, instrument};

use crate::eip712::signing_digest;
use crate::evidence::evidence_hash;
use crate::types::{
    Attestation, Proposal, ProposalDomain, Result, SignerError, DEFAULT_VALIDITY_SECS,
};
use crate::wallet::{recover_signer, OracleWallet};

/// Parse a market identifier given as decimal or 0x-prefixed hex
pub fn parse_market_id(id: &str) -> Result<U256> {
    let id = id.trim();
    let parsed = match id.strip_prefix("0x").or_else(|| id.strip_prefix("0X")) {
        Some(hex) if !hex.is_empty() => U256::from_str_radix(hex, 16),
        Some(_) => return Err(SignerError::invalid_proposal("marketId", "empty hex literal")),
        None if id.is_empty() => return Err(SignerError::invalid_proposal("marketId", "empty market id")),
        None => U256::from_str_radix(id, 10),
    };
    parsed.map_err(|e| SignerError::invalid_proposal("marketId", format!("'{id}' is not a 256-bit integer: {e}")))
}

fn unix_seconds(field: &str, at: DateTime<Utc>) -> Result<U256> {
    u64::try_from(at.timestamp())
        .map(U256::from)
        .map_err(|_| SignerError::invalid_proposal(field, format!("{at} is before the unix epoch")))
}

/// Assemble the typed-data payload for a decided market
pub fn build_proposal(question: &MarketQuestion, decision: &Decision, validity: Duration) -> Result<Proposal> {
    if validity <= Duration::zero() {
        return Err(SignerError::invalid_proposal("deadline", "deadline must be after notBefore"));
    }

    let not_before = decision.decided_at;
    let deadline = not_before
        .checked_add_signed(validity)
        .ok_or_else(|| SignerError::invalid_proposal("deadline", "validity window overflows"))?;

    Ok(Proposal {
        market_id: parse_market_id(&question.id)?,
        outcome_id: U256::from(decision.outcome_id),
        close_time: unix_seconds("closeTime", question.close_time)?,
        evidence_hash: evidence_hash(&decision.evidence_uris()),
        not_before: unix_seconds("notBefore", not_before)?,
        deadline: unix_seconds("deadline", deadline)?,
    })
}

/// Signs proposals for a fixed domain
#[derive(Debug, Clone)]
pub struct ProposalSigner {
    wallet: OracleWallet,
    domain: ProposalDomain,
    validity: Duration,
}

impl ProposalSigner {
    pub fn new(wallet: OracleWallet, domain: ProposalDomain) -> Self {
        Self {
            wallet,
            domain,
            validity: Duration::seconds(DEFAULT_VALIDITY_SECS as i64),
        }
    }

    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn domain(&self) -> &ProposalDomain {
        &self.domain
    }

    /// Sign an already-built proposal
    pub async fn sign(&self, proposal: Proposal) -> Result<Attestation> {
        let digest = signing_digest(&self.domain, &proposal);
        let signature = self.wallet.sign_digest(digest).await?;

        Ok(Attestation {
            proposal,
            domain: self.domain,
            digest,
            signature,
            signer: self.wallet.address(),
        })
    }

    /// Build and sign the proposal for a decided market
    #[instrument(skip(self, question, decision), fields(market = %question.id, outcome = decision.outcome_id))]
    pub async fn sign_decision(&self, question: &MarketQuestion, decision: &Decision) -> Result<Attestation> {
        let proposal = build_proposal(question, decision, self.validity)?;
        let attestation = self.sign(proposal).await?;

        info!(
            signer = %attestation.signer,
            digest = %attestation.digest,
            evidence = decision.citations.len(),
            "Signed outcome proposal"
        );
        Ok(attestation)
    }
}

/// Check that an attestation's digest and signature match its proposal and signer
pub fn verify_attestation(attestation: &Attestation) -> Result<bool> {
    let digest = signing_digest(&attestation.domain, &attestation.proposal);
    if digest != attestation.digest {
        return Ok(false);
    }
    Ok(recover_signer(digest, attestation.signature.as_bytes())? == attestation.signer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use oracle_core::Citation;

    fn question(id: &str) -> MarketQuestion {
        MarketQuestion::new(
            id,
            "Will it rain in London on 2026-01-01?",
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    fn decision(urls: &[&str]) -> Decision {
        Decision {
            outcome_id: 1,
            confidence: 0.8,
            reasoning: "Met Office records show rainfall".to_string(),
            facts: Vec::new(),
            citations: urls
                .iter()
                .map(|url| Citation {
                    url: url.to_string(),
                    title: String::new(),
                    snippet: String::new(),
                    weight: 1.0,
                })
                .collect(),
            decided_at: Utc.with_ymd_and_hms(2026, 1, 2, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_parse_market_id() {
        assert_eq!(parse_market_id("12345").unwrap(), U256::from(12345u64));
        assert_eq!(parse_market_id("0xff").unwrap(), U256::from(255u64));
        assert_eq!(parse_market_id(" 0X10 ").unwrap(), U256::from(16u64));
        assert!(parse_market_id("").is_err());
        assert!(parse_market_id("0x").is_err());
        assert!(parse_market_id("will-it-rain").is_err());
    }

    #[test]
    fn test_build_proposal() {
        let decision = decision(&["https://a.example", "https://b.example"]);
        let proposal = build_proposal(&question("7"), &decision, Duration::seconds(3600)).unwrap();

        assert_eq!(proposal.market_id, U256::from(7u8));
        assert_eq!(proposal.outcome_id, U256::from(1u8));
        assert_eq!(proposal.close_time, U256::from(1_767_225_600u64));
        assert_eq!(proposal.not_before, U256::from(decision.decided_at.timestamp() as u64));
        assert_eq!(proposal.deadline, proposal.not_before + U256::from(3600u64));
        assert_eq!(proposal.evidence_hash, evidence_hash(&["https://a.example", "https://b.example"]));
    }

    #[test]
    fn test_build_proposal_rejects_bad_input() {
        let decision = decision(&[]);
        assert!(build_proposal(&question("abc"), &decision, Duration::seconds(60)).is_err());
        assert!(build_proposal(&question("1"), &decision, Duration::zero()).is_err());

        let mut early = question("1");
        early.close_time = Utc.with_ymd_and_hms(1960, 1, 1, 0, 0, 0).unwrap();
        assert!(build_proposal(&early, &decision, Duration::seconds(60)).is_err());
    }
}
