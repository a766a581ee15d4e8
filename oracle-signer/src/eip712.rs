//! EIP-712 typed-data hashing for outcome proposals
//!
//! The digest is assembled by hand so the exact byte layout stays visible:
//! `keccak256(0x19 || 0x01 || domainSeparator || structHash)`.

use alloy::primitives::{keccak256, B256, U256};

use crate::types::{Proposal, ProposalDomain, DOMAIN_NAME, DOMAIN_VERSION};

pub const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

pub const PROPOSAL_TYPE: &str = "Proposal(uint256 marketId,uint256 outcomeId,uint256 closeTime,bytes32 evidenceHash,uint256 notBefore,uint256 deadline)";

/// Hash of the domain separator for a chain and verifying contract
pub fn domain_separator(domain: &ProposalDomain) -> B256 {
    let mut buf = Vec::with_capacity(32 * 5);
    buf.extend_from_slice(keccak256(DOMAIN_TYPE).as_slice());
    buf.extend_from_slice(keccak256(DOMAIN_NAME).as_slice());
    buf.extend_from_slice(keccak256(DOMAIN_VERSION).as_slice());
    buf.extend_from_slice(&U256::from(domain.chain_id).to_be_bytes::<32>());
    buf.extend_from_slice(domain.verifying_contract.into_word().as_slice());
    keccak256(&buf)
}

/// `hashStruct(proposal)`
pub fn struct_hash(proposal: &Proposal) -> B256 {
    let mut buf = Vec::with_capacity(32 * 7);
    buf.extend_from_slice(keccak256(PROPOSAL_TYPE).as_slice());
    buf.extend_from_slice(&proposal.market_id.to_be_bytes::<32>());
    buf.extend_from_slice(&proposal.outcome_id.to_be_bytes::<32>());
    buf.extend_from_slice(&proposal.close_time.to_be_bytes::<32>());
    buf.extend_from_slice(proposal.evidence_hash.as_slice());
    buf.extend_from_slice(&proposal.not_before.to_be_bytes::<32>());
    buf.extend_from_slice(&proposal.deadline.to_be_bytes::<32>());
    keccak256(&buf)
}

/// Final digest that gets signed
pub fn signing_digest(domain: &ProposalDomain, proposal: &Proposal) -> B256 {
    let mut buf = [0u8; 66];
    buf[0] = 0x19;
    buf[1] = 0x01;
    buf[2..34].copy_from_slice(domain_separator(domain).as_slice());
    buf[34..66].copy_from_slice(struct_hash(proposal).as_slice());

    let digest = keccak256(buf);
    tracing::debug!("Proposal signing digest: 0x{}", hex::encode(digest));
    digest
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;
    use std::str::FromStr;

    fn domain() -> ProposalDomain {
        ProposalDomain::new(
            137,
            Address::from_str("0x4bfb41d5b3570defd03c39a9a4d8de6bd8b8982e").unwrap(),
        )
    }

    fn proposal() -> Proposal {
        Proposal {
            market_id: U256::from(42u64),
            outcome_id: U256::from(1u8),
            close_time: U256::from(1_767_225_600u64),
            evidence_hash: B256::repeat_byte(0x11),
            not_before: U256::from(1_767_229_200u64),
            deadline: U256::from(1_767_232_800u64),
        }
    }

    #[test]
    fn test_digest_is_deterministic() {
        assert_eq!(signing_digest(&domain(), &proposal()), signing_digest(&domain(), &proposal()));
    }

    #[test]
    fn test_every_field_changes_the_digest() {
        let base = signing_digest(&domain(), &proposal());

        let mutations: Vec<Box<dyn Fn(&mut Proposal)>> = vec![
            Box::new(|p: &mut Proposal| p.market_id += U256::from(1u8)),
            Box::new(|p: &mut Proposal| p.outcome_id = U256::ZERO),
            Box::new(|p: &mut Proposal| p.close_time += U256::from(1u8)),
            Box::new(|p: &mut Proposal| p.evidence_hash = B256::repeat_byte(0x22)),
            Box::new(|p: &mut Proposal| p.not_before += U256::from(1u8)),
            Box::new(|p: &mut Proposal| p.deadline += U256::from(1u8)),
        ];
        for mutate in mutations {
            let mut changed = proposal();
            mutate(&mut changed);
            assert_ne!(signing_digest(&domain(), &changed), base);
        }
    }

    #[test]
    fn test_domain_binds_chain_and_contract() {
        let base = signing_digest(&domain(), &proposal());

        let other_chain = ProposalDomain::new(1, domain().verifying_contract);
        assert_ne!(signing_digest(&other_chain, &proposal()), base);

        let other_contract = ProposalDomain::new(137, Address::ZERO);
        assert_ne!(signing_digest(&other_contract, &proposal()), base);
    }
}
