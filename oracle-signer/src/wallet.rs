//! Oracle signing key - loading, signing and signature recovery

use alloy::primitives::{Address, B256, Signature, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use std::str::FromStr;
use tracing::info;

use crate::types::{ProposalSignature, Result, SignerError};

/// Environment variable holding the oracle's private key
pub const PRIVATE_KEY_ENV: &str = "ORACLE_PRIVATE_KEY";

/// Key that signs outcome proposals
#[derive(Clone)]
pub struct OracleWallet {
    signer: PrivateKeySigner,
    address: Address,
}

impl OracleWallet {
    /// Create a new wallet from a private key hex string
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let key = private_key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);

        let key_bytes = B256::from_str(key)
            .map_err(|e| SignerError::Wallet(format!("Invalid private key format: {}", e)))?;

        let signer = PrivateKeySigner::from_bytes(&key_bytes)
            .map_err(|e| SignerError::Wallet(format!("Failed to create signer: {}", e)))?;

        let address = signer.address();

        info!("Loaded oracle signing key: {}", address);

        Ok(Self { signer, address })
    }

    /// Load wallet from environment variable ORACLE_PRIVATE_KEY
    pub fn from_env() -> Result<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV).map_err(|_| {
            SignerError::MissingCredentials(format!("{PRIVATE_KEY_ENV} environment variable not set"))
        })?;

        Self::from_private_key(&private_key)
    }

    /// Generate a new random wallet
    pub fn generate() -> Self {
        let signer = PrivateKeySigner::random();
        let address = signer.address();

        info!("Generated new oracle signing key: {}", address);

        Self { signer, address }
    }

    /// Get the wallet address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the wallet address as a checksummed string
    pub fn address_string(&self) -> String {
        self.address.to_checksum(None)
    }

    /// Sign a 32-byte digest, producing r || s || v with v in {27, 28}
    pub async fn sign_digest(&self, digest: B256) -> Result<ProposalSignature> {
        let signature = self
            .signer
            .sign_hash(&digest)
            .await
            .map_err(|e| SignerError::Signing(format!("Failed to sign digest: {}", e)))?;

        Ok(ProposalSignature::from_parts(
            signature.r(),
            signature.s(),
            signature.v() as u8,
        ))
    }
}

impl std::fmt::Debug for OracleWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleWallet")
            .field("address", &self.address)
            .finish()
    }
}

/// Recover the address that signed `digest`.
///
/// Accepts v as 0/1 or 27/28. Anything other than exactly 65 bytes is
/// rejected before any recovery is attempted.
pub fn recover_signer(digest: B256, signature: &[u8]) -> Result<Address> {
    let parsed = ProposalSignature::from_slice(signature)?;
    let bytes = parsed.as_bytes();

    let parity = match bytes[64] {
        0 | 27 => false,
        1 | 28 => true,
        other => return Err(SignerError::InvalidRecoveryId(other)),
    };
    let r = U256::from_be_slice(&bytes[..32]);
    let s = U256::from_be_slice(&bytes[32..64]);

    Signature::new(r, s, parity)
        .recover_address_from_prehash(&digest)
        .map_err(|e| SignerError::Recovery(e.to_string()))
}

/// True when `signature` over `digest` recovers to `expected`
pub fn verify_signature(digest: B256, signature: &[u8], expected: Address) -> Result<bool> {
    Ok(recover_signer(digest, signature)? == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::keccak256;

    // Known test private key (DO NOT use in production!)
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_generation() {
        let wallet = OracleWallet::generate();
        assert!(wallet.address_string().starts_with("0x"));
        assert_ne!(wallet.address(), OracleWallet::generate().address());
    }

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = OracleWallet::from_private_key(TEST_KEY).unwrap();

        assert_eq!(
            wallet.address_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_invalid_private_key() {
        assert!(matches!(
            OracleWallet::from_private_key("0x1234"),
            Err(SignerError::Wallet(_))
        ));
        assert!(OracleWallet::from_private_key("not hex at all").is_err());
    }

    #[tokio::test]
    async fn test_sign_and_recover() {
        let wallet = OracleWallet::from_private_key(TEST_KEY).unwrap();
        let digest = keccak256(b"proposal digest");

        let signature = wallet.sign_digest(digest).await.unwrap();
        assert!(signature.v() == 27 || signature.v() == 28);

        let recovered = recover_signer(digest, signature.as_bytes()).unwrap();
        assert_eq!(recovered, wallet.address());
        assert!(verify_signature(digest, signature.as_bytes(), wallet.address()).unwrap());
        assert!(!verify_signature(keccak256(b"other"), signature.as_bytes(), wallet.address()).unwrap_or(false));
    }

    #[tokio::test]
    async fn test_recovery_accepts_raw_parity() {
        let wallet = OracleWallet::from_private_key(TEST_KEY).unwrap();
        let digest = keccak256(b"raw parity");

        let mut bytes = *wallet.sign_digest(digest).await.unwrap().as_bytes();
        bytes[64] -= 27;

        assert_eq!(recover_signer(digest, &bytes).unwrap(), wallet.address());
    }

    #[test]
    fn test_short_signature_rejected() {
        let digest = keccak256(b"short");
        assert!(matches!(
            recover_signer(digest, &[0u8; 64]),
            Err(SignerError::SignatureLength(64))
        ));
        assert!(matches!(
            recover_signer(digest, &[]),
            Err(SignerError::SignatureLength(0))
        ));
    }

    #[tokio::test]
    async fn test_long_signature_rejected() {
        let wallet = OracleWallet::from_private_key(TEST_KEY).unwrap();
        let digest = keccak256(b"long");

        let mut bytes = wallet.sign_digest(digest).await.unwrap().as_bytes().to_vec();
        bytes.push(0);

        assert!(matches!(
            recover_signer(digest, &bytes),
            Err(SignerError::InvalidSignature(_))
        ));
        assert!(verify_signature(digest, &bytes, wallet.address()).is_err());
    }

    #[test]
    fn test_invalid_recovery_id_rejected() {
        let mut bytes = [1u8; 65];
        bytes[64] = 29;
        assert!(matches!(
            recover_signer(keccak256(b"v"), &bytes),
            Err(SignerError::InvalidRecoveryId(29))
        ));
    }
}
