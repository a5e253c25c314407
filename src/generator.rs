//! Candidate generation: random BIP-39 seed phrases and their derived addresses.

use crate::types::{Address, Candidate};
use anyhow::{Context, Result};
use ethers::signers::coins_bip39::{English, Mnemonic};
use ethers::signers::{MnemonicBuilder, Signer};
use ethers::utils::to_checksum;
use tracing::{debug, instrument};

/// Default BIP-44 path for the first EVM account
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

/// Produces fresh candidates from the thread-local CSPRNG.
#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    word_count: usize,
    derivation_path: String,
}

impl CandidateGenerator {
    pub fn new(word_count: usize, derivation_path: impl Into<String>) -> Self {
        Self {
            word_count,
            derivation_path: derivation_path.into(),
        }
    }

    /// Generate a new seed phrase and derive its address.
    pub fn generate(&self) -> Result<Candidate> {
        let mut rng = rand::thread_rng();
        let mnemonic = Mnemonic::<English>::new_with_count(&mut rng, self.word_count)
            .context("Failed to generate seed phrase")?;
        let seed_phrase = mnemonic.to_phrase();
        let address = self.derive_address(&seed_phrase)?;

        Ok(Candidate {
            seed_phrase,
            address,
        })
    }

    /// Deterministically derive the checksummed address for a seed phrase.
    #[instrument(skip_all)]
    pub fn derive_address(&self, seed_phrase: &str) -> Result<Address> {
        let wallet = MnemonicBuilder::<English>::default()
            .phrase(seed_phrase)
            .derivation_path(&self.derivation_path)
            .context("Invalid derivation path")?
            .build()
            .context("Failed to derive wallet from seed phrase")?;

        let address = to_checksum(&wallet.address(), None);
        debug!("Derived address {}", address);
        Ok(address)
    }
}

impl Default for CandidateGenerator {
    fn default() -> Self {
        Self::new(12, DEFAULT_DERIVATION_PATH)
    }
}
