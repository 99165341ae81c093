//! Oracle proposals.
//!
//! A proposal asks a named oracle (`io.tessera.coin_request`, say) to act
//! on an opaque payload. Each signer signs the canonical message
//! `name | data | own address`, so a signature cannot be lifted from one
//! signer's entry and replayed under another's.
//!
//! [`build_proposal`] produces a proposal with one signer. Further signers
//! can be added with [`Proposal::cosign`]; the wire format carries a list.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::encoding::{encode_proposal_message, EncodingError};
use super::signing::{check_signer, SigningError};
use super::types::Address;
use crate::crypto::keys::WalletKeypair;
use crate::crypto::signatures::{sign, verify, TxSignature};

/// Errors raised while building or verifying a proposal.
#[derive(Debug, Error)]
pub enum ProposalError {
    #[error("invalid oracle name {name:?}: {reason}")]
    InvalidOracleName { name: String, reason: &'static str },

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("proposal has no signatures")]
    Unsigned,

    #[error("{signer} has already signed this proposal")]
    DuplicateSigner { signer: Address },

    #[error("signature by {signer} does not verify")]
    InvalidSignature { signer: Address },
}

impl From<EncodingError> for ProposalError {
    fn from(err: EncodingError) -> Self {
        Self::Signing(SigningError::Encoding(err))
    }
}

/// One signer's endorsement of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSignature {
    pub signer: Address,
    pub signature: TxSignature,
}

/// A signed request to an oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    oracle_name: String,
    data: Vec<u8>,
    signatures: Vec<ProposalSignature>,
}

impl Proposal {
    pub fn oracle_name(&self) -> &str {
        &self.oracle_name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn signatures(&self) -> &[ProposalSignature] {
        &self.signatures
    }

    /// The canonical message a given signer signs.
    pub fn message_for(&self, signer: &Address) -> Result<Vec<u8>, EncodingError> {
        encode_proposal_message(&self.oracle_name, &self.data, signer)
    }

    /// A copy of this proposal with one more signer.
    pub fn cosign(
        &self,
        signer_address: &Address,
        keypair: &WalletKeypair,
    ) -> Result<Proposal, ProposalError> {
        if self.signatures.iter().any(|s| &s.signer == signer_address) {
            return Err(ProposalError::DuplicateSigner {
                signer: signer_address.clone(),
            });
        }
        check_signer(signer_address, keypair)?;

        let message = self.message_for(signer_address)?;
        let signature = sign(keypair, &message).map_err(SigningError::from)?;

        let mut signatures = self.signatures.clone();
        signatures.push(ProposalSignature {
            signer: signer_address.clone(),
            signature,
        });
        debug!(
            oracle = %self.oracle_name,
            signer = %signer_address,
            signers = signatures.len(),
            "added proposal signature"
        );

        Ok(Proposal {
            oracle_name: self.oracle_name.clone(),
            data: self.data.clone(),
            signatures,
        })
    }
}

/// Checks that `name` is a dotted identifier with at least two segments.
///
/// Each segment matches `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_oracle_name(name: &str) -> Result<(), ProposalError> {
    let invalid = |reason| ProposalError::InvalidOracleName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }

    let segments: Vec<&str> = name.split('.').collect();
    if segments.len() < 2 {
        return Err(invalid("expected at least two dot-separated segments"));
    }

    for segment in segments {
        let mut chars = segment.chars();
        match chars.next() {
            None => return Err(invalid("empty segment")),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            Some(_) => return Err(invalid("segment must start with a letter or underscore")),
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid("segment contains a character outside [A-Za-z0-9_]"));
        }
    }
    Ok(())
}

/// Builds and signs a single-signer proposal.
///
/// # Example
///
/// ```rust
/// use tessera_protocol::crypto::WalletKeypair;
/// use tessera_protocol::transaction::{build_proposal, verify_proposal};
///
/// let kp = WalletKeypair::generate();
/// let p = build_proposal("io.tessera.coin_request", b"100", &kp.address(), &kp).unwrap();
/// assert_eq!(p.signatures().len(), 1);
/// verify_proposal(&p).unwrap();
/// ```
pub fn build_proposal(
    oracle_name: &str,
    payload: &[u8],
    signer_address: &Address,
    keypair: &WalletKeypair,
) -> Result<Proposal, ProposalError> {
    validate_oracle_name(oracle_name)?;

    let unsigned = Proposal {
        oracle_name: oracle_name.to_string(),
        data: payload.to_vec(),
        signatures: Vec::new(),
    };
    let proposal = unsigned.cosign(signer_address, keypair)?;

    info!(oracle = %oracle_name, signer = %signer_address, "built proposal");
    Ok(proposal)
}

/// Verifies every signer entry of a proposal.
pub fn verify_proposal(proposal: &Proposal) -> Result<(), ProposalError> {
    validate_oracle_name(&proposal.oracle_name)?;
    if proposal.signatures.is_empty() {
        return Err(ProposalError::Unsigned);
    }

    for entry in &proposal.signatures {
        let message = proposal.message_for(&entry.signer)?;
        verify(&entry.signer, &message, &entry.signature).map_err(|_| {
            ProposalError::InvalidSignature {
                signer: entry.signer.clone(),
            }
        })?;
    }
    Ok(())
}
