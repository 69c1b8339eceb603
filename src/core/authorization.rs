//! Authorization seam between inputs/outputs and the ledger queries.
//!
//! Addresses in this system are opaque tokens: an output is locked with a
//! token and an input proves spendability by presenting an equal one. All
//! comparisons route through [`Authorizer`] so a signature scheme can take
//! this slot without touching the ledger logic that calls it.

/// Capability check deciding whether an unlock proof satisfies a lock
/// condition.
pub trait Authorizer {
    fn verify(&self, unlock_proof: &str, lock_condition: &str) -> bool;
}

/// Token-equality authorizer. Stands in for signature verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenAuthorizer;

impl Authorizer for TokenAuthorizer {
    fn verify(&self, unlock_proof: &str, lock_condition: &str) -> bool {
        unlock_proof == lock_condition
    }
}

/// Verify a proof against a condition with the default authorizer.
pub fn verify(unlock_proof: &str, lock_condition: &str) -> bool {
    TokenAuthorizer.verify(unlock_proof, lock_condition)
}
