pub mod controller;
pub mod election;
pub mod issuer;
pub mod ledger;
pub mod roster;
pub mod tree_cache;

pub use controller::{CastReceipt, CastRequest, CastState, VoteCastController};
pub use election::{Election, VoteRecord};
pub use issuer::ProofIssuer;
pub use ledger::{HttpLedger, Ledger, LedgerClient, MockLedger, ProofContext};
pub use roster::{RosterError, RosterRegistry};
pub use tree_cache::TreeCache;

#[cfg(test)]
mod tests;
