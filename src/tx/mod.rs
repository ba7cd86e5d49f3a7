//! Transaction lifecycle: nonce management, intents, signing and confirmation

mod confirmation;
mod intent;
mod nonce;
mod sender;
mod signer;

pub use confirmation::wait_for_receipt;
pub use intent::{IntentRequest, TransactionIntent};
pub use nonce::NonceManager;
pub use sender::TransactionSubmitter;
pub use signer::{sign, SignedTransaction, SigningCredential};
