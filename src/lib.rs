//! Chain Deployer library
//!
//! Transaction lifecycle helpers (nonce handling, signing, broadcast, receipt
//! polling) plus the compile-and-deploy flow built on top of them.

pub mod chain;
pub mod compiler;
pub mod config;
pub mod contract;
pub mod deploy;
pub mod error;
pub mod tx;

pub use chain::{ChainProvider, ChainTransport, TransactionReceipt};
pub use deploy::{DeploymentFlow, DeploymentReport};
pub use error::{DeployerError, DeployerResult};
pub use tx::{IntentRequest, SigningCredential, TransactionSubmitter};
