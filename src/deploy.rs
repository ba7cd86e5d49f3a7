//! Deployment flow: compile, deploy, read, store, read
//!
//! One flow serves every configured network; only the settings differ.

use crate::chain::{ChainTransport, TransactionReceipt};
use crate::compiler::{self, SolcCompiler};
use crate::config::{ContractConfig, Settings};
use crate::contract::{ContractArtifact, ContractBinding};
use crate::error::{DeployerError, DeployerResult};
use crate::tx::{IntentRequest, SigningCredential, TransactionSubmitter};

use ethers::abi::Token;
use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::info;

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct DeploymentReport {
    pub contract_address: Address,
    pub deploy_receipt: TransactionReceipt,
    pub store_receipt: TransactionReceipt,
    pub initial_value: U256,
    pub stored_value: U256,
}

/// Drives one deploy-and-store sequence against one network
pub struct DeploymentFlow {
    submitter: TransactionSubmitter,
    credential: SigningCredential,
    contract: ContractConfig,
}

impl DeploymentFlow {
    /// Create a new flow from settings and an already connected transport
    pub fn new(
        settings: &Settings,
        transport: Arc<dyn ChainTransport>,
        credential: SigningCredential,
    ) -> DeployerResult<Self> {
        let network = settings
            .network()
            .map_err(|e| DeployerError::Config(e.to_string()))?;

        Ok(Self {
            submitter: TransactionSubmitter::new(
                transport,
                network,
                settings.confirmation.clone(),
            ),
            credential,
            contract: settings.contract.clone(),
        })
    }

    /// Compile the source, or reload the persisted output when compiling is off
    pub fn artifact(&self) -> DeployerResult<ContractArtifact> {
        load_artifact(&self.contract)
    }

    /// Fail if the endpoint serves a different chain than configured
    pub async fn verify_chain(&self) -> DeployerResult<()> {
        let reported = self.submitter.transport().chain_id().await?;
        if reported != self.submitter.chain_id() {
            return Err(DeployerError::Config(format!(
                "endpoint serves chain {} but chain {} is configured",
                reported,
                self.submitter.chain_id()
            )));
        }
        Ok(())
    }

    /// Deploy `artifact` and return the confirmed receipt
    pub async fn deploy(
        &mut self,
        artifact: &ContractArtifact,
    ) -> DeployerResult<TransactionReceipt> {
        info!("Deploying {}", artifact.name);
        let request = IntentRequest::deployment(artifact.deploy_data(&[])?)
            .chain_id(self.submitter.chain_id())
            .sender(self.submitter.sender());

        self.submitter.execute(request, &self.credential).await
    }

    /// Read the stored number through `retrieve()`
    pub async fn retrieve(&self, binding: &ContractBinding) -> DeployerResult<U256> {
        let transport = self.submitter.transport();
        let values = binding
            .read(transport.as_ref(), self.submitter.sender(), "retrieve", &[])
            .await?;

        match values.as_slice() {
            [Token::Uint(value)] => Ok(*value),
            other => Err(DeployerError::Contract(format!(
                "retrieve() returned {:?}",
                other
            ))),
        }
    }

    /// Submit `store(value)` and return the confirmed receipt
    pub async fn store(
        &mut self,
        binding: &ContractBinding,
        value: U256,
    ) -> DeployerResult<TransactionReceipt> {
        info!("Updating contract: store({})", value);
        let data = binding.encode_call("store", &[Token::Uint(value)])?;
        let request = IntentRequest::call(binding.address, data)
            .chain_id(self.submitter.chain_id())
            .sender(self.submitter.sender());

        self.submitter.execute(request, &self.credential).await
    }

    /// Run the whole sequence with an already obtained artifact
    pub async fn run_with(
        &mut self,
        artifact: &ContractArtifact,
    ) -> DeployerResult<DeploymentReport> {
        self.verify_chain().await?;

        let deploy_receipt = self.deploy(artifact).await?;
        let contract_address = deploy_receipt.contract_address.ok_or_else(|| {
            DeployerError::Contract(format!(
                "receipt {:?} carries no contract address",
                deploy_receipt.transaction_hash
            ))
        })?;
        info!("{} deployed at {:?}", artifact.name, contract_address);

        let binding = artifact.at(contract_address);
        let initial_value = self.retrieve(&binding).await?;
        info!("Initial value: {}", initial_value);

        let store_receipt = self
            .store(&binding, U256::from(self.contract.stored_value))
            .await?;
        let stored_value = self.retrieve(&binding).await?;
        info!("Updated value: {}", stored_value);

        Ok(DeploymentReport {
            contract_address,
            deploy_receipt,
            store_receipt,
            initial_value,
            stored_value,
        })
    }

    /// Compile (or reload) and run the whole sequence
    pub async fn run(&mut self) -> DeployerResult<DeploymentReport> {
        // Compiler installation and compilation block
        let contract = self.contract.clone();
        let artifact = tokio::task::spawn_blocking(move || load_artifact(&contract))
            .await
            .map_err(|e| DeployerError::Compilation(format!("compiler task failed: {}", e)))??;

        self.run_with(&artifact).await
    }
}

fn load_artifact(contract: &ContractConfig) -> DeployerResult<ContractArtifact> {
    let output = if contract.compile {
        let solc = SolcCompiler::from_config(contract)?;
        let output = solc.compile_file(&contract.source_path, &contract.file_name)?;
        compiler::save_output(&output, &contract.artifact_path)?;
        output
    } else {
        info!(
            "Loading compiler output from {}",
            contract.artifact_path.display()
        );
        compiler::load_output(&contract.artifact_path)?
    };

    compiler::extract_artifact(&output, &contract.file_name, &contract.contract_name)
}
