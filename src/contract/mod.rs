//! ABI-backed contract access
//!
//! `ContractArtifact` is what the compiler hands over; `ContractBinding` is a
//! deployed instance that encodes calls and runs read-only ones.

use crate::chain::ChainTransport;
use crate::compiler::CompiledContract;
use crate::error::{DeployerError, DeployerResult};

use ethers::abi::{Abi, Token};
use ethers::types::{Address, Bytes};
use tracing::debug;

/// Compiled contract ready to deploy
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub name: String,
    pub abi: Abi,
    pub bytecode: Bytes,
}

impl ContractArtifact {
    /// Take ABI and deployment bytecode from compiler output
    pub fn from_compiled(name: &str, compiled: &CompiledContract) -> DeployerResult<Self> {
        let abi = compiled
            .abi
            .as_ref()
            .map(|abi| abi.abi.clone())
            .ok_or_else(|| DeployerError::Compilation(format!("{} has no ABI", name)))?;

        // Unlinked bytecode has no byte form
        let bytecode = compiled
            .evm
            .as_ref()
            .and_then(|evm| evm.bytecode.as_ref())
            .and_then(|bytecode| bytecode.object.as_bytes())
            .cloned()
            .ok_or_else(|| {
                DeployerError::Compilation(format!("{} has no linked bytecode", name))
            })?;
        if bytecode.is_empty() {
            return Err(DeployerError::Compilation(format!(
                "{} has no deployment bytecode (abstract contract or interface?)",
                name
            )));
        }

        Ok(Self {
            name: name.to_string(),
            abi,
            bytecode,
        })
    }

    /// Deployment payload: bytecode followed by encoded constructor arguments
    pub fn deploy_data(&self, args: &[Token]) -> DeployerResult<Bytes> {
        match self.abi.constructor() {
            Some(constructor) => constructor
                .encode_input(self.bytecode.to_vec(), args)
                .map(Bytes::from)
                .map_err(|e| DeployerError::Contract(format!("constructor arguments: {}", e))),
            None if args.is_empty() => Ok(self.bytecode.clone()),
            None => Err(DeployerError::Contract(format!(
                "{} has no constructor but {} arguments were given",
                self.name,
                args.len()
            ))),
        }
    }

    /// Bind the ABI to a deployed address
    pub fn at(&self, address: Address) -> ContractBinding {
        ContractBinding {
            address,
            abi: self.abi.clone(),
        }
    }
}

/// A deployed contract
#[derive(Debug, Clone)]
pub struct ContractBinding {
    pub address: Address,
    pub abi: Abi,
}

impl ContractBinding {
    /// ABI-encode a call to `function`
    pub fn encode_call(&self, function: &str, args: &[Token]) -> DeployerResult<Bytes> {
        let function = self
            .abi
            .function(function)
            .map_err(|e| DeployerError::Contract(e.to_string()))?;

        function
            .encode_input(args)
            .map(Bytes::from)
            .map_err(|e| DeployerError::Contract(format!("{}: {}", function.name, e)))
    }

    /// Run `function` as a read-only call and decode its outputs
    pub async fn read(
        &self,
        transport: &dyn ChainTransport,
        from: Address,
        function: &str,
        args: &[Token],
    ) -> DeployerResult<Vec<Token>> {
        let data = self.encode_call(function, args)?;
        let output = transport.call(from, self.address, data).await?;

        let decoded = self
            .abi
            .function(function)
            .and_then(|f| f.decode_output(output.as_ref()))
            .map_err(|e| DeployerError::Contract(format!("{} output: {}", function, e)))?;

        debug!("{:?}.{}() -> {:?}", self.address, function, decoded);
        Ok(decoded)
    }
}
