//! Solidity compilation through ethers-solc
//!
//! The compiler is pinned to one version. Without an explicit binary it is
//! looked up among the svm-managed installs and downloaded when missing.
//! The full compiler output is persisted for reuse, and one contract's ABI
//! and bytecode are extracted from it.

use crate::config::ContractConfig;
use crate::contract::ContractArtifact;
use crate::error::{DeployerError, DeployerResult};

use ethers::solc::artifacts::{Error as Diagnostic, Severity, Source, Sources};
use ethers::solc::{CompilerInput, Solc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub use ethers::solc::artifacts::Contract as CompiledContract;
pub use ethers::solc::CompilerOutput;

/// A `solc` binary of one known version
#[derive(Debug, Clone)]
pub struct SolcCompiler {
    solc: Solc,
    version: String,
}

impl SolcCompiler {
    /// Use the binary at `solc_path`, failing unless it reports `version`
    pub fn at_path(
        solc_path: impl Into<PathBuf>,
        version: impl Into<String>,
    ) -> DeployerResult<Self> {
        let compiler = Self {
            solc: Solc::new(solc_path),
            version: version.into(),
        };
        compiler.check_version()?;
        Ok(compiler)
    }

    /// Find `version` among svm installs, installing it when missing
    ///
    /// Blocks on the download; call from a blocking context.
    pub fn install(version: &str) -> DeployerResult<Self> {
        let solc = Solc::find_or_install_svm_version(version).map_err(|e| {
            DeployerError::Compilation(format!("failed to install solc {}: {}", version, e))
        })?;
        info!("Using solc {} at {}", version, solc.solc.display());

        Ok(Self {
            solc,
            version: version.to_string(),
        })
    }

    /// Explicit binary when configured, svm-managed otherwise
    pub fn from_config(contract: &ContractConfig) -> DeployerResult<Self> {
        match &contract.solc_path {
            Some(path) => Self::at_path(path.clone(), contract.compiler_version.clone()),
            None => Self::install(&contract.compiler_version),
        }
    }

    fn check_version(&self) -> DeployerResult<()> {
        let reported = self.solc.version().map_err(|e| {
            DeployerError::Compilation(format!(
                "failed to run {}: {}",
                self.solc.solc.display(),
                e
            ))
        })?;

        if !version_matches(&reported.to_string(), &self.version) {
            return Err(DeployerError::Compilation(format!(
                "{} is solc {}, not {}",
                self.solc.solc.display(),
                reported,
                self.version
            )));
        }

        debug!("Using solc {} at {}", self.version, self.solc.solc.display());
        Ok(())
    }

    /// Standard-JSON input for a single source unit
    pub fn standard_input(file_name: &str, source: Source) -> DeployerResult<CompilerInput> {
        let mut sources = Sources::new();
        sources.insert(PathBuf::from(file_name), source);

        let mut input = CompilerInput::with_sources(sources)
            .into_iter()
            .next()
            .ok_or_else(|| {
                DeployerError::Compilation(format!("{} is not a Solidity source", file_name))
            })?;
        // Let the compiler pick its own EVM target; old releases reject newer names
        input.settings.evm_version = None;

        Ok(input)
    }

    /// Compile one source unit
    pub fn compile(&self, file_name: &str, source: Source) -> DeployerResult<CompilerOutput> {
        let input = Self::standard_input(file_name, source)?;

        let output = self
            .solc
            .compile(&input)
            .map_err(|e| DeployerError::Compilation(e.to_string()))?;
        check_diagnostics(&output)?;

        info!(
            "Compiled {} with solc {} ({} contracts)",
            file_name,
            self.version,
            output.contracts.get(file_name).map_or(0, |c| c.len())
        );
        Ok(output)
    }

    /// Read `source_path` and compile it under `file_name`
    pub fn compile_file(
        &self,
        source_path: &Path,
        file_name: &str,
    ) -> DeployerResult<CompilerOutput> {
        let source = Source::read(source_path)
            .map_err(|e| DeployerError::Compilation(e.to_string()))?;
        self.compile(file_name, source)
    }
}

/// Compare a reported `x.y.z+commit...` version with a plain `x.y.z`
fn version_matches(reported: &str, version: &str) -> bool {
    reported == version || reported.starts_with(&format!("{}+", version))
}

fn diagnostic_text(diagnostic: &Diagnostic) -> &str {
    diagnostic
        .formatted_message
        .as_deref()
        .unwrap_or(&diagnostic.message)
        .trim()
}

/// Error on any diagnostic of severity `error`; log the rest
pub fn check_diagnostics(output: &CompilerOutput) -> DeployerResult<()> {
    let (errors, others): (Vec<_>, Vec<_>) = output
        .errors
        .iter()
        .partition(|d| matches!(d.severity, Severity::Error));

    for diagnostic in others {
        warn!("solc {:?}: {}", diagnostic.severity, diagnostic_text(diagnostic));
    }

    if errors.is_empty() {
        return Ok(());
    }

    Err(DeployerError::Compilation(
        errors
            .into_iter()
            .map(diagnostic_text)
            .collect::<Vec<_>>()
            .join("\n"),
    ))
}

/// Persist the whole compiler output as a single JSON document
pub fn save_output(output: &CompilerOutput, path: &Path) -> DeployerResult<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer(file, output)?;
    debug!("Wrote compiler output to {}", path.display());
    Ok(())
}

/// Reload a document written by [`save_output`]
pub fn load_output(path: &Path) -> DeployerResult<CompilerOutput> {
    let file = std::fs::File::open(path)?;
    let output = serde_json::from_reader(std::io::BufReader::new(file))?;
    Ok(output)
}

/// ABI and deployment bytecode of `contract` in `file_name`
pub fn extract_artifact(
    output: &CompilerOutput,
    file_name: &str,
    contract: &str,
) -> DeployerResult<ContractArtifact> {
    let compiled = output
        .contracts
        .get(file_name)
        .and_then(|contracts| contracts.get(contract))
        .ok_or_else(|| {
            DeployerError::Compilation(format!("contract {} not found in {}", contract, file_name))
        })?;

    ContractArtifact::from_compiled(contract, compiled)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SIMPLE_STORAGE_OUTPUT: &str = r#"{
        "contracts": {
            "SimpleStorage.sol": {
                "SimpleStorage": {
                    "abi": [
                        {"inputs": [], "name": "retrieve", "outputs": [{"internalType": "uint256", "name": "", "type": "uint256"}], "stateMutability": "view", "type": "function"},
                        {"inputs": [{"internalType": "uint256", "name": "_favoriteNumber", "type": "uint256"}], "name": "store", "outputs": [], "stateMutability": "nonpayable", "type": "function"}
                    ],
                    "evm": {
                        "bytecode": {"object": "6080604052348015600f57600080fd5b50", "sourceMap": "57:1:0:-:0", "linkReferences": {}},
                        "deployedBytecode": {"object": "6080604052", "sourceMap": ""}
                    }
                }
            }
        },
        "errors": [
            {
                "component": "general",
                "severity": "warning",
                "type": "Warning",
                "message": "SPDX license identifier not provided",
                "formattedMessage": "Warning: SPDX license identifier not provided"
            }
        ],
        "sources": {"SimpleStorage.sol": {"id": 0}}
    }"#;

    #[test]
    fn test_standard_input_shape() {
        let input =
            SolcCompiler::standard_input("SimpleStorage.sol", Source::new("contract A {}"))
                .unwrap();

        assert_eq!(input.language, "Solidity");
        assert!(input.sources.contains_key(Path::new("SimpleStorage.sol")));
        assert!(input.settings.evm_version.is_none());

        let json = serde_json::to_value(&input).unwrap();
        assert!(json["settings"].get("evmVersion").is_none());
    }

    #[test]
    fn test_version_matching() {
        assert!(version_matches("0.6.0+commit.26b70077.Linux.g++", "0.6.0"));
        assert!(version_matches("0.6.0", "0.6.0"));
        assert!(!version_matches("0.6.1+commit.e6f7d5a4", "0.6.0"));
        assert!(!version_matches("0.6.0", "0.6"));
    }

    #[test]
    fn test_warnings_pass_errors_fail() {
        let output: CompilerOutput = serde_json::from_str(SIMPLE_STORAGE_OUTPUT).unwrap();
        check_diagnostics(&output).unwrap();

        let broken: CompilerOutput = serde_json::from_str(
            r#"{"errors": [{
                "component": "general",
                "severity": "error",
                "type": "ParserError",
                "message": "Expected ';'",
                "formattedMessage": "ParserError: Expected ';'"
            }]}"#,
        )
        .unwrap();
        let err = check_diagnostics(&broken).unwrap_err();
        assert!(err.to_string().contains("ParserError"));
        assert_eq!(err.stage(), "compile");
    }

    #[test]
    fn test_save_load_and_extract() {
        let output: CompilerOutput = serde_json::from_str(SIMPLE_STORAGE_OUTPUT).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compiled_code.json");

        save_output(&output, &path).unwrap();
        let reloaded = load_output(&path).unwrap();

        // Fields beyond ABI and bytecode survive the round trip
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let contract = &saved["contracts"]["SimpleStorage.sol"]["SimpleStorage"];
        assert_eq!(contract["evm"]["bytecode"]["sourceMap"], "57:1:0:-:0");
        assert_eq!(reloaded.errors.len(), 1);

        let artifact = extract_artifact(&reloaded, "SimpleStorage.sol", "SimpleStorage").unwrap();
        assert_eq!(artifact.name, "SimpleStorage");
        assert_eq!(artifact.bytecode.as_ref()[0], 0x60);
        assert!(artifact.abi.function("store").is_ok());

        let err = extract_artifact(&reloaded, "SimpleStorage.sol", "Other").unwrap_err();
        assert!(err.to_string().contains("Other"));
    }

    #[test]
    fn test_missing_binary() {
        let err = SolcCompiler::at_path("/nonexistent/solc-0.6.0", "0.6.0").unwrap_err();
        assert!(matches!(err, DeployerError::Compilation(_)));
    }
}
