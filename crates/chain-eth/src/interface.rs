//! Contract interface descriptions.
//!
//! A [`ContractInterface`] is the immutable list of callable functions of one
//! deployed contract, as found in the `abi` array of a compiled artifact.

use serde::Deserialize;

use crate::abi::{encode_function_call, selector, AbiParam};
use crate::error::EthError;

/// Whether a function reads or mutates contract state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    Nonpayable,
    Payable,
}

impl StateMutability {
    /// Read-only functions are served by `eth_call` and need no gas.
    pub fn is_read_only(&self) -> bool {
        matches!(self, StateMutability::Pure | StateMutability::View)
    }
}

/// A single ABI input or output slot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AbiSlot {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One callable function of a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiFunction {
    pub name: String,
    pub inputs: Vec<AbiSlot>,
    pub outputs: Vec<AbiSlot>,
    pub state_mutability: StateMutability,
}

impl AbiFunction {
    /// Canonical signature, e.g. `withdraw(uint256)`.
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(|s| s.kind.as_str()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    pub fn selector(&self) -> [u8; 4] {
        selector(&self.signature())
    }
}

/// Raw artifact entry; events, errors and constructors are skipped.
#[derive(Deserialize)]
struct ArtifactEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<AbiSlot>,
    #[serde(default)]
    outputs: Vec<AbiSlot>,
    #[serde(rename = "stateMutability")]
    state_mutability: Option<StateMutability>,
}

#[derive(Deserialize)]
struct Artifact {
    abi: Vec<ArtifactEntry>,
}

/// The callable surface of a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractInterface {
    functions: Vec<AbiFunction>,
}

impl ContractInterface {
    pub fn new(functions: Vec<AbiFunction>) -> Self {
        Self { functions }
    }

    /// The ATM ("Assessment") contract: `getBalance()`, `deposit(uint256)`
    /// and `withdraw(uint256)`.
    pub fn assessment() -> Self {
        let amount = || AbiSlot {
            name: "_amount".into(),
            kind: "uint256".into(),
        };
        let balance = AbiSlot {
            name: String::new(),
            kind: "uint256".into(),
        };

        Self::new(vec![
            AbiFunction {
                name: "getBalance".into(),
                inputs: Vec::new(),
                outputs: vec![balance],
                state_mutability: StateMutability::View,
            },
            AbiFunction {
                name: "deposit".into(),
                inputs: vec![amount()],
                outputs: Vec::new(),
                state_mutability: StateMutability::Payable,
            },
            AbiFunction {
                name: "withdraw".into(),
                inputs: vec![amount()],
                outputs: Vec::new(),
                state_mutability: StateMutability::Nonpayable,
            },
        ])
    }

    /// Parses the `abi` array of a compiled contract artifact.
    ///
    /// Accepts either the full artifact object (`{"abi": [...]}`) or the bare
    /// array.
    pub fn from_artifact_json(json: &str) -> Result<Self, EthError> {
        let entries: Vec<ArtifactEntry> = match serde_json::from_str::<Artifact>(json) {
            Ok(artifact) => artifact.abi,
            Err(_) => serde_json::from_str(json)
                .map_err(|e| EthError::InvalidInterface(e.to_string()))?,
        };

        let functions = entries
            .into_iter()
            .filter(|entry| entry.kind == "function")
            .map(|entry| {
                if entry.name.is_empty() {
                    return Err(EthError::InvalidInterface("function without a name".into()));
                }
                Ok(AbiFunction {
                    name: entry.name,
                    inputs: entry.inputs,
                    outputs: entry.outputs,
                    state_mutability: entry
                        .state_mutability
                        .unwrap_or(StateMutability::Nonpayable),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(functions))
    }

    pub fn functions(&self) -> &[AbiFunction] {
        &self.functions
    }

    /// Looks up a function by name.
    pub fn function(&self, name: &str) -> Result<&AbiFunction, EthError> {
        self.functions
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| EthError::UnknownFunction(name.to_string()))
    }

    /// Encodes calldata for `name`, checking arity and parameter types
    /// against the interface.
    pub fn encode_call(&self, name: &str, params: &[AbiParam]) -> Result<Vec<u8>, EthError> {
        let function = self.function(name)?;

        if function.inputs.len() != params.len() {
            return Err(EthError::EncodingError(format!(
                "{} expects {} arguments, got {}",
                function.signature(),
                function.inputs.len(),
                params.len()
            )));
        }

        for (slot, param) in function.inputs.iter().zip(params) {
            if slot.kind != param.type_name() {
                return Err(EthError::EncodingError(format!(
                    "{}: expected {}, got {}",
                    function.signature(),
                    slot.kind,
                    param.type_name()
                )));
            }
        }

        Ok(encode_function_call(function.selector(), params))
    }
}
