use alloy_primitives::{Address, TxHash, U64};
use alloy_rpc_types::{BlockNumberOrTag, TransactionRequest};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::ConnectionError;

/// The subset of the EIP-1193 request surface used by the client.
#[derive(Clone, Debug, PartialEq)]
pub enum WalletRequest {
    /// `eth_requestAccounts`: asks the user to authorize account access.
    RequestAccounts,
    /// `eth_accounts`: the currently authorized accounts, without prompting.
    Accounts,
    /// `eth_chainId`
    ChainId,
    /// `wallet_switchEthereumChain`
    SwitchChain { chain_id: u64 },
    /// `eth_call`
    Call { tx: TransactionRequest, block: BlockNumberOrTag },
    /// `eth_sendTransaction`: the wallet signs and broadcasts in one step.
    SendTransaction(TransactionRequest),
    /// `eth_getTransactionReceipt`
    TransactionReceipt(TxHash),
}

impl WalletRequest {
    /// The JSON-RPC method name.
    pub fn method(&self) -> &'static str {
        match self {
            Self::RequestAccounts => "eth_requestAccounts",
            Self::Accounts => "eth_accounts",
            Self::ChainId => "eth_chainId",
            Self::SwitchChain { .. } => "wallet_switchEthereumChain",
            Self::Call { .. } => "eth_call",
            Self::SendTransaction(_) => "eth_sendTransaction",
            Self::TransactionReceipt(_) => "eth_getTransactionReceipt",
        }
    }

    /// The positional JSON-RPC params.
    pub fn params(&self) -> Value {
        match self {
            Self::RequestAccounts | Self::Accounts | Self::ChainId => json!([]),
            Self::SwitchChain { chain_id } => json!([{ "chainId": format!("{chain_id:#x}") }]),
            Self::Call { tx, block } => json!([tx, block]),
            Self::SendTransaction(tx) => json!([tx]),
            Self::TransactionReceipt(hash) => json!([hash]),
        }
    }
}

/// Decodes the response to `request`.
pub(crate) fn decode<T: DeserializeOwned>(
    request: &WalletRequest,
    value: Value,
) -> Result<T, ConnectionError> {
    serde_json::from_value(value).map_err(|err| ConnectionError::InvalidResponse {
        method: request.method(),
        reason: err.to_string(),
    })
}

/// Decodes an account list.
pub fn accounts(value: Value) -> Result<Vec<Address>, serde_json::Error> {
    serde_json::from_value(value)
}

/// Decodes a hex chain id.
pub fn chain_id(value: Value) -> Result<u64, serde_json::Error> {
    serde_json::from_value::<U64>(value).map(|id| id.to::<u64>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    #[test]
    fn switch_chain_params_are_hex() {
        let req = WalletRequest::SwitchChain { chain_id: 31337 };
        assert_eq!(req.method(), "wallet_switchEthereumChain");
        assert_eq!(req.params(), json!([{ "chainId": "0x7a69" }]));
    }

    #[test]
    fn receipt_params() {
        let hash = b256!("0x0101010101010101010101010101010101010101010101010101010101010101");
        let req = WalletRequest::TransactionReceipt(hash);
        assert_eq!(req.params(), json!([format!("{hash:#x}")]));
    }

    #[test]
    fn call_params_carry_block_tag() {
        let to = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
        let req = WalletRequest::Call {
            tx: TransactionRequest::default().to(to),
            block: BlockNumberOrTag::Latest,
        };
        let params = req.params();
        assert_eq!(params[1], "latest");
        assert_eq!(params[0]["to"].as_str().unwrap().to_lowercase(), format!("{to:#x}"));
    }

    #[test]
    fn decodes_accounts_and_chain_id() {
        let accs = accounts(json!(["0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"])).unwrap();
        assert_eq!(accs, [address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")]);
        assert_eq!(chain_id(json!("0x7a69")).unwrap(), 31337);
        assert!(chain_id(json!("garbage")).is_err());
    }
}
