use alloy_primitives::Bytes;
use alloy_transport::TransportError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An EIP-1193 provider error.
///
/// See <https://eips.ethereum.org/EIPS/eip-1193#provider-errors> for the code registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// The user rejected the request.
    pub const USER_REJECTED: i64 = 4001;
    /// The requested method and/or account has not been authorized by the user.
    pub const UNAUTHORIZED: i64 = 4100;
    /// The provider does not support the requested method.
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    /// The provider is disconnected from all chains.
    pub const DISCONNECTED: i64 = 4900;
    /// The chain has not been added to the wallet.
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    /// JSON-RPC internal error, also used by nodes for reverted calls.
    pub const INTERNAL: i64 = -32603;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn user_rejected() -> Self {
        Self::new(Self::USER_REJECTED, "User rejected the request.")
    }

    pub fn unrecognized_chain(chain_id: u64) -> Self {
        Self::new(
            Self::UNRECOGNIZED_CHAIN,
            format!("Unrecognized chain ID {chain_id:#x}. Try adding the chain first."),
        )
    }

    pub fn is_user_rejected(&self) -> bool {
        self.code == Self::USER_REJECTED
    }

    /// Converts a transport failure, keeping the JSON-RPC error payload when the node sent one.
    pub fn from_transport(err: TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) => Self {
                code: payload.code,
                message: payload.message.to_string(),
                data: payload.data.as_ref().and_then(|raw| serde_json::from_str(raw.get()).ok()),
            },
            None => Self::new(Self::DISCONNECTED, err.to_string()),
        }
    }

    /// Returns the revert data attached to the error.
    ///
    /// Nodes put it directly in `data`, wallets tend to nest it under `data.data` or
    /// `data.originalError.data`.
    pub fn revert_data(&self) -> Option<Bytes> {
        let data = self.data.as_ref()?;
        [data, &data["data"], &data["originalError"]["data"]]
            .into_iter()
            .find_map(|value| value.as_str()?.parse::<Bytes>().ok())
            .filter(|bytes| !bytes.is_empty())
    }

    /// The most specific human readable reason: the decoded revert reason if the error carries
    /// revert data, the provider's message otherwise.
    pub fn reason(&self) -> String {
        self.revert_data()
            .and_then(|data| alloy_sol_types::decode_revert_reason(&data))
            .unwrap_or_else(|| self.message.clone())
    }
}

/// Errors returned by [`WalletConnector::connect`](crate::WalletConnector::connect).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("no wallet provider detected")]
    NoWalletDetected,
    #[error("the connection request was rejected")]
    UserRejected,
    #[error("the wallet did not return any account")]
    NoAccounts,
    #[error("switching to chain {chain_id} was rejected")]
    ChainSwitchRejected { chain_id: u64 },
    #[error("failed to switch to chain {chain_id}: {reason}")]
    ChainSwitchFailed { chain_id: u64, reason: String },
    #[error("unexpected response to {method}: {reason}")]
    InvalidResponse { method: &'static str, reason: String },
    #[error(transparent)]
    Rpc(RpcError),
}

impl ConnectionError {
    /// Returns true if no wallet call can ever succeed in this environment.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NoWalletDetected)
    }

    /// Returns true if the user declined a wallet prompt.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::UserRejected | Self::ChainSwitchRejected { .. })
    }
}
