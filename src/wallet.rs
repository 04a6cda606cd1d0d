//! Wallet session: the connected account used as identity and signer.
//! Process-wide for the lifetime of the client, like the cache.

use crate::error::ClientError;
use crate::types::Address;
use std::sync::RwLock;

#[derive(Default)]
pub struct WalletSession {
    current: RwLock<Option<Address>>,
}

impl WalletSession {
    pub fn new() -> Self {
        WalletSession::default()
    }

    /// Connect an account. The zero address counts as "no account", the
    /// same way wallet libraries report a disconnected state.
    pub fn connect(&self, address: Address) {
        if address.is_zero() {
            log::warn!("[wallet] ignoring connect with zero address");
            return;
        }
        log::info!("[wallet] connected {address}");
        *self.current.write().expect("wallet lock") = Some(address);
    }

    pub fn disconnect(&self) {
        log::info!("[wallet] disconnected");
        *self.current.write().expect("wallet lock") = None;
    }

    pub fn current(&self) -> Option<Address> {
        self.current.read().expect("wallet lock").clone()
    }

    /// The connected account, or `WalletNotConnected` — checked before any
    /// network call is attempted.
    pub fn require(&self) -> Result<Address, ClientError> {
        self.current().ok_or(ClientError::WalletNotConnected)
    }
}
