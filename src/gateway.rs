//! Contract call gateway: one fixed contract address behind a typed
//! read/write pair.
//!
//! Reads never throw for "entity not found" — the contract encodes absence
//! as empty/zero tuples and the decoders in `types` map those to explicit
//! absent results. Writes require a wallet session and suspend until the
//! transaction is confirmed, not merely submitted.

use crate::error::{ClientError, ContractError};
use crate::transport::{CallRequest, ChainTransport, TxRequest};
use crate::types::{Address, TxReceipt};
use crate::wallet::WalletSession;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub struct ContractGateway {
    transport: Arc<dyn ChainTransport>,
    contract: Address,
    session: Arc<WalletSession>,
    receipt_poll_ms: u64,
}

impl ContractGateway {
    pub fn new(
        transport: Arc<dyn ChainTransport>,
        contract: Address,
        session: Arc<WalletSession>,
    ) -> Self {
        ContractGateway {
            transport,
            contract,
            session,
            receipt_poll_ms: 500,
        }
    }

    pub fn with_receipt_poll_ms(mut self, ms: u64) -> Self {
        self.receipt_poll_ms = ms.max(1);
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.transport.chain_id()
    }

    /// Read-only call. Passes the connected account as caller context when
    /// one exists, because some views vary by caller.
    pub async fn read(&self, function: &'static str, args: Value) -> Result<Value, ClientError> {
        self.transport
            .call(CallRequest {
                contract: self.contract.clone(),
                function,
                args,
                caller: self.session.current(),
            })
            .await
    }

    /// State-changing call. Fails with `WalletNotConnected` before any
    /// network traffic, then submits and polls until a receipt is observed.
    /// No timeout is imposed here: the caller surfaces "pending" until the
    /// chain answers.
    ///
    /// The submit-and-confirm future runs on its own task, so a caller that
    /// is dropped (view navigated away) cannot cancel a transaction that is
    /// already on the network.
    pub async fn write(&self, function: &'static str, args: Value) -> Result<TxReceipt, ClientError> {
        let from = self.session.require()?;
        let transport = self.transport.clone();
        let req = TxRequest {
            contract: self.contract.clone(),
            function,
            args,
            from,
        };
        let poll = Duration::from_millis(self.receipt_poll_ms);

        let handle = tokio::spawn(async move {
            let hash = transport.submit(req).await?;
            log::info!("[gateway] {function} submitted as {hash}");
            loop {
                match transport.receipt(&hash).await? {
                    Some(receipt) if receipt.success => {
                        log::info!(
                            "[gateway] {function} confirmed in block {}",
                            receipt.block_number
                        );
                        return Ok(receipt);
                    }
                    Some(receipt) => {
                        // The receipt itself carries no decodable error
                        // name, so the revert is surfaced as unrecognized.
                        log::warn!("[gateway] {function} reverted on-chain ({hash})");
                        return Err(ClientError::ChainCallReverted(ContractError::Unknown(
                            format!(
                                "transaction {} reverted in block {}",
                                receipt.tx_hash, receipt.block_number
                            ),
                        )));
                    }
                    None => tokio::time::sleep(poll).await,
                }
            }
        });

        handle
            .await
            .map_err(|e| ClientError::ChainCallFailed(format!("confirmation task failed: {e}")))?
    }
}
