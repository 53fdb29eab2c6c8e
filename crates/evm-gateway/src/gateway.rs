//! Gateway capability trait

use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use scalar_core::{EvmChain, Result, TxError};

/// How often [`wait_for_receipt`] asks for the receipt
pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Calls against one chain's gateway, signed by one account
#[async_trait]
pub trait GatewayClient: Send + Sync {
    fn chain(&self) -> &EvmChain;

    fn gateway_address(&self) -> Address;

    /// Account that signs and pays for transactions
    fn signer_address(&self) -> Address;

    /// ERC-20 contract registered on the gateway for `symbol`
    async fn token_address(&self, symbol: &str) -> Result<Address>;

    async fn decimals(&self, token: Address) -> Result<u8>;

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256>;

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256>;

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxHash>;

    async fn send_token(
        &self,
        destination_chain: &str,
        destination_address: &str,
        symbol: &str,
        amount: U256,
    ) -> Result<TxHash>;

    async fn call_contract_with_token(
        &self,
        destination_chain: &str,
        destination_contract: &str,
        payload: Bytes,
        symbol: &str,
        amount: U256,
    ) -> Result<TxHash>;

    /// `Some(success)` once mined, `None` while pending
    async fn receipt_status(&self, tx_hash: TxHash) -> Result<Option<bool>>;
}

/// Wait until `tx_hash` is mined. Reverted transactions fail with [`TxError::Reverted`].
///
/// Never gives up on its own; callers race it against a timeout. RPC errors while
/// polling are logged and retried.
pub async fn wait_for_receipt<G>(gateway: &G, tx_hash: TxHash, interval: Duration) -> Result<()>
where
    G: GatewayClient + ?Sized,
{
    loop {
        match gateway.receipt_status(tx_hash).await {
            Ok(Some(true)) => return Ok(()),
            Ok(Some(false)) => {
                return Err(TxError::Reverted {
                    tx_hash: tx_hash.to_string(),
                }
                .into())
            }
            Ok(None) => tracing::debug!(tx_hash = %tx_hash, "Transaction pending"),
            Err(e) => tracing::debug!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed"),
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalar_core::{ErrorKind, UpstreamError};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Receipt appears on the `mined_after`-th lookup
    struct Receipts {
        chain: EvmChain,
        lookups: AtomicU32,
        mined_after: u32,
        success: bool,
    }

    impl Receipts {
        fn new(mined_after: u32, success: bool) -> Self {
            Self {
                chain: EvmChain {
                    chain_id: 11155111,
                    name: "evm|11155111".into(),
                    rpc_url: "http://127.0.0.1:8545".into(),
                    gateway_address: Address::ZERO.to_string(),
                    explorer_url: "https://sepolia.etherscan.io".into(),
                },
                lookups: AtomicU32::new(0),
                mined_after,
                success,
            }
        }
    }

    #[async_trait]
    impl GatewayClient for Receipts {
        fn chain(&self) -> &EvmChain {
            &self.chain
        }

        fn gateway_address(&self) -> Address {
            Address::ZERO
        }

        fn signer_address(&self) -> Address {
            Address::ZERO
        }

        async fn token_address(&self, _symbol: &str) -> Result<Address> {
            unimplemented!()
        }

        async fn decimals(&self, _token: Address) -> Result<u8> {
            unimplemented!()
        }

        async fn balance_of(&self, _token: Address, _owner: Address) -> Result<U256> {
            unimplemented!()
        }

        async fn allowance(&self, _t: Address, _o: Address, _s: Address) -> Result<U256> {
            unimplemented!()
        }

        async fn approve(&self, _t: Address, _s: Address, _a: U256) -> Result<TxHash> {
            unimplemented!()
        }

        async fn send_token(&self, _c: &str, _d: &str, _s: &str, _a: U256) -> Result<TxHash> {
            unimplemented!()
        }

        async fn call_contract_with_token(
            &self,
            _c: &str,
            _d: &str,
            _p: Bytes,
            _s: &str,
            _a: U256,
        ) -> Result<TxHash> {
            unimplemented!()
        }

        async fn receipt_status(&self, _tx_hash: TxHash) -> Result<Option<bool>> {
            let n = self.lookups.fetch_add(1, Ordering::SeqCst) + 1;
            if n == 1 {
                return Err(UpstreamError::Rpc("connection reset".into()).into());
            }
            Ok((n >= self.mined_after).then_some(self.success))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_through_pending_and_errors() {
        let gateway = Receipts::new(4, true);
        wait_for_receipt(&gateway, TxHash::ZERO, RECEIPT_POLL_INTERVAL)
            .await
            .unwrap();
        assert_eq!(gateway.lookups.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverted() {
        let gateway = Receipts::new(2, false);
        let err = wait_for_receipt(&gateway, TxHash::ZERO, RECEIPT_POLL_INTERVAL)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamError);
    }
}
