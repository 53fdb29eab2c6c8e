//! JSON-RPC implementation of [`GatewayClient`]

use std::future::IntoFuture;
use std::time::Duration;

use alloy::network::{Ethereum, EthereumWallet, NetworkWallet};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use async_trait::async_trait;
use scalar_core::{Error, EvmChain, Result, TxError, UpstreamError};

use crate::abi::{IScalarGateway, IERC20};
use crate::gateway::GatewayClient;

const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Gateway client for one chain and one signing account
#[derive(Clone)]
pub struct AlloyGateway {
    chain: EvmChain,
    provider: DynProvider,
    gateway: Address,
    signer: Address,
}

impl AlloyGateway {
    /// Connect to `chain.rpc_url` and sign with `wallet`'s default signer
    pub async fn connect(chain: EvmChain, wallet: EthereumWallet) -> Result<Self> {
        let gateway: Address = chain
            .gateway_address
            .parse()
            .map_err(|e| Error::Config(format!("Invalid gateway address: {}", e)))?;
        let signer = NetworkWallet::<Ethereum>::default_signer_address(&wallet);

        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect(&chain.rpc_url)
            .await
            .map_err(|e| UpstreamError::Unreachable {
                url: chain.rpc_url.clone(),
                message: e.to_string(),
            })?
            .erased();

        let remote_chain_id = timed("eth_chainId", provider.get_chain_id()).await?;
        if remote_chain_id != chain.chain_id {
            return Err(Error::Config(format!(
                "RPC {} serves chain {}, expected {}",
                chain.rpc_url, remote_chain_id, chain.chain_id
            )));
        }

        tracing::info!(
            chain = %chain.name,
            gateway = %gateway,
            signer = %signer,
            "EVM gateway connected"
        );

        Ok(Self {
            chain,
            provider,
            gateway,
            signer,
        })
    }
}

#[async_trait]
impl GatewayClient for AlloyGateway {
    fn chain(&self) -> &EvmChain {
        &self.chain
    }

    fn gateway_address(&self) -> Address {
        self.gateway
    }

    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn token_address(&self, symbol: &str) -> Result<Address> {
        let gateway = IScalarGateway::new(self.gateway, self.provider.clone());
        let token = timed(
            "tokenAddresses",
            gateway.tokenAddresses(symbol.to_string()).call(),
        )
        .await?;

        if token == Address::ZERO {
            return Err(TxError::invalid(
                "token",
                format!("{} is not registered on {}", symbol, self.chain.name),
            )
            .into());
        }
        Ok(token)
    }

    async fn decimals(&self, token: Address) -> Result<u8> {
        let erc20 = IERC20::new(token, self.provider.clone());
        timed("decimals", erc20.decimals().call()).await
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256> {
        let erc20 = IERC20::new(token, self.provider.clone());
        timed("balanceOf", erc20.balanceOf(owner).call()).await
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        let erc20 = IERC20::new(token, self.provider.clone());
        timed("allowance", erc20.allowance(owner, spender).call()).await
    }

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxHash> {
        let erc20 = IERC20::new(token, self.provider.clone());
        let pending = timed("approve", erc20.approve(spender, amount).send()).await?;
        let tx_hash = *pending.tx_hash();
        tracing::info!(token = %token, spender = %spender, tx_hash = %tx_hash, "Approval sent");
        Ok(tx_hash)
    }

    async fn send_token(
        &self,
        destination_chain: &str,
        destination_address: &str,
        symbol: &str,
        amount: U256,
    ) -> Result<TxHash> {
        let gateway = IScalarGateway::new(self.gateway, self.provider.clone());
        let call = gateway.sendToken(
            destination_chain.to_string(),
            destination_address.to_string(),
            symbol.to_string(),
            amount,
        );
        let pending = timed("sendToken", call.send()).await?;
        Ok(*pending.tx_hash())
    }

    async fn call_contract_with_token(
        &self,
        destination_chain: &str,
        destination_contract: &str,
        payload: Bytes,
        symbol: &str,
        amount: U256,
    ) -> Result<TxHash> {
        let gateway = IScalarGateway::new(self.gateway, self.provider.clone());
        let call = gateway.callContractWithToken(
            destination_chain.to_string(),
            destination_contract.to_string(),
            payload,
            symbol.to_string(),
            amount,
        );
        let pending = timed("callContractWithToken", call.send()).await?;
        Ok(*pending.tx_hash())
    }

    async fn receipt_status(&self, tx_hash: TxHash) -> Result<Option<bool>> {
        let receipt = timed(
            "eth_getTransactionReceipt",
            self.provider.get_transaction_receipt(tx_hash),
        )
        .await?;
        Ok(receipt.map(|r| r.status()))
    }
}

/// Bound an RPC call by [`RPC_TIMEOUT`] and map its error to [`UpstreamError::Rpc`]
async fn timed<T, E, F>(method: &str, fut: F) -> Result<T>
where
    F: IntoFuture<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(RPC_TIMEOUT, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(UpstreamError::Rpc(format!("{}: {}", method, e)).into()),
        Err(_) => Err(Error::Timeout {
            operation: method.to_string(),
            after_ms: RPC_TIMEOUT.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::local::PrivateKeySigner;

    #[tokio::test]
    async fn test_rejects_bad_gateway_address() {
        let chain = EvmChain {
            chain_id: 11155111,
            name: "evm|11155111".into(),
            rpc_url: "http://127.0.0.1:9".into(),
            gateway_address: "not-an-address".into(),
            explorer_url: "https://sepolia.etherscan.io".into(),
        };
        let wallet = EthereumWallet::from(PrivateKeySigner::random());

        let err = AlloyGateway::connect(chain, wallet).await.err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_rpc_error_mapping() {
        let err = timed("eth_call", async { Err::<(), _>("execution reverted") })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Upstream error: RPC error: eth_call: execution reverted");
    }
}
