//! Gateway flows: token transfer and redeem back to Bitcoin

use std::sync::Arc;

use alloy::sol_types::SolCall;
use btc_tx::{parse_address, RedeemPayloadParams};
use evm_gateway::abi::IScalarGateway;
use evm_gateway::{Address, Bytes, GatewayClient, TxHash, U256};
use scalar_core::{parse_units, Result, TxError, TxId, WalletError};
use tracing::Instrument;

use crate::form::{check_balance, RedeemForm, TransferForm};
use crate::orchestrator::{Confirmation, Orchestrator};
use crate::state::{FlowKind, PendingTransaction, Submission, SubmissionReport, SubmissionState};

impl Orchestrator {
    /// Send tokens to another chain through the gateway's `sendToken`
    pub async fn transfer_evm(&self, form: &TransferForm) -> SubmissionReport {
        let mut sub = Submission::start(FlowKind::Transfer);
        let span = tracing::info_span!("submission", id = %sub.id, flow = "transfer");

        let outcome = self
            .run_transfer(&mut sub, form)
            .instrument(span.clone())
            .await;
        span.in_scope(|| self.finish(sub, outcome))
    }

    /// Burn protocol tokens and release BTC to `form.destination_address`
    pub async fn redeem_evm(&self, form: &RedeemForm) -> SubmissionReport {
        let mut sub = Submission::start(FlowKind::Redeem);
        let span = tracing::info_span!("submission", id = %sub.id, flow = "redeem");

        let outcome = self
            .run_redeem(&mut sub, form)
            .instrument(span.clone())
            .await;
        span.in_scope(|| self.finish(sub, outcome))
    }

    async fn run_transfer(&self, sub: &mut Submission, form: &TransferForm) -> Result<Confirmation> {
        sub.advance(SubmissionState::Validating);
        form.validate()?;

        sub.advance(SubmissionState::BuildingUnsigned);
        let gateway = self.gateway_for(&form.sender, form.source_chain_id).await?;
        let token = gateway.token_address(&form.symbol).await?;
        let amount = token_amount(gateway.as_ref(), token, &form.amount).await?;
        let call = IScalarGateway::sendTokenCall {
            destinationChain: form.destination_chain.clone(),
            destinationAddress: form.destination_address.clone(),
            symbol: form.symbol.clone(),
            amount: U256::from(amount),
        };
        sub.record_built(PendingTransaction::built(
            hex::encode(call.abi_encode()),
            Vec::new(),
        ));

        self.ensure_allowance(gateway.as_ref(), token, U256::from(amount))
            .await?;

        sub.advance(SubmissionState::AwaitingSignature);
        let tx_hash = gateway
            .send_token(
                &form.destination_chain,
                &form.destination_address,
                &form.symbol,
                U256::from(amount),
            )
            .await?;

        self.confirm(sub, gateway.as_ref(), tx_hash).await
    }

    async fn run_redeem(&self, sub: &mut Submission, form: &RedeemForm) -> Result<Confirmation> {
        sub.advance(SubmissionState::Validating);
        let deployment = form.validate()?;
        let network = self.session.network().await;
        parse_address(&form.destination_address, network.network)
            .map_err(|e| TxError::invalid("destination_address", e.to_string()))?;

        sub.advance(SubmissionState::BuildingUnsigned);
        let gateway = self.gateway_for(&form.sender, form.source_chain_id).await?;
        // The protocol token is registered per chain; the asset symbol is the fallback
        let symbol = form
            .protocol
            .chain(&gateway.chain().name)
            .map(|c| c.symbol.clone())
            .unwrap_or_else(|| form.protocol.asset.symbol.clone());
        let token = gateway.token_address(&symbol).await?;
        let amount = token_amount(gateway.as_ref(), token, &form.amount).await?;

        let locking_script = self
            .vault
            .locking_script(&form.destination_address, network.network)?;
        let payload = self.vault.encode_redeem_payload(&RedeemPayloadParams {
            locking_script,
            amount,
            custodian_group_uid: form.protocol.custodian_group.uid.clone(),
        })?;
        let payload = Bytes::from(payload);

        let call = IScalarGateway::callContractWithTokenCall {
            destinationChain: form.destination_chain.clone(),
            contractAddress: deployment.address.clone(),
            payload: payload.clone(),
            symbol: symbol.clone(),
            amount: U256::from(amount),
        };
        sub.record_built(PendingTransaction::built(
            hex::encode(call.abi_encode()),
            Vec::new(),
        ));

        self.ensure_allowance(gateway.as_ref(), token, U256::from(amount))
            .await?;

        sub.advance(SubmissionState::AwaitingSignature);
        let tx_hash = gateway
            .call_contract_with_token(
                &form.destination_chain,
                &deployment.address,
                payload,
                &symbol,
                U256::from(amount),
            )
            .await?;

        self.confirm(sub, gateway.as_ref(), tx_hash).await
    }

    async fn gateway_for(&self, sender: &str, chain_id: u64) -> Result<Arc<dyn GatewayClient>> {
        self.session.gateway(sender, chain_id).await.ok_or_else(|| {
            tracing::debug!(sender, chain_id, "No gateway session");
            WalletError::NotConnected.into()
        })
    }

    /// Approve the gateway for `amount` when the current allowance is short
    async fn ensure_allowance(
        &self,
        gateway: &dyn GatewayClient,
        token: Address,
        amount: U256,
    ) -> Result<()> {
        let spender = gateway.gateway_address();
        let allowance = gateway
            .allowance(token, gateway.signer_address(), spender)
            .await?;
        if allowance >= amount {
            return Ok(());
        }

        tracing::info!(token = %token, %allowance, %amount, "Approving gateway");
        let approval = gateway.approve(token, spender, amount).await?;
        self.await_receipt(gateway, approval).await
    }

    /// Record the submitted call and wait for its receipt
    async fn confirm(
        &self,
        sub: &mut Submission,
        gateway: &dyn GatewayClient,
        tx_hash: TxHash,
    ) -> Result<Confirmation> {
        sub.record_signed();
        sub.advance(SubmissionState::Broadcasting);

        let tx_id = TxId::new(tx_hash.to_string());
        let explorer_url = gateway.chain().explorer_tx_url(tx_id.as_str());
        sub.record_broadcast(tx_id.clone(), explorer_url.clone());
        tracing::info!(tx_hash = %tx_hash, chain = %gateway.chain().name, "Gateway call submitted");

        sub.advance(SubmissionState::AwaitingConfirmation);
        self.await_receipt(gateway, tx_hash).await?;
        Ok(Confirmation {
            tx_id,
            explorer_url,
        })
    }
}

/// Scale `amount` by the token's decimals and check it against the signer's balance
async fn token_amount(gateway: &dyn GatewayClient, token: Address, amount: &str) -> Result<u128> {
    let decimals = gateway.decimals(token).await?;
    let units = parse_units(amount, decimals).map_err(|m| TxError::invalid("amount", m))?;
    if units == 0 {
        return Err(TxError::invalid("amount", "Amount must be greater than zero").into());
    }

    let balance = gateway.balance_of(token, gateway.signer_address()).await?;
    check_balance(units, u128::try_from(balance).unwrap_or(u128::MAX))?;
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::tests::{protocol, RECIPIENT};
    use crate::notify::NotificationKind;
    use crate::orchestrator::tests::{FakeGateway, Fixture, ADDRESS, SEND_HASH};
    use scalar_core::{BitcoinNetwork, ErrorKind};
    use std::sync::atomic::Ordering;

    async fn with_gateway(fx: &Fixture) -> Arc<FakeGateway> {
        let gateway = Arc::new(FakeGateway::new());
        fx.session.register_gateway(gateway.clone()).await;
        gateway
    }

    fn transfer_form() -> TransferForm {
        TransferForm {
            source_chain_id: 11155111,
            sender: RECIPIENT.into(),
            destination_chain: "evm|97".into(),
            destination_address: "0x4444444444444444444444444444444444444444".into(),
            symbol: "sBTC".into(),
            amount: "1.5".into(),
        }
    }

    fn redeem_form() -> RedeemForm {
        RedeemForm {
            source_chain_id: 11155111,
            sender: RECIPIENT.into(),
            protocol: protocol(),
            destination_chain: "bitcoin|4".into(),
            destination_address: ADDRESS.into(),
            amount: "0.5".into(),
        }
    }

    #[tokio::test]
    async fn test_transfer_approves_when_allowance_short() {
        let fx = Fixture::new();
        let gateway = with_gateway(&fx).await;

        let report = fx.orchestrator.transfer_evm(&transfer_form()).await;

        assert!(report.is_confirmed(), "{:?}", report.error);
        assert_eq!(
            *gateway.approvals.lock().unwrap(),
            vec![U256::from(150_000_000u64)]
        );
        let calls = gateway.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "evm|97");

        let notification = report.notification.unwrap();
        assert_eq!(notification.kind, NotificationKind::Confirmed);
        assert_eq!(
            notification.explorer_url.unwrap(),
            format!("https://sepolia.etherscan.io/tx/{}", SEND_HASH)
        );

        // Calldata recorded before signing
        let pending = report.pending.unwrap();
        assert!(pending
            .unsigned_payload
            .starts_with(&hex::encode(IScalarGateway::sendTokenCall::SELECTOR)));
    }

    #[tokio::test]
    async fn test_transfer_skips_approval_with_allowance() {
        let fx = Fixture::new();
        let gateway = with_gateway(&fx).await;
        *gateway.allowance.lock().unwrap() = U256::MAX;

        let report = fx.orchestrator.transfer_evm(&transfer_form()).await;

        assert!(report.is_confirmed());
        assert!(gateway.approvals.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_receipt_timeout_keeps_tx_hash() {
        let fx = Fixture::new();
        let gateway = with_gateway(&fx).await;
        *gateway.allowance.lock().unwrap() = U256::MAX;
        gateway.mined.store(false, Ordering::SeqCst);

        let report = fx.orchestrator.transfer_evm(&transfer_form()).await;

        assert_eq!(report.failure(), Some(ErrorKind::Timeout));
        assert_eq!(report.tx_id, Some(TxId::new(SEND_HASH.to_string())));
        let notification = report.notification.unwrap();
        assert_eq!(notification.kind, NotificationKind::Failed);
        assert!(notification.short_tx_id.is_some());
        assert!(notification.explorer_url.is_some());
    }

    #[tokio::test]
    async fn test_transfer_needs_gateway_session() {
        let fx = Fixture::new();

        let report = fx.orchestrator.transfer_evm(&transfer_form()).await;

        assert_eq!(report.failure(), Some(ErrorKind::NotConnected));
        assert!(report
            .history
            .contains(&SubmissionState::BuildingUnsigned));
    }

    #[tokio::test]
    async fn test_invalid_transfer_makes_no_gateway_calls() {
        let fx = Fixture::new();
        let gateway = with_gateway(&fx).await;
        let mut form = transfer_form();
        form.amount = "0".into();

        let report = fx.orchestrator.transfer_evm(&form).await;

        assert_eq!(report.failure(), Some(ErrorKind::InvalidInput));
        assert_eq!(
            report.history,
            vec![
                SubmissionState::Idle,
                SubmissionState::Validating,
                SubmissionState::Failed(ErrorKind::InvalidInput),
            ]
        );
        assert_eq!(gateway.rpc_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transfer_above_token_balance() {
        let fx = Fixture::new();
        let gateway = with_gateway(&fx).await;
        *gateway.balance.lock().unwrap() = U256::from(1_000u64);

        let report = fx.orchestrator.transfer_evm(&transfer_form()).await;

        assert_eq!(report.failure(), Some(ErrorKind::InsufficientFunds));
        assert!(report.notification.is_none());
        assert!(gateway.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redeem_encodes_vault_payload() {
        let fx = Fixture::new();
        let gateway = with_gateway(&fx).await;

        let report = fx.orchestrator.redeem_evm(&redeem_form()).await;
        assert!(report.is_confirmed(), "{:?}", report.error);

        let params = fx.vault.redeem.lock().unwrap().clone().unwrap();
        assert_eq!(
            params.locking_script,
            btc_tx::script_pubkey_for(ADDRESS, BitcoinNetwork::Testnet4).unwrap()
        );
        assert_eq!(params.amount, 50_000_000);
        assert_eq!(params.custodian_group_uid, "group-1");

        let calls = gateway.calls.lock().unwrap().clone();
        assert_eq!(calls[0].0, "bitcoin|4");
        assert_eq!(calls[0].1, "bc-vault");
        assert!(calls[0].2.starts_with(&params.locking_script));
    }

    #[tokio::test]
    async fn test_redeem_rejects_foreign_btc_address() {
        let fx = Fixture::new();
        let gateway = with_gateway(&fx).await;
        let mut form = redeem_form();
        form.destination_address = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4".into();

        let report = fx.orchestrator.redeem_evm(&form).await;

        assert_eq!(report.failure(), Some(ErrorKind::InvalidInput));
        assert!(gateway.calls.lock().unwrap().is_empty());
        assert_eq!(gateway.rpc_calls.load(Ordering::SeqCst), 0);
    }
}
