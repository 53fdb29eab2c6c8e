//! BTC -> EVM bridge through the custodian vault

use btc_tx::{
    extract_signed_tx_hex, prepare_custodian_pubkeys, require_utxos, signing_inputs,
    staking_target, SignPsbtOptions, StakingParams,
};
use scalar_core::{Result, TxError, TxId};
use tracing::Instrument;

use crate::form::{check_balance, BridgeForm};
use crate::orchestrator::{Confirmation, Orchestrator};
use crate::state::{FlowKind, PendingTransaction, Submission, SubmissionReport, SubmissionState};

impl Orchestrator {
    /// Stake BTC into the protocol vault for minting on the destination chain.
    ///
    /// The report is `Confirmed` as soon as the explorer accepts the transaction.
    pub async fn bridge_btc(&self, form: &BridgeForm) -> SubmissionReport {
        let mut sub = Submission::start(FlowKind::Bridge);
        let span = tracing::info_span!("submission", id = %sub.id, flow = "bridge");

        let outcome = self
            .run_bridge(&mut sub, form)
            .instrument(span.clone())
            .await;
        span.in_scope(|| self.finish(sub, outcome))
    }

    async fn run_bridge(&self, sub: &mut Submission, form: &BridgeForm) -> Result<Confirmation> {
        sub.advance(SubmissionState::Validating);
        let valid = form.validate()?;
        let (wallet, info) = self.session.connected_wallet().await?;
        check_balance(valid.amount as u128, info.balance_sats as u128)?;

        sub.advance(SubmissionState::BuildingUnsigned);
        let network = self.session.network().await;
        let mempool = self.session.mempool().await?;

        let fee_rate = match form.fee_rate {
            Some(rate) => rate,
            None => mempool.fee_rates().await.fastest,
        };
        let utxos = mempool.utxos(&info.address).await?;
        let selection = require_utxos(&utxos, staking_target(valid.amount, fee_rate))?;

        let group = &form.protocol.custodian_group;
        let custodians = prepare_custodian_pubkeys(&group.custodians)?;
        if custodians.len() < group.quorum as usize {
            return Err(TxError::BuildFailed {
                message: format!(
                    "Custodian group {} has {} active keys, quorum is {}",
                    group.name,
                    custodians.len(),
                    group.quorum
                ),
            }
            .into());
        }

        let params = StakingParams {
            network: network.network,
            tag: form.protocol.tag.clone(),
            utxos: selection.utxos,
            staker_address: info.address.clone(),
            staker_pubkey: decode_key("wallet public key", &info.public_key_hex)?,
            protocol_pubkey: decode_key("protocol public key", &form.protocol.bitcoin_pubkey)?,
            custodian_pubkeys: custodians.concatenated(),
            custodian_quorum: group.quorum,
            destination_chain: valid.destination.chain.clone(),
            destination_token_address: valid.destination.address.clone(),
            destination_recipient: form.destination_address.clone(),
            amount: valid.amount,
            fee_rate,
            rbf: form.rbf,
        };
        let unsigned = self.vault.build_staking_psbt(&params)?;
        let inputs = signing_inputs(&unsigned.psbt_hex, &info.address)?;
        tracing::info!(
            inputs = inputs.len(),
            selected = selection.total,
            fee = unsigned.fee,
            fee_rate,
            "Built staking PSBT"
        );
        sub.record_built(PendingTransaction::built(
            unsigned.psbt_hex.clone(),
            inputs.clone(),
        ));

        sub.advance(SubmissionState::AwaitingSignature);
        let signed = wallet
            .sign_psbt(&unsigned.psbt_hex, &SignPsbtOptions::finalized(inputs))
            .await?;
        sub.record_signed();
        let tx_hex = extract_signed_tx_hex(&signed)?;

        sub.advance(SubmissionState::Broadcasting);
        let tx_id = TxId::new(wallet.push_tx(&tx_hex).await?);
        let explorer_url = network.explorer_tx_url(tx_id.as_str());
        sub.record_broadcast(tx_id.clone(), explorer_url.clone());

        sub.advance(SubmissionState::AwaitingConfirmation);
        Ok(Confirmation {
            tx_id,
            explorer_url,
        })
    }
}

fn decode_key(what: &str, key_hex: &str) -> std::result::Result<Vec<u8>, TxError> {
    hex::decode(key_hex.trim()).map_err(|e| TxError::BuildFailed {
        message: format!("Invalid {}: {}", what, e),
    })
}
