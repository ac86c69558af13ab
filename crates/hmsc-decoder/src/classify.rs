use sha2::{Digest, Sha256};

use hmsc_types::{AccountRef, Amount, ContractAbi, DecodedTx, TxDetails};

use crate::abi::decode_params;
use crate::error::DecodeError;
use crate::raw::{RawBody, RawTransactionEnvelope, TransactionCodec};
use crate::selector::function_selector;

/// Classifies a codec's raw decode into the closed [`TxDetails`] enumeration
/// and runs the checks that depend on more than one field at once (the
/// contract-call selector cross-check, checksum derivation).
pub struct TransactionDecoder<C: TransactionCodec> {
    codec: C,
}

impl<C: TransactionCodec> TransactionDecoder<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }

    /// Decodes `frozen_bytes` and classifies it. `abi` is consulted only for
    /// a `ContractCall` body; it is otherwise ignored.
    pub fn decode(
        &self,
        frozen_bytes: &[u8],
        abi: Option<&ContractAbi>,
    ) -> Result<DecodedTx, DecodeError> {
        let envelope = self.codec.decode_raw(frozen_bytes)?;
        let details = self.classify(envelope.body, abi)?;

        let full_checksum = hex::encode(Sha256::digest(frozen_bytes));
        let short_checksum = full_checksum[..16].to_string();

        Ok(DecodedTx {
            type_tag: details.type_tag().to_string(),
            full_checksum,
            short_checksum,
            valid_start_secs: envelope.valid_start_secs,
            valid_duration_secs: envelope.valid_duration_secs,
            details,
        })
    }

    fn classify(
        &self,
        body: RawBody,
        abi: Option<&ContractAbi>,
    ) -> Result<TxDetails, DecodeError> {
        Ok(match body {
            RawBody::CryptoTransfer { transfers } => TxDetails::Transfer {
                transfers: transfers
                    .into_iter()
                    .map(|t| Amount {
                        account: AccountRef(t.account),
                        value: t.value,
                    })
                    .collect(),
            },
            RawBody::TokenAssociate { account, token_ids } => TxDetails::TokenAssociate {
                account: AccountRef(account),
                token_ids,
            },
            RawBody::TokenDissociate { account, token_ids } => TxDetails::TokenDissociate {
                account: AccountRef(account),
                token_ids,
            },
            RawBody::TokenCreate {
                name,
                symbol,
                initial_supply,
                treasury,
            } => TxDetails::TokenCreate {
                name,
                symbol,
                initial_supply,
                treasury: AccountRef(treasury),
            },
            RawBody::TokenMint { token_id, amount } => TxDetails::TokenMint { token_id, amount },
            RawBody::TokenBurn { token_id, amount } => TxDetails::TokenBurn { token_id, amount },
            RawBody::TokenUpdate { token_id } => TxDetails::TokenUpdate { token_id },
            RawBody::TokenDelete { token_id } => TxDetails::TokenDelete { token_id },
            RawBody::AccountCreate { initial_balance } => {
                TxDetails::AccountCreate { initial_balance }
            }
            RawBody::AccountUpdate { account } => TxDetails::AccountUpdate {
                account: AccountRef(account),
            },
            RawBody::AccountDelete {
                account,
                transfer_to,
            } => TxDetails::AccountDelete {
                account: AccountRef(account),
                transfer_to: AccountRef(transfer_to),
            },
            RawBody::ContractCreate { initial_balance } => {
                TxDetails::ContractCreate { initial_balance }
            }
            RawBody::ContractCall {
                contract_id,
                amount,
                call_data,
            } => self.classify_contract_call(contract_id, amount, call_data, abi)?,
            RawBody::ContractDelete { contract_id } => TxDetails::ContractDelete {
                contract_id: AccountRef(contract_id),
            },
            RawBody::TopicCreate {} => TxDetails::TopicCreate {},
            RawBody::TopicUpdate { topic_id } => TxDetails::TopicUpdate { topic_id },
            RawBody::TopicDelete { topic_id } => TxDetails::TopicDelete { topic_id },
            RawBody::TopicMessageSubmit { topic_id, message } => TxDetails::TopicMessageSubmit {
                topic_id,
                message_len: message.len(),
            },
            RawBody::FileCreate {} => TxDetails::FileCreate {},
            RawBody::FileUpdate { file_id } => TxDetails::FileUpdate { file_id },
            RawBody::FileDelete { file_id } => TxDetails::FileDelete { file_id },
            RawBody::FileAppend { file_id } => TxDetails::FileAppend { file_id },
            RawBody::ScheduleCreate {} => TxDetails::ScheduleCreate {},
            RawBody::ScheduleSign { schedule_id } => TxDetails::ScheduleSign { schedule_id },
            RawBody::ScheduleDelete { schedule_id } => TxDetails::ScheduleDelete { schedule_id },
        })
    }

    /// A contract call with an ABI attached must name a function whose
    /// selector matches the call data's first 4 bytes. Without an ABI, the
    /// call is still decoded but left unverified rather than blocked.
    fn classify_contract_call(
        &self,
        contract_id: String,
        amount: u64,
        call_data: Vec<u8>,
        abi: Option<&ContractAbi>,
    ) -> Result<TxDetails, DecodeError> {
        let mut actual_selector = [0u8; 4];
        if call_data.len() >= 4 {
            actual_selector.copy_from_slice(&call_data[..4]);
        }

        let (function_name, params, selector_verified) = match abi {
            None => (None, Vec::new(), false),
            Some(abi) => {
                let matching = abi
                    .functions
                    .iter()
                    .find(|f| function_selector(&f.signature()) == actual_selector);
                match matching {
                    Some(f) => (Some(f.name.clone()), decode_params(f, &call_data), true),
                    None => {
                        return Err(DecodeError::SelectorMismatch {
                            actual: hex::encode(actual_selector),
                        })
                    }
                }
            }
        };

        Ok(TxDetails::ContractExecute {
            contract_id: AccountRef(contract_id),
            amount,
            actual_selector,
            call_data,
            function_name,
            params,
            selector_verified,
        })
    }
}
