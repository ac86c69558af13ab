use std::collections::BTreeSet;

use hmsc_types::{AccountRef, Amount, TxDetails};

/// Projects every credit/debit leg out of a decoded transaction's details.
/// Pure: calling it twice on the same `TxDetails` yields the same list.
/// Families with no notion of an amount yield an empty list.
pub fn extract_amounts(details: &TxDetails) -> Vec<Amount> {
    match details {
        TxDetails::Transfer { transfers } => transfers.clone(),
        TxDetails::ContractExecute {
            contract_id,
            amount,
            ..
        } => vec![Amount {
            account: contract_id.clone(),
            value: *amount as i128,
        }],
        TxDetails::TokenMint { token_id, amount } => vec![Amount {
            account: AccountRef(token_id.clone()),
            value: *amount as i128,
        }],
        TxDetails::TokenBurn { token_id, amount } => vec![Amount {
            account: AccountRef(token_id.clone()),
            value: -(*amount as i128),
        }],
        _ => Vec::new(),
    }
}

/// Projects every account this transaction touches out of its details.
/// Pure, and order-independent: callers compare the returned set, not a
/// particular iteration order.
pub fn extract_accounts(details: &TxDetails) -> BTreeSet<AccountRef> {
    match details {
        TxDetails::Transfer { transfers } => {
            transfers.iter().map(|a| a.account.clone()).collect()
        }
        TxDetails::TokenAssociate { account, .. } | TxDetails::TokenDissociate { account, .. } => {
            BTreeSet::from([account.clone()])
        }
        TxDetails::TokenCreate { treasury, .. } => BTreeSet::from([treasury.clone()]),
        TxDetails::AccountUpdate { account } => BTreeSet::from([account.clone()]),
        TxDetails::AccountDelete {
            account,
            transfer_to,
        } => BTreeSet::from([account.clone(), transfer_to.clone()]),
        TxDetails::ContractExecute { contract_id, .. } | TxDetails::ContractDelete { contract_id } => {
            BTreeSet::from([contract_id.clone()])
        }
        _ => BTreeSet::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmsc_types::AccountRef;

    #[test]
    fn extracts_transfer_legs_unchanged() {
        let details = TxDetails::Transfer {
            transfers: vec![Amount {
                account: AccountRef("0.0.1001".into()),
                value: -10,
            }],
        };
        assert_eq!(extract_amounts(&details), vec![Amount {
            account: AccountRef("0.0.1001".into()),
            value: -10,
        }]);
        assert_eq!(
            extract_accounts(&details),
            BTreeSet::from([AccountRef("0.0.1001".into())])
        );
    }

    #[test]
    fn token_burn_is_a_negative_amount() {
        let details = TxDetails::TokenBurn {
            token_id: "0.0.5000".into(),
            amount: 25,
        };
        let amounts = extract_amounts(&details);
        assert_eq!(amounts[0].value, -25);
    }

    #[test]
    fn families_without_accounts_or_amounts_yield_nothing() {
        let details = TxDetails::TopicCreate {};
        assert!(extract_amounts(&details).is_empty());
        assert!(extract_accounts(&details).is_empty());
    }
}
