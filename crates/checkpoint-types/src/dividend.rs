//! Validator dividend accounts and the account root hash

use crate::bytes::{Address, Hash};
use serde::{Deserialize, Serialize};

/// Accumulated fee rewards of one validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendAccount {
    pub user: Address,
    pub fee_amount: u128,
}

impl DividendAccount {
    pub fn leaf_hash(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.user.as_bytes());
        hasher.update(&self.fee_amount.to_le_bytes());
        *hasher.finalize().as_bytes()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountRootError {
    #[error("no dividend accounts")]
    NoDividendAccounts,
}

/// Merkle root over dividend accounts
///
/// Accounts are ordered by user address; an odd node at any level is paired with itself.
pub fn account_root_hash(accounts: &[DividendAccount]) -> Result<Hash, AccountRootError> {
    if accounts.is_empty() {
        return Err(AccountRootError::NoDividendAccounts);
    }

    let mut sorted: Vec<&DividendAccount> = accounts.iter().collect();
    sorted.sort_by(|a, b| a.user.cmp(&b.user));

    let mut level: Vec<[u8; 32]> = sorted.iter().map(|account| account.leaf_hash()).collect();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = pair[0];
                let right = pair.get(1).copied().unwrap_or(left);
                let mut hasher = blake3::Hasher::new();
                hasher.update(&left);
                hasher.update(&right);
                *hasher.finalize().as_bytes()
            })
            .collect();
    }

    Ok(Hash::new(level[0]))
}
