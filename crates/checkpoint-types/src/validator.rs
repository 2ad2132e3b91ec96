//! Validator set with weighted round-robin proposer selection

use crate::bytes::Address;
use serde::{Deserialize, Serialize};

/// A validator entry as seen by the checkpoint module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub id: u64,
    pub signer: Address,
    pub voting_power: i64,
    #[serde(default)]
    pub proposer_priority: i64,
}

/// Current validator set and its selected proposer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSet {
    pub validators: Vec<Validator>,
    pub proposer: Option<Validator>,
}

impl ValidatorSet {
    /// Build a set and select its first proposer
    ///
    /// Validators are kept sorted by signer so selection does not depend on input order.
    pub fn new(mut validators: Vec<Validator>) -> Self {
        validators.sort_by(|a, b| a.signer.cmp(&b.signer));
        let mut set = Self {
            validators,
            proposer: None,
        };
        set.increment_proposer_priority(1);
        set
    }

    pub fn proposer(&self) -> Option<&Validator> {
        self.proposer.as_ref()
    }

    pub fn total_voting_power(&self) -> i64 {
        self.validators
            .iter()
            .fold(0i64, |acc, v| acc.saturating_add(v.voting_power))
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Advance proposer selection by `times` rounds
    ///
    /// Each round every validator gains its voting power as priority, the highest
    /// priority (lowest signer on ties) becomes proposer and pays back the total power.
    pub fn increment_proposer_priority(&mut self, times: u32) {
        if self.validators.is_empty() {
            return;
        }

        let total = self.total_voting_power();
        for _ in 0..times {
            for validator in self.validators.iter_mut() {
                validator.proposer_priority =
                    validator.proposer_priority.saturating_add(validator.voting_power);
            }

            let mut selected = 0;
            for (idx, validator) in self.validators.iter().enumerate().skip(1) {
                if validator.proposer_priority > self.validators[selected].proposer_priority {
                    selected = idx;
                }
            }

            let proposer = &mut self.validators[selected];
            proposer.proposer_priority = proposer.proposer_priority.saturating_sub(total);
            self.proposer = Some(proposer.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(id: u64, signer: u8, power: i64) -> Validator {
        Validator {
            id,
            signer: Address::new([signer; 20]),
            voting_power: power,
            proposer_priority: 0,
        }
    }

    #[test]
    fn test_equal_power_round_robin() {
        let mut set = ValidatorSet::new(vec![validator(3, 3, 10), validator(1, 1, 10), validator(2, 2, 10)]);

        let mut order = vec![set.proposer().unwrap().id];
        for _ in 0..5 {
            set.increment_proposer_priority(1);
            order.push(set.proposer().unwrap().id);
        }
        assert_eq!(order, vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_weighted_selection() {
        let mut set = ValidatorSet::new(vec![validator(1, 1, 30), validator(2, 2, 10)]);

        let mut counts = [0usize; 2];
        counts[(set.proposer().unwrap().id - 1) as usize] += 1;
        for _ in 0..7 {
            set.increment_proposer_priority(1);
            counts[(set.proposer().unwrap().id - 1) as usize] += 1;
        }
        assert_eq!(counts, [6, 2]);
    }

    #[test]
    fn test_empty_set_has_no_proposer() {
        let mut set = ValidatorSet::new(Vec::new());
        set.increment_proposer_priority(3);
        assert!(set.proposer().is_none());
    }
}
