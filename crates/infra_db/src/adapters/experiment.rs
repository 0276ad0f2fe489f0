//! Cashback claim experiment adapter
//!
//! The reversal engine consumes the experiment flag through a synchronous
//! port, so this adapter preloads the flags for the accounts in scope
//! before the engine runs and answers lookups from memory.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use core_kernel::{AccountId, DomainPort};
use domain_reversal::ports::CashbackExperimentPort;

use crate::error::DatabaseError;

/// Claim-experiment flags preloaded for a set of accounts
#[derive(Debug, Clone, Default)]
pub struct PreloadedExperimentFlags {
    flags: BTreeMap<AccountId, (NaiveDate, NaiveDate)>,
}

impl PreloadedExperimentFlags {
    /// Loads the active experiment windows for the given accounts
    pub async fn load(
        tx: &mut Transaction<'_, Postgres>,
        account_ids: &[AccountId],
    ) -> Result<Self, DatabaseError> {
        let uuids: Vec<Uuid> = account_ids.iter().map(|id| *id.as_uuid()).collect();
        let rows: Vec<(Uuid, NaiveDate, NaiveDate)> = sqlx::query_as(
            "SELECT account_id, window_start, window_end
             FROM cashback_claim_experiments
             WHERE account_id = ANY($1) AND is_active",
        )
        .bind(&uuids)
        .fetch_all(&mut **tx)
        .await?;

        let flags = rows
            .into_iter()
            .map(|(account_id, start, end)| (account_id.into(), (start, end)))
            .collect();
        Ok(Self { flags })
    }

    /// A fixed in-memory flag set, used by tests and tooling
    pub fn fixed(flags: BTreeMap<AccountId, (NaiveDate, NaiveDate)>) -> Self {
        Self { flags }
    }
}

impl DomainPort for PreloadedExperimentFlags {}

impl CashbackExperimentPort for PreloadedExperimentFlags {
    fn is_claim_active(&self, date: NaiveDate, account_id: AccountId) -> bool {
        self.flags
            .get(&account_id)
            .map(|(start, end)| date >= *start && date <= *end)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_flag_window_bounds() {
        let account_id = AccountId::new();
        let mut flags = BTreeMap::new();
        flags.insert(account_id, (d(2026, 3, 1), d(2026, 3, 31)));
        let adapter = PreloadedExperimentFlags::fixed(flags);

        assert!(adapter.is_claim_active(d(2026, 3, 1), account_id));
        assert!(adapter.is_claim_active(d(2026, 3, 31), account_id));
        assert!(!adapter.is_claim_active(d(2026, 4, 1), account_id));
        assert!(!adapter.is_claim_active(d(2026, 3, 15), AccountId::new()));
    }
}
