//! Immutable transaction records and history filtering.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerguard_core::{AccountId, Amount, DomainError, Entity, TransactionId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Deposit,
    TransferSent,
    TransferReceived,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::TransferSent => "TRANSFER_SENT",
            TransactionKind::TransferReceived => "TRANSFER_RECEIVED",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEPOSIT" => Ok(TransactionKind::Deposit),
            "TRANSFER_SENT" => Ok(TransactionKind::TransferSent),
            "TRANSFER_RECEIVED" => Ok(TransactionKind::TransferReceived),
            _ => Err(DomainError::invalid(format!(
                "transaction kind must be one of: DEPOSIT, TRANSFER_SENT, TRANSFER_RECEIVED (got {s:?})"
            ))),
        }
    }
}

/// One line of an account's history. Never modified after it is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub amount: Amount,
    pub kind: TransactionKind,
    /// Owner of this record.
    pub account_id: AccountId,
    /// Counterparty, for transfers.
    pub related_account_id: Option<AccountId>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn deposit(account_id: AccountId, amount: Amount, at: DateTime<Utc>) -> Self {
        Self {
            id: TransactionId::new(),
            amount,
            kind: TransactionKind::Deposit,
            account_id,
            related_account_id: None,
            description: None,
            created_at: at,
        }
    }

    /// The mirrored pair of records for one transfer: (sent, received).
    pub fn transfer_pair(
        sender: AccountId,
        recipient: AccountId,
        amount: Amount,
        description: Option<String>,
        at: DateTime<Utc>,
    ) -> (Self, Self) {
        let sent = Self {
            id: TransactionId::new(),
            amount,
            kind: TransactionKind::TransferSent,
            account_id: sender,
            related_account_id: Some(recipient),
            description: description.clone(),
            created_at: at,
        };
        let received = Self {
            id: TransactionId::new(),
            amount,
            kind: TransactionKind::TransferReceived,
            account_id: recipient,
            related_account_id: Some(sender),
            description,
            created_at: at,
        };
        (sent, received)
    }
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Both sides of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub sent: Transaction,
    pub received: Transaction,
}

/// History query. Date bounds are inclusive; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub kind: Option<TransactionKind>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn since(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.kind.is_none_or(|k| k == tx.kind)
            && self.start.is_none_or(|s| tx.created_at >= s)
            && self.end.is_none_or(|e| tx.created_at <= e)
    }
}

/// Newest first; ties (both legs of a transfer) broken by id, which is time-ordered.
pub fn newest_first(a: &Transaction, b: &Transaction) -> core::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn transfer_pair_cross_references_both_accounts() {
        let (a, b) = (AccountId::new(), AccountId::new());
        let (sent, received) = Transaction::transfer_pair(
            a,
            b,
            Amount::from_units(200),
            Some("rent".to_string()),
            Utc::now(),
        );
        assert_eq!(sent.kind, TransactionKind::TransferSent);
        assert_eq!(sent.account_id, a);
        assert_eq!(sent.related_account_id, Some(b));
        assert_eq!(received.kind, TransactionKind::TransferReceived);
        assert_eq!(received.account_id, b);
        assert_eq!(received.related_account_id, Some(a));
        assert_eq!(sent.amount, received.amount);
        assert_eq!(sent.description, received.description);
        assert_ne!(sent.id, received.id);
    }

    #[test]
    fn filter_bounds_are_inclusive() {
        let day = |d| Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap();
        let tx = Transaction::deposit(AccountId::new(), Amount::from_units(1), day(10));

        assert!(HistoryFilter::all().since(day(10)).until(day(10)).matches(&tx));
        assert!(!HistoryFilter::all().since(day(11)).matches(&tx));
        assert!(!HistoryFilter::all().until(day(9)).matches(&tx));
        assert!(!HistoryFilter::all().with_kind(TransactionKind::TransferSent).matches(&tx));
        assert!(HistoryFilter::all().with_kind(TransactionKind::Deposit).matches(&tx));
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("transfer_sent".parse::<TransactionKind>().unwrap(), TransactionKind::TransferSent);
        assert!("withdrawal".parse::<TransactionKind>().is_err());
    }
}
