//! Core domain types for the settlement engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{Amount, PositiveAmount};

/// Returned when an identifier fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("identifier must not be empty")]
pub struct EmptyId;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh, globally unique identifier.
            pub fn generate() -> Self {
                $name(Uuid::new_v4().to_string())
            }

            pub fn new(value: impl Into<String>) -> Result<Self, EmptyId> {
                let value = value.into();
                if value.is_empty() {
                    return Err(EmptyId);
                }
                Ok($name(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = EmptyId;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                $name::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Member identifier. Never reused once generated.
    MemberId
);

opaque_id!(
    /// Payment identifier.
    PaymentId
);

/// A participant of the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
}

impl Member {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: MemberId::generate(),
            name: name.into(),
        }
    }
}

/// Money paid by one member on behalf of the group.
///
/// There is no payee: the amount is shared by every member when balances
/// are computed. Split entries encode their payee in `memo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub payer_id: MemberId,
    pub amount: PositiveAmount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn new(payer_id: MemberId, amount: PositiveAmount, memo: Option<String>) -> Self {
        Self {
            id: PaymentId::generate(),
            payer_id,
            amount,
            memo,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Which way money flows for a member once everything is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceStatus {
    Receive,
    Pay,
    Settled,
}

impl BalanceStatus {
    pub fn of(balance: Amount) -> Self {
        if balance.is_positive() {
            BalanceStatus::Receive
        } else if balance.is_negative() {
            BalanceStatus::Pay
        } else {
            BalanceStatus::Settled
        }
    }
}

impl fmt::Display for BalanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BalanceStatus::Receive => "receive",
            BalanceStatus::Pay => "pay",
            BalanceStatus::Settled => "settled",
        };
        f.write_str(label)
    }
}

/// Derived per-member position: what was paid minus the fair share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberBalance {
    pub member_id: MemberId,
    pub member_name: String,
    pub balance: Amount,
    pub status: BalanceStatus,
}

impl MemberBalance {
    pub fn absolute_amount(&self) -> Amount {
        self.balance.abs()
    }
}

/// A single directed transfer from a debtor to a creditor, by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub from: String,
    pub to: String,
    pub amount: PositiveAmount,
}

/// Commands accepted by [`Warikan::apply`](crate::Warikan::apply).
///
/// Members are addressed by name (case-insensitive), amounts are raw user
/// input and are validated when applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Set the event name.
    SetEventName(String),
    /// Add a new member.
    AddMember(String),
    /// Rename an existing member.
    RenameMember { from: String, to: String },
    /// Remove a member together with every payment they made.
    RemoveMember(String),
    /// Record a payment. With payees, the amount is split into one payment
    /// per payee.
    AddPayment {
        payer: String,
        amount: String,
        payees: Vec<String>,
        memo: Option<String>,
    },
    /// Drop everything and start over.
    Reset,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::SetEventName(_) => "event",
            Action::AddMember(_) => "member",
            Action::RenameMember { .. } => "rename",
            Action::RemoveMember(_) => "remove",
            Action::AddPayment { .. } => "payment",
            Action::Reset => "reset",
        }
    }
}
