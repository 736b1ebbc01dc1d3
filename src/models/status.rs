//! Enumerated states stored in the relational schema.
//!
//! Every lifecycle status carries its transition table; operations call
//! [`StatusFlow::ensure_transition`] before mutating a row so illegal moves
//! are rejected instead of overwritten.

use crate::error::{Result, StaySmartError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A status column with a fixed set of legal transitions.
pub trait StatusFlow: Copy + Eq + fmt::Display {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    /// Returns true if the table allows moving from `self` to `next`.
    fn can_transition_to(self, next: Self) -> bool;

    /// Errors with [`StaySmartError::InvalidTransition`] unless the move is legal.
    fn ensure_transition(self, next: Self) -> Result<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(StaySmartError::invalid_transition(Self::ENTITY, self, next))
        }
    }
}

macro_rules! status_strings {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Returns the value as stored in the database.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            /// Parses a stored value, case-insensitively.
            pub fn parse(s: &str) -> Option<Self> {
                match s.to_ascii_uppercase().as_str() {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Account role; gates which dashboard the front end opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Tenant,
    Owner,
}

status_strings!(Role { Tenant => "TENANT", Owner => "OWNER" });

/// Gender policy of a dorm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DormType {
    Male,
    Female,
    #[default]
    Mixed,
}

status_strings!(DormType { Male => "MALE", Female => "FEMALE", Mixed => "MIXED" });

/// Listing status of a dorm. Owners may switch freely between states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DormStatus {
    #[default]
    Open,
    Full,
    UnderMaintenance,
}

status_strings!(DormStatus {
    Open => "OPEN",
    Full => "FULL",
    UnderMaintenance => "UNDER_MAINTENANCE",
});

impl StatusFlow for DormStatus {
    const ENTITY: &'static str = "dorm";

    fn can_transition_to(self, _next: Self) -> bool {
        true
    }
}

/// Review state of a tenant's rental application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Waiting,
    Approved,
    Rejected,
    Cancelled,
}

status_strings!(ApplicationStatus {
    Waiting => "WAITING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
    Cancelled => "CANCELLED",
});

impl StatusFlow for ApplicationStatus {
    const ENTITY: &'static str = "application";

    fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Waiting, Self::Approved)
                | (Self::Waiting, Self::Rejected)
                | (Self::Waiting, Self::Cancelled)
        )
    }
}

/// Occupancy state of a rental contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalStatus {
    Active,
    Extended,
    Ending,
    Ended,
}

status_strings!(RentalStatus {
    Active => "ACTIVE",
    Extended => "EXTENDED",
    Ending => "ENDING",
    Ended => "ENDED",
});

impl RentalStatus {
    /// States in which the tenant still occupies the room.
    pub const OCCUPYING: [RentalStatus; 3] = [Self::Active, Self::Extended, Self::Ending];

    /// Returns true if the tenant still occupies the room.
    pub fn is_occupying(self) -> bool {
        Self::OCCUPYING.contains(&self)
    }

    /// [`Self::OCCUPYING`] as a SQL list, for `status IN ...` filters.
    pub fn occupying_sql() -> String {
        let quoted: Vec<String> = Self::OCCUPYING
            .iter()
            .map(|status| format!("'{}'", status.as_str()))
            .collect();
        format!("({})", quoted.join(", "))
    }
}

impl StatusFlow for RentalStatus {
    const ENTITY: &'static str = "rental";

    fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Extended)
                | (Self::Active, Self::Ending)
                | (Self::Active, Self::Ended)
                | (Self::Extended, Self::Extended)
                | (Self::Extended, Self::Ending)
                | (Self::Extended, Self::Ended)
                | (Self::Ending, Self::Ended)
        )
    }
}

/// Settlement state of one billing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Due,
    Overdue,
    Paid,
}

status_strings!(PaymentStatus {
    Pending => "PENDING",
    Due => "DUE",
    Overdue => "OVERDUE",
    Paid => "PAID",
});

impl PaymentStatus {
    /// Returns true while money is still owed.
    pub fn is_unpaid(self) -> bool {
        !matches!(self, Self::Paid)
    }
}

impl StatusFlow for PaymentStatus {
    const ENTITY: &'static str = "payment";

    fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Due)
                | (Self::Pending, Self::Overdue)
                | (Self::Pending, Self::Paid)
                | (Self::Due, Self::Overdue)
                | (Self::Due, Self::Paid)
                | (Self::Overdue, Self::Paid)
        )
    }
}

/// Review state of a tenant-submitted payment proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentRequestStatus {
    Pending,
    Approved,
    Rejected,
}

status_strings!(PaymentRequestStatus {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

impl StatusFlow for PaymentRequestStatus {
    const ENTITY: &'static str = "payment request";

    fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved) | (Self::Pending, Self::Rejected)
        )
    }
}

/// Ledger state of an earnings transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Paid,
    Pending,
}

status_strings!(TransactionStatus { Paid => "PAID", Pending => "PENDING" });
