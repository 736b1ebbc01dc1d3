//! Typed rows, one struct per table.

use super::status::{
    ApplicationStatus, DormStatus, DormType, PaymentRequestStatus, PaymentStatus, RentalStatus,
    Role, TransactionStatus,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An account. The hash never leaves the crate through serialization.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub user_id: i64,
    pub role: Role,
    pub fullname: String,
    pub username: String,
    pub email: String,
    pub contact_no: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
pub struct OwnerProfile {
    pub owner_id: i64,
    pub display_name: Option<String>,
    pub messenger_link: Option<String>,
    pub facebook_link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct TenantProfile {
    pub tenant_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<String>,
    pub guardian_fullname: Option<String>,
    pub guardian_contact: Option<String>,
    pub guardian_email: Option<String>,
    pub profile_picture_url: Option<String>,
    pub agreed_terms: bool,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Dorm {
    pub dorm_id: i64,
    pub owner_id: i64,
    pub dorm_name: String,
    pub location_text: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub dorm_type: DormType,
    pub no_of_rooms: i64,
    pub status: DormStatus,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Room {
    pub room_id: i64,
    pub dorm_id: i64,
    pub room_no: String,
    pub room_type: Option<String>,
    pub capacity: i64,
    pub price_monthly: f64,
    pub is_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Amenity {
    pub amenity_id: i64,
    pub label: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RentalApplication {
    pub application_id: i64,
    pub tenant_id: i64,
    pub dorm_id: i64,
    pub room_id: i64,
    pub action_status: ApplicationStatus,
    pub remarks: Option<String>,
    pub submitted_at: NaiveDateTime,
    pub reviewed_at: Option<NaiveDateTime>,
}

/// Contact data the tenant typed into the application form.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ApplicationDetails {
    pub application_id: i64,
    pub additional_notes: Option<String>,
    pub tenant_fullname: Option<String>,
    pub tenant_email: Option<String>,
    pub tenant_phone: Option<String>,
    pub tenant_gender: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Rental {
    pub rental_id: i64,
    pub application_id: Option<i64>,
    pub tenant_id: i64,
    pub room_id: i64,
    pub status: RentalStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub payment_id: i64,
    pub rental_id: i64,
    pub due_date: NaiveDate,
    pub amount_due: f64,
    pub amount_paid: f64,
    pub status: PaymentStatus,
    pub paid_at: Option<NaiveDateTime>,
}

impl Payment {
    /// Amount still owed on this cycle, never negative.
    pub fn balance(&self) -> f64 {
        (self.amount_due - self.amount_paid).max(0.0)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentRequest {
    pub request_id: i64,
    pub tenant_id: i64,
    pub rental_id: i64,
    pub amount: f64,
    pub proof_image: Option<String>,
    pub status: PaymentRequestStatus,
    pub remarks: Option<String>,
    pub submitted_at: NaiveDateTime,
    pub reviewed_at: Option<NaiveDateTime>,
}

/// Earnings ledger row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Transaction {
    pub transaction_id: i64,
    pub owner_id: i64,
    pub tenant_id: i64,
    pub rental_id: Option<i64>,
    pub amount: f64,
    pub status: TransactionStatus,
    pub transaction_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_balance_clamps_overpayment() {
        let payment = Payment {
            payment_id: 1,
            rental_id: 1,
            due_date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            amount_due: 2500.0,
            amount_paid: 3000.0,
            status: PaymentStatus::Paid,
            paid_at: None,
        };
        assert_eq!(payment.balance(), 0.0);
    }

    #[test]
    fn test_user_serialization_hides_hash() {
        let user = User {
            user_id: 7,
            role: Role::Tenant,
            fullname: "Ana Cruz".to_string(),
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            contact_no: None,
            password_hash: "$argon2id$v=19$secret".to_string(),
            is_active: true,
            created_at: NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(json.contains("\"role\":\"TENANT\""));
    }
}
