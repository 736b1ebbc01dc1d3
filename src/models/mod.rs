//! Domain records and status enums shared by the persistence layer.

mod records;
mod status;

pub use records::{
    Amenity, ApplicationDetails, Dorm, OwnerProfile, Payment, PaymentRequest, Rental,
    RentalApplication, Room, TenantProfile, Transaction, User,
};
pub use status::{
    ApplicationStatus, DormStatus, DormType, PaymentRequestStatus, PaymentStatus, RentalStatus,
    Role, StatusFlow, TransactionStatus,
};
