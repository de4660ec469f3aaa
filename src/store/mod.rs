pub mod airtable;
pub mod sqlite;

use async_trait::async_trait;

use crate::models::{
    Business, CallRecord, PendingReservation, Reservation, ReservationStatus, User, UserStatus,
};

/// A stored record that does not match the expected schema. Kept distinct
/// from transport failures so callers can report malformed data instead of
/// an unreachable backend.
#[derive(Debug, thiserror::Error)]
#[error("store record failed validation: {0}")]
pub struct SchemaError(pub String);

/// The hosted tabular store behind the five tables. Each call is one
/// independent request against the backend; there are no multi-record
/// transactions, so callers tolerate partial application and retry keyed by
/// correlation id.
#[async_trait]
pub trait TableStore: Send + Sync {
    // ── Users ──
    async fn create_user(&self, user: &User) -> anyhow::Result<()>;
    async fn get_user(&self, id: &str) -> anyhow::Result<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn set_user_status(&self, id: &str, status: UserStatus) -> anyhow::Result<bool>;
    async fn link_business(&self, user_id: &str, business_id: &str) -> anyhow::Result<bool>;

    // ── Businesses ──
    async fn create_business(&self, business: &Business) -> anyhow::Result<()>;
    async fn get_business(&self, id: &str) -> anyhow::Result<Option<Business>>;
    /// Lookup by digits-only phone, the way dialed numbers arrive.
    async fn get_business_by_phone(&self, phone_digits: &str) -> anyhow::Result<Option<Business>>;

    // ── Reservations ──
    async fn create_reservation(&self, reservation: &Reservation) -> anyhow::Result<()>;
    async fn get_reservation(&self, id: &str) -> anyhow::Result<Option<Reservation>>;
    async fn update_reservation_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> anyhow::Result<bool>;
    async fn list_reservations(
        &self,
        business_id: &str,
        status: Option<ReservationStatus>,
        limit: i64,
    ) -> anyhow::Result<Vec<Reservation>>;

    // ── Pending reservations ──
    async fn create_pending(&self, pending: &PendingReservation) -> anyhow::Result<()>;
    async fn get_pending(&self, id: &str) -> anyhow::Result<Option<PendingReservation>>;
    async fn list_pending(
        &self,
        business_id: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<PendingReservation>>;

    // ── Call records ──
    async fn append_call_record(&self, record: &CallRecord) -> anyhow::Result<()>;
    async fn get_call_record_by_call_id(
        &self,
        call_id: &str,
    ) -> anyhow::Result<Option<CallRecord>>;
    async fn list_call_records(
        &self,
        business_id: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<CallRecord>>;
}
