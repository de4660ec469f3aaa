use anyhow::Context;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde_json::{json, Value};

use super::{SchemaError, TableStore};
use crate::models::{
    Business, CallIntent, CallRecord, PendingReservation, Reservation, ReservationStatus, User,
    UserStatus,
};

const USERS: &str = "Users";
const BUSINESSES: &str = "Businesses";
const RESERVATIONS: &str = "Reservations";
const PENDING: &str = "PendingReservations";
const CALL_LOGS: &str = "CallLogs";

const DT_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Hosted tabular store client. Records come back as loose JSON; every read
/// goes through an explicit schema check before it becomes a model value.
pub struct AirtableStore {
    api_key: String,
    base: String,
    client: reqwest::Client,
}

impl AirtableStore {
    pub fn new(api_key: String, base_url: String, base_id: String) -> Self {
        Self {
            api_key,
            base: format!("{base_url}/{base_id}"),
            client: reqwest::Client::new(),
        }
    }

    async fn list(
        &self,
        table: &str,
        formula: Option<String>,
        max_records: Option<i64>,
    ) -> anyhow::Result<Vec<Value>> {
        let mut req = self
            .client
            .get(format!("{}/{table}", self.base))
            .bearer_auth(&self.api_key);
        if let Some(formula) = formula {
            req = req.query(&[("filterByFormula", formula)]);
        }
        if let Some(max) = max_records {
            req = req.query(&[("maxRecords", max.to_string())]);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("failed to list {table} records"))?;
        let status = resp.status();
        let data: Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse {table} list response"))?;
        if !status.is_success() {
            anyhow::bail!("table store error listing {table} ({status}): {data}");
        }

        let records = data["records"]
            .as_array()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("{table} list response missing 'records'"))?;
        Ok(records)
    }

    async fn find_one(&self, table: &str, formula: String) -> anyhow::Result<Option<Value>> {
        let records = self.list(table, Some(formula), Some(1)).await?;
        Ok(records.into_iter().next())
    }

    async fn create(&self, table: &str, fields: Value) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(format!("{}/{table}", self.base))
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .with_context(|| format!("failed to create {table} record"))?;

        let status = resp.status();
        if !status.is_success() {
            let detail: Value = resp.json().await.unwrap_or_default();
            anyhow::bail!("table store error creating {table} ({status}): {detail}");
        }
        Ok(())
    }

    /// Patch fields on the record our `id` column points at. Returns false
    /// when no such record exists.
    async fn update_by_id(&self, table: &str, id: &str, fields: Value) -> anyhow::Result<bool> {
        let Some(record) = self.find_one(table, match_formula("id", id)).await? else {
            return Ok(false);
        };
        let record_id = record["id"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("{table} record missing record id"))?;

        let resp = self
            .client
            .patch(format!("{}/{table}/{record_id}", self.base))
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .with_context(|| format!("failed to update {table} record"))?;

        let status = resp.status();
        if !status.is_success() {
            let detail: Value = resp.json().await.unwrap_or_default();
            anyhow::bail!("table store error updating {table} ({status}): {detail}");
        }
        Ok(true)
    }
}

fn match_formula(field: &str, value: &str) -> String {
    // single quotes would break out of the formula literal
    let safe: String = value.chars().filter(|c| *c != '\'').collect();
    format!("{{{field}}} = '{safe}'")
}

// ── Schema checks on loose records ──

fn str_field(fields: &Value, table: &str, name: &str) -> anyhow::Result<String> {
    fields[name]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| SchemaError(format!("{table} record missing text field '{name}'")).into())
}

fn opt_str_field(fields: &Value, name: &str) -> Option<String> {
    fields[name].as_str().map(|s| s.to_string()).filter(|s| !s.is_empty())
}

fn int_field(fields: &Value, table: &str, name: &str) -> anyhow::Result<i64> {
    fields[name]
        .as_i64()
        .ok_or_else(|| SchemaError(format!("{table} record missing integer field '{name}'")).into())
}

fn dt_field(fields: &Value, table: &str, name: &str) -> anyhow::Result<NaiveDateTime> {
    let raw = str_field(fields, table, name)?;
    NaiveDateTime::parse_from_str(&raw, DT_FMT)
        .map_err(|_| SchemaError(format!("{table} record has malformed '{name}': {raw}")).into())
}

fn parse_user(record: &Value) -> anyhow::Result<User> {
    let fields = &record["fields"];
    Ok(User {
        id: str_field(fields, USERS, "id")?,
        email: str_field(fields, USERS, "email")?,
        business_name: opt_str_field(fields, "business_name").unwrap_or_default(),
        full_name: opt_str_field(fields, "full_name").unwrap_or_default(),
        phone: opt_str_field(fields, "phone").unwrap_or_default(),
        password_hash: str_field(fields, USERS, "password_hash")?,
        status: UserStatus::from_str(&opt_str_field(fields, "status").unwrap_or_default()),
        business_id: opt_str_field(fields, "business_id"),
        created_at: dt_field(fields, USERS, "created_at")?,
    })
}

fn parse_business(record: &Value) -> anyhow::Result<Business> {
    let fields = &record["fields"];
    Ok(Business {
        id: str_field(fields, BUSINESSES, "id")?,
        name: str_field(fields, BUSINESSES, "name")?,
        phone: str_field(fields, BUSINESSES, "phone")?,
        owner_id: str_field(fields, BUSINESSES, "owner_id")?,
        business_type: opt_str_field(fields, "business_type").unwrap_or_default(),
        address: opt_str_field(fields, "address").unwrap_or_default(),
        policies: opt_str_field(fields, "policies").unwrap_or_default(),
        greeting: opt_str_field(fields, "greeting").unwrap_or_default(),
        description: opt_str_field(fields, "description").unwrap_or_default(),
        created_at: dt_field(fields, BUSINESSES, "created_at")?,
    })
}

fn parse_reservation(record: &Value) -> anyhow::Result<Reservation> {
    let fields = &record["fields"];
    let date = str_field(fields, RESERVATIONS, "date")?;
    Ok(Reservation {
        id: str_field(fields, RESERVATIONS, "id")?,
        business_id: str_field(fields, RESERVATIONS, "business_id")?,
        guest_name: str_field(fields, RESERVATIONS, "guest_name")?,
        guest_phone: opt_str_field(fields, "guest_phone"),
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
            SchemaError(format!("{RESERVATIONS} record has malformed date '{date}'"))
        })?,
        time: str_field(fields, RESERVATIONS, "time")?,
        guests: int_field(fields, RESERVATIONS, "guests")?,
        special_requests: opt_str_field(fields, "special_requests"),
        status: ReservationStatus::from_str(&opt_str_field(fields, "status").unwrap_or_default()),
        created_at: dt_field(fields, RESERVATIONS, "created_at")?,
        updated_at: dt_field(fields, RESERVATIONS, "updated_at")?,
    })
}

fn parse_pending(record: &Value) -> anyhow::Result<PendingReservation> {
    let fields = &record["fields"];
    let payload = str_field(fields, PENDING, "payload")?;
    Ok(PendingReservation {
        id: str_field(fields, PENDING, "id")?,
        business_id: opt_str_field(fields, "business_id"),
        payload: serde_json::from_str(&payload)
            .map_err(|_| SchemaError(format!("{PENDING} record has malformed payload")))?,
        reason: opt_str_field(fields, "reason").unwrap_or_default(),
        created_at: dt_field(fields, PENDING, "created_at")?,
    })
}

fn parse_call_record(record: &Value) -> anyhow::Result<CallRecord> {
    let fields = &record["fields"];
    Ok(CallRecord {
        id: str_field(fields, CALL_LOGS, "id")?,
        business_id: str_field(fields, CALL_LOGS, "business_id")?,
        call_id: str_field(fields, CALL_LOGS, "call_id")?,
        intent: CallIntent::from_str(&opt_str_field(fields, "intent").unwrap_or_default()),
        outcome: opt_str_field(fields, "outcome").unwrap_or_default(),
        summary: opt_str_field(fields, "summary").unwrap_or_default(),
        recording_url: opt_str_field(fields, "recording_url"),
        created_at: dt_field(fields, CALL_LOGS, "created_at")?,
    })
}

#[async_trait]
impl TableStore for AirtableStore {
    async fn create_user(&self, user: &User) -> anyhow::Result<()> {
        self.create(
            USERS,
            json!({
                "id": user.id,
                "email": user.email,
                "business_name": user.business_name,
                "full_name": user.full_name,
                "phone": user.phone,
                "password_hash": user.password_hash,
                "status": user.status.as_str(),
                "business_id": user.business_id,
                "created_at": user.created_at.format(DT_FMT).to_string(),
            }),
        )
        .await
    }

    async fn get_user(&self, id: &str) -> anyhow::Result<Option<User>> {
        self.find_one(USERS, match_formula("id", id))
            .await?
            .map(|r| parse_user(&r))
            .transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.find_one(USERS, match_formula("email", email))
            .await?
            .map(|r| parse_user(&r))
            .transpose()
    }

    async fn set_user_status(&self, id: &str, status: UserStatus) -> anyhow::Result<bool> {
        self.update_by_id(USERS, id, json!({ "status": status.as_str() }))
            .await
    }

    async fn link_business(&self, user_id: &str, business_id: &str) -> anyhow::Result<bool> {
        self.update_by_id(USERS, user_id, json!({ "business_id": business_id }))
            .await
    }

    async fn create_business(&self, business: &Business) -> anyhow::Result<()> {
        self.create(
            BUSINESSES,
            json!({
                "id": business.id,
                "name": business.name,
                "phone": business.phone,
                "owner_id": business.owner_id,
                "business_type": business.business_type,
                "address": business.address,
                "policies": business.policies,
                "greeting": business.greeting,
                "description": business.description,
                "created_at": business.created_at.format(DT_FMT).to_string(),
            }),
        )
        .await
    }

    async fn get_business(&self, id: &str) -> anyhow::Result<Option<Business>> {
        self.find_one(BUSINESSES, match_formula("id", id))
            .await?
            .map(|r| parse_business(&r))
            .transpose()
    }

    async fn get_business_by_phone(
        &self,
        phone_digits: &str,
    ) -> anyhow::Result<Option<Business>> {
        self.find_one(BUSINESSES, match_formula("phone", phone_digits))
            .await?
            .map(|r| parse_business(&r))
            .transpose()
    }

    async fn create_reservation(&self, reservation: &Reservation) -> anyhow::Result<()> {
        self.create(
            RESERVATIONS,
            json!({
                "id": reservation.id,
                "business_id": reservation.business_id,
                "guest_name": reservation.guest_name,
                "guest_phone": reservation.guest_phone,
                "date": reservation.date.format("%Y-%m-%d").to_string(),
                "time": reservation.time,
                "guests": reservation.guests,
                "special_requests": reservation.special_requests,
                "status": reservation.status.as_str(),
                "created_at": reservation.created_at.format(DT_FMT).to_string(),
                "updated_at": reservation.updated_at.format(DT_FMT).to_string(),
            }),
        )
        .await
    }

    async fn get_reservation(&self, id: &str) -> anyhow::Result<Option<Reservation>> {
        self.find_one(RESERVATIONS, match_formula("id", id))
            .await?
            .map(|r| parse_reservation(&r))
            .transpose()
    }

    async fn update_reservation_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> anyhow::Result<bool> {
        self.update_by_id(
            RESERVATIONS,
            id,
            json!({
                "status": status.as_str(),
                "updated_at": Utc::now().naive_utc().format(DT_FMT).to_string(),
            }),
        )
        .await
    }

    async fn list_reservations(
        &self,
        business_id: &str,
        status: Option<ReservationStatus>,
        limit: i64,
    ) -> anyhow::Result<Vec<Reservation>> {
        let formula = match status {
            Some(status) => format!(
                "AND({}, {})",
                match_formula("business_id", business_id),
                match_formula("status", status.as_str())
            ),
            None => match_formula("business_id", business_id),
        };
        self.list(RESERVATIONS, Some(formula), Some(limit))
            .await?
            .iter()
            .map(parse_reservation)
            .collect()
    }

    async fn create_pending(&self, pending: &PendingReservation) -> anyhow::Result<()> {
        self.create(
            PENDING,
            json!({
                "id": pending.id,
                "business_id": pending.business_id,
                "payload": serde_json::to_string(&pending.payload)?,
                "reason": pending.reason,
                "created_at": pending.created_at.format(DT_FMT).to_string(),
            }),
        )
        .await
    }

    async fn get_pending(&self, id: &str) -> anyhow::Result<Option<PendingReservation>> {
        self.find_one(PENDING, match_formula("id", id))
            .await?
            .map(|r| parse_pending(&r))
            .transpose()
    }

    async fn list_pending(
        &self,
        business_id: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<PendingReservation>> {
        self.list(
            PENDING,
            Some(match_formula("business_id", business_id)),
            Some(limit),
        )
        .await?
        .iter()
        .map(parse_pending)
        .collect()
    }

    async fn append_call_record(&self, record: &CallRecord) -> anyhow::Result<()> {
        self.create(
            CALL_LOGS,
            json!({
                "id": record.id,
                "business_id": record.business_id,
                "call_id": record.call_id,
                "intent": record.intent.as_str(),
                "outcome": record.outcome,
                "summary": record.summary,
                "recording_url": record.recording_url,
                "created_at": record.created_at.format(DT_FMT).to_string(),
            }),
        )
        .await
    }

    async fn get_call_record_by_call_id(
        &self,
        call_id: &str,
    ) -> anyhow::Result<Option<CallRecord>> {
        self.find_one(CALL_LOGS, match_formula("call_id", call_id))
            .await?
            .map(|r| parse_call_record(&r))
            .transpose()
    }

    async fn list_call_records(
        &self,
        business_id: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<CallRecord>> {
        self.list(
            CALL_LOGS,
            Some(match_formula("business_id", business_id)),
            Some(limit),
        )
        .await?
        .iter()
        .map(parse_call_record)
        .collect()
    }
}
