use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::{SchemaError, TableStore};
use crate::models::{
    Business, CallIntent, CallRecord, PendingReservation, Reservation, ReservationStatus, User,
    UserStatus,
};

const DT_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Local SQLite implementation of the table store, used for development and
/// tests. Handlers hold the connection only for the duration of one query.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // a poisoned lock means another query panicked mid-write; propagating
        // the panic is the only sane option here
        self.conn.lock().expect("store mutex poisoned")
    }
}

fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DT_FMT).to_string()
}

fn parse_dt(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DT_FMT)
        .map_err(|_| SchemaError(format!("malformed stored timestamp '{s}'")).into())
}

fn parse_user_row(row: &Row) -> anyhow::Result<User> {
    let status: String = row.get(6)?;
    let created_at: String = row.get(8)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        business_name: row.get(2)?,
        full_name: row.get(3)?,
        phone: row.get(4)?,
        password_hash: row.get(5)?,
        status: UserStatus::from_str(&status),
        business_id: row.get(7)?,
        created_at: parse_dt(&created_at)?,
    })
}

fn parse_business_row(row: &Row) -> anyhow::Result<Business> {
    let created_at: String = row.get(9)?;
    Ok(Business {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        owner_id: row.get(3)?,
        business_type: row.get(4)?,
        address: row.get(5)?,
        policies: row.get(6)?,
        greeting: row.get(7)?,
        description: row.get(8)?,
        created_at: parse_dt(&created_at)?,
    })
}

fn parse_reservation_row(row: &Row) -> anyhow::Result<Reservation> {
    let date: String = row.get(4)?;
    let status: String = row.get(8)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    Ok(Reservation {
        id: row.get(0)?,
        business_id: row.get(1)?,
        guest_name: row.get(2)?,
        guest_phone: row.get(3)?,
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| SchemaError(format!("malformed stored date '{date}'")))?,
        time: row.get(5)?,
        guests: row.get(6)?,
        special_requests: row.get(7)?,
        status: ReservationStatus::from_str(&status),
        created_at: parse_dt(&created_at)?,
        updated_at: parse_dt(&updated_at)?,
    })
}

fn parse_pending_row(row: &Row) -> anyhow::Result<PendingReservation> {
    let payload: String = row.get(2)?;
    let created_at: String = row.get(4)?;
    Ok(PendingReservation {
        id: row.get(0)?,
        business_id: row.get(1)?,
        payload: serde_json::from_str(&payload)
            .map_err(|_| SchemaError("malformed stored payload".to_string()))?,
        reason: row.get(3)?,
        created_at: parse_dt(&created_at)?,
    })
}

fn parse_call_row(row: &Row) -> anyhow::Result<CallRecord> {
    let intent: String = row.get(3)?;
    let created_at: String = row.get(7)?;
    Ok(CallRecord {
        id: row.get(0)?,
        business_id: row.get(1)?,
        call_id: row.get(2)?,
        intent: CallIntent::from_str(&intent),
        outcome: row.get(4)?,
        summary: row.get(5)?,
        recording_url: row.get(6)?,
        created_at: parse_dt(&created_at)?,
    })
}

const USER_COLS: &str = "id, email, business_name, full_name, phone, password_hash, status, business_id, created_at";
const BUSINESS_COLS: &str =
    "id, name, phone, owner_id, business_type, address, policies, greeting, description, created_at";
const RESERVATION_COLS: &str = "id, business_id, guest_name, guest_phone, date, time, guests, special_requests, status, created_at, updated_at";
const CALL_COLS: &str =
    "id, business_id, call_id, intent, outcome, summary, recording_url, created_at";

#[async_trait]
impl TableStore for SqliteStore {
    async fn create_user(&self, user: &User) -> anyhow::Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO users (id, email, business_name, full_name, phone, password_hash, status, business_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user.id,
                user.email,
                user.business_name,
                user.full_name,
                user.phone,
                user.password_hash,
                user.status.as_str(),
                user.business_id,
                fmt_dt(&user.created_at),
            ],
        )?;
        Ok(())
    }

    async fn get_user(&self, id: &str) -> anyhow::Result<Option<User>> {
        let conn = self.lock();
        let result = conn.query_row(
            &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
            params![id],
            |row| Ok(parse_user_row(row)),
        );
        match result {
            Ok(user) => Ok(Some(user?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let conn = self.lock();
        let result = conn.query_row(
            &format!("SELECT {USER_COLS} FROM users WHERE email = ?1"),
            params![email],
            |row| Ok(parse_user_row(row)),
        );
        match result {
            Ok(user) => Ok(Some(user?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_user_status(&self, id: &str, status: UserStatus) -> anyhow::Result<bool> {
        let conn = self.lock();
        let count = conn.execute(
            "UPDATE users SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(count > 0)
    }

    async fn link_business(&self, user_id: &str, business_id: &str) -> anyhow::Result<bool> {
        let conn = self.lock();
        let count = conn.execute(
            "UPDATE users SET business_id = ?1 WHERE id = ?2",
            params![business_id, user_id],
        )?;
        Ok(count > 0)
    }

    async fn create_business(&self, business: &Business) -> anyhow::Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO businesses (id, name, phone, owner_id, business_type, address, policies, greeting, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                business.id,
                business.name,
                business.phone,
                business.owner_id,
                business.business_type,
                business.address,
                business.policies,
                business.greeting,
                business.description,
                fmt_dt(&business.created_at),
            ],
        )?;
        Ok(())
    }

    async fn get_business(&self, id: &str) -> anyhow::Result<Option<Business>> {
        let conn = self.lock();
        let result = conn.query_row(
            &format!("SELECT {BUSINESS_COLS} FROM businesses WHERE id = ?1"),
            params![id],
            |row| Ok(parse_business_row(row)),
        );
        match result {
            Ok(business) => Ok(Some(business?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_business_by_phone(
        &self,
        phone_digits: &str,
    ) -> anyhow::Result<Option<Business>> {
        let conn = self.lock();
        let result = conn.query_row(
            &format!("SELECT {BUSINESS_COLS} FROM businesses WHERE phone = ?1"),
            params![phone_digits],
            |row| Ok(parse_business_row(row)),
        );
        match result {
            Ok(business) => Ok(Some(business?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_reservation(&self, reservation: &Reservation) -> anyhow::Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO reservations (id, business_id, guest_name, guest_phone, date, time, guests, special_requests, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                reservation.id,
                reservation.business_id,
                reservation.guest_name,
                reservation.guest_phone,
                reservation.date.format("%Y-%m-%d").to_string(),
                reservation.time,
                reservation.guests,
                reservation.special_requests,
                reservation.status.as_str(),
                fmt_dt(&reservation.created_at),
                fmt_dt(&reservation.updated_at),
            ],
        )?;
        Ok(())
    }

    async fn get_reservation(&self, id: &str) -> anyhow::Result<Option<Reservation>> {
        let conn = self.lock();
        let result = conn.query_row(
            &format!("SELECT {RESERVATION_COLS} FROM reservations WHERE id = ?1"),
            params![id],
            |row| Ok(parse_reservation_row(row)),
        );
        match result {
            Ok(reservation) => Ok(Some(reservation?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_reservation_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> anyhow::Result<bool> {
        let conn = self.lock();
        let now = fmt_dt(&Utc::now().naive_utc());
        let count = conn.execute(
            "UPDATE reservations SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now, id],
        )?;
        Ok(count > 0)
    }

    async fn list_reservations(
        &self,
        business_id: &str,
        status: Option<ReservationStatus>,
        limit: i64,
    ) -> anyhow::Result<Vec<Reservation>> {
        let conn = self.lock();
        let mut reservations = vec![];
        match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RESERVATION_COLS} FROM reservations
                     WHERE business_id = ?1 AND status = ?2
                     ORDER BY date DESC, time DESC LIMIT ?3"
                ))?;
                let rows = stmt.query_map(params![business_id, status.as_str(), limit], |row| {
                    Ok(parse_reservation_row(row))
                })?;
                for row in rows {
                    reservations.push(row??);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RESERVATION_COLS} FROM reservations
                     WHERE business_id = ?1
                     ORDER BY date DESC, time DESC LIMIT ?2"
                ))?;
                let rows = stmt.query_map(params![business_id, limit], |row| {
                    Ok(parse_reservation_row(row))
                })?;
                for row in rows {
                    reservations.push(row??);
                }
            }
        }
        Ok(reservations)
    }

    async fn create_pending(&self, pending: &PendingReservation) -> anyhow::Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO pending_reservations (id, business_id, payload, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                pending.id,
                pending.business_id,
                serde_json::to_string(&pending.payload)?,
                pending.reason,
                fmt_dt(&pending.created_at),
            ],
        )?;
        Ok(())
    }

    async fn get_pending(&self, id: &str) -> anyhow::Result<Option<PendingReservation>> {
        let conn = self.lock();
        let result = conn.query_row(
            "SELECT id, business_id, payload, reason, created_at FROM pending_reservations WHERE id = ?1",
            params![id],
            |row| Ok(parse_pending_row(row)),
        );
        match result {
            Ok(pending) => Ok(Some(pending?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_pending(
        &self,
        business_id: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<PendingReservation>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, business_id, payload, reason, created_at FROM pending_reservations
             WHERE business_id = ?1 ORDER BY created_at ASC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![business_id, limit], |row| Ok(parse_pending_row(row)))?;

        let mut pending = vec![];
        for row in rows {
            pending.push(row??);
        }
        Ok(pending)
    }

    async fn append_call_record(&self, record: &CallRecord) -> anyhow::Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO call_records (id, business_id, call_id, intent, outcome, summary, recording_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id,
                record.business_id,
                record.call_id,
                record.intent.as_str(),
                record.outcome,
                record.summary,
                record.recording_url,
                fmt_dt(&record.created_at),
            ],
        )?;
        Ok(())
    }

    async fn get_call_record_by_call_id(
        &self,
        call_id: &str,
    ) -> anyhow::Result<Option<CallRecord>> {
        let conn = self.lock();
        let result = conn.query_row(
            &format!("SELECT {CALL_COLS} FROM call_records WHERE call_id = ?1"),
            params![call_id],
            |row| Ok(parse_call_row(row)),
        );
        match result {
            Ok(record) => Ok(Some(record?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_call_records(
        &self,
        business_id: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<CallRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CALL_COLS} FROM call_records WHERE business_id = ?1
             ORDER BY created_at DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![business_id, limit], |row| Ok(parse_call_row(row)))?;

        let mut records = vec![];
        for row in rows {
            records.push(row??);
        }
        Ok(records)
    }
}
