pub mod business;
pub mod call_record;
pub mod reservation;
pub mod user;

pub use business::{normalize_phone, Business};
pub use call_record::{CallIntent, CallRecord};
pub use reservation::{PendingReservation, Reservation, ReservationStatus};
pub use user::{User, UserStatus};
