use crate::models::{ReservationStatus, UserStatus};

/// An attempted state transition that the lifecycle rules forbid.
#[derive(Debug, PartialEq, Eq)]
pub enum TransitionError {
    AlreadyCancelled,
    NotCancellable { current: &'static str },
    AlreadyActive,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::AlreadyCancelled => write!(f, "reservation is already cancelled"),
            TransitionError::NotCancellable { current } => {
                write!(f, "reservation in state '{current}' cannot be cancelled")
            }
            TransitionError::AlreadyActive => write!(f, "user is already active"),
        }
    }
}

/// The only permitted reservation transition: confirmed -> cancelled.
/// Cancellation is terminal.
pub fn cancel_reservation(current: ReservationStatus) -> Result<ReservationStatus, TransitionError> {
    match current {
        ReservationStatus::Confirmed => Ok(ReservationStatus::Cancelled),
        ReservationStatus::Cancelled => Err(TransitionError::AlreadyCancelled),
        ReservationStatus::PendingReview => Err(TransitionError::NotCancellable {
            current: current.as_str(),
        }),
    }
}

/// pending -> active, performed by an administrative actor only.
pub fn activate_user(current: UserStatus) -> Result<UserStatus, TransitionError> {
    match current {
        UserStatus::Pending => Ok(UserStatus::Active),
        UserStatus::Active => Err(TransitionError::AlreadyActive),
    }
}
