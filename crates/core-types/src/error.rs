use thiserror::Error;

use crate::enums::BookingStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown booking status '{0}'")]
    UnknownStatus(String),

    #[error("Booking cannot move from '{from}' to '{to}'")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },
}
