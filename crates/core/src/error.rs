use rust_decimal::Decimal;
use thiserror::Error;

/// Boundary rejections. Raised before anything is written, so a failed
/// validation never leaves a spend record or a state change behind.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("spend amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("{which} budget must be positive, got {amount}")]
    NonPositiveBudget { which: &'static str, amount: Decimal },

    #[error("day_of_week must be 0..=6 (Monday = 0), got {0}")]
    DayOutOfRange(u8),

    #[error("dayparting hours must satisfy start < end within 0..=24, got {start}..{end}")]
    InvalidHourRange { start: u8, end: u8 },

    #[error("duplicate dayparting window: day {day}, hours {start}..{end}")]
    DuplicateWindow { day: u8, start: u8, end: u8 },
}
