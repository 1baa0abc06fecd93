//! # tide-accrual — Linear interest accrual engine.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Linear accrual**: a holder's balance grows as
//!   `raw * (1 + rate * elapsed)`, never compounding between realizations.
//! - **Lazy realization**: pending interest is minted into the raw balance only
//!   when the holder is about to be mutated (see [`realize_interest`]).
//! - **Rate policy**: the global rate offered to new deposits may only fall.

pub mod engine;
pub mod rate;

pub use engine::{realize_interest, AccrualEngine};
pub use rate::{RateChange, RatePolicy};
