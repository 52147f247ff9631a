//! Candlestick pattern detectors
//!
//! # Patterns
//!
//! - **Mat Hold (5 bars)**: strong white candle, three black reaction candles, then a fifth
//!   candle that opens at or above the prior close and finishes above the first close.

pub mod helpers;
pub mod mat_hold;

pub use helpers::*;
pub use mat_hold::*;
