//! crates/raffle_core/src/sample.rs
//!
//! The sample catalog used to seed an empty raffle store.

use crate::domain::{NewRaffle, TICKET_GRID_SIZE};
use chrono::NaiveDate;

pub fn sample_raffles() -> Vec<NewRaffle> {
    [
        ("iPhone 15 Pro Max", 5, (2024, 12, 24)),
        ("PlayStation 5", 3, (2025, 1, 15)),
        ("Mountain Bike", 2, (2025, 2, 1)),
    ]
    .into_iter()
    .filter_map(|(name, unit_price, (y, m, d))| {
        Some(NewRaffle {
            name: name.to_string(),
            total_tickets: TICKET_GRID_SIZE,
            unit_price,
            draw_date: NaiveDate::from_ymd_opt(y, m, d)?,
        })
    })
    .collect()
}
