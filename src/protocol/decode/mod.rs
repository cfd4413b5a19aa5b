//! Data type decoders for the wire protocol.
//!
//! Fixed-width numerics are decoded inline by [`crate::protocol::codec`].
//! Temporal and interval types have their own module.
//!
//! | Wire type | Module |
//! |-----------|--------|
//! | DATE, TIMESTAMP, TIME | `datetime` |
//! | INTERVAL YM / DS | `datetime` |

mod datetime;

pub use datetime::{
    decode_datetime, decode_time, encode_datetime, format_interval_ds, format_interval_ym,
};
