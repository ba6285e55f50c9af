//! Terminal front end for the conversion service

pub mod calc;
pub mod convert;
pub mod rates;
pub mod setup;
pub mod status;
pub mod ui;
