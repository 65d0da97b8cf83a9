//! # Repository Implementations
//!
//! One repository per aggregate:
//!
//! - [`catalog`] - service/product lookups and stock deltas
//! - [`stylist`] - roster lookups
//! - [`appointment`] - appointments handed over by the scheduler
//! - [`sale`] - the Transaction Recorder (all-or-nothing sale writes)
//! - [`loan`] - staff loans and guarded payment application
//! - [`inventory`] - internal usage and restock movements
//! - [`settings`] - key/value configuration (exchange rate)

pub mod appointment;
pub mod catalog;
pub mod inventory;
pub mod loan;
pub mod sale;
pub mod settings;
pub mod stylist;
