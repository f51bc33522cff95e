//! Core types, store traits, and role-scoped operations for the lendcrm loan
//! lead CRM.
//!
//! This crate is deliberately free of HTTP and database dependencies. Every
//! operation takes a [`store::CrmStore`] and re-reads roles, statuses, and
//! assignment edges from it on each call.

pub mod admin;
pub mod assignment;
pub mod dashboard;
pub mod dispatch;
pub mod error;
pub mod guard;
pub mod inbox;
pub mod intake;
pub mod khata;
pub mod lead;
pub mod ledger;
pub mod notification;
pub mod store;
pub mod user;
pub mod visibility;

pub use error::{Error, Result};
