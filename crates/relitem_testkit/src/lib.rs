//! # relitem Testkit
//!
//! Test utilities for relitem.
//!
//! This crate provides:
//! - Test documents over in-memory and file stores
//! - A customer/order schema shared by the test suites
//! - Property-based test generators using proptest
//! - An edit harness that drives a document from generated operations
//! - A store wrapper that injects prepare and commit failures
//!
//! ## Usage
//!
//! ```rust
//! use relitem_core::OnChangePolicy;
//! use relitem_testkit::prelude::*;
//!
//! with_shop(OnChangePolicy::Cascade, |dm| {
//!     let customer = dm.create_new("customer").unwrap();
//!     assert_eq!(customer.id(), "customer1");
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
