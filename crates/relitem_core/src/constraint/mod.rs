//! Foreign keys, triggers and the change-processing pipeline.
//!
//! Every change staged in a [`Transaction`](crate::Transaction) goes
//! through [`engine::process_change`], which classifies it as a creation,
//! an update or a deletion against the transaction's view and runs, in
//! order: Before* triggers, id and foreign-key checks, staging, cascades
//! and After* triggers.

pub(crate) mod engine;
mod foreign_key;
mod trigger;

pub use foreign_key::{ForeignKey, OnChangePolicy};
pub use trigger::{Trigger, TriggerItems, TriggerPoint, TriggerSet};
