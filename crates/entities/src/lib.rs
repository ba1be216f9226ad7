//! sea-orm entities backing the diagnosis knowledge graph.
//!
//! Raw tables (`raw_ticket`, `raw_anomaly`) are append-only via import.
//! Standardized tables (`phenomenon`, `root_cause`, `ticket`,
//! `ticket_phenomenon`, `phenomenon_root_cause`) are entirely rebuilt by the
//! index builder. `session` persists dialogue state across turns.

pub mod phenomenon;
pub mod phenomenon_root_cause;
pub mod raw_anomaly;
pub mod raw_ticket;
pub mod root_cause;
pub mod session;
pub mod ticket;
pub mod ticket_phenomenon;
