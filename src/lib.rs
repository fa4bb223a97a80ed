//! Chat client for conversational analytics agents bound to Looker explores
//! or BigQuery tables.

pub mod agent;
pub mod logging;
