//! Per-page state and output value types
//!
//! This module contains:
//! - The page state machine each seed page moves through
//! - `PageRecord`, the unit of output
//! - `FetchFailure`, the value recorded when a page yields no record

mod page_state;
mod record;

pub use page_state::PageState;
pub use record::{FailureKind, FetchFailure, PageRecord};
