//! Session state.
//!
//! This module contains:
//! - Inbox: processed emails for the current session
//! - InFlightGuard: duplicate-submission protection

pub mod inbox;

// Re-export commonly used types
pub use inbox::{
    FailurePolicy, InFlightGuard, InFlightTicket, Inbox, InboxEntry, InboxError, StatusCounts,
};
