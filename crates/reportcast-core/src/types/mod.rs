//! Core type definitions for ReportCast.

mod channel;
mod content;
mod message_log;
mod report;

pub use channel::*;
pub use content::*;
pub use message_log::*;
pub use report::*;
