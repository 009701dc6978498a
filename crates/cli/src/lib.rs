//! Library half of the `mcfdesk` binary: the conversation loop and workbook
//! selection, shared by the commands and the integration tests.

pub mod chat;
pub mod source;

pub use chat::{ChatSession, Entry, QuickAction, Role, Turn};
pub use source::{OpenedSource, SourceArgs, SourceError};
