//! `mcfdesk-recon`: MCF reconciliation engine.
//!
//! Pure engine crate: loads worksheet grids through the [`Workbook`] trait,
//! answers chat messages against the master table, and applies sheet
//! mutations. No network or CLI dependencies.

pub mod context;
pub mod error;
pub mod format;
pub mod intent;
pub mod layout;
pub mod loader;
pub mod model;
pub mod mutate;
pub mod respond;
pub mod search;
pub mod table;
pub mod workbook;

pub use context::DataContext;
pub use error::{LayoutError, SheetError};
pub use intent::{classify, Intent, Message};
pub use layout::{ColumnSpan, SheetLayout, TabSpec};
pub use loader::{load_workbook, LoadReport, TabOutcome};
pub use model::{Action, OperationResult, OperationStatus, PnlSummary};
pub use mutate::{summarize, Mutator};
pub use respond::{respond, respond_to, Reply, Style, NO_DATA_MESSAGE};
pub use table::Table;
pub use workbook::{Grid, MemoryWorkbook, Workbook};
