pub mod closing;
pub mod journal;
pub mod ledger;
pub mod rules;
pub mod utils;
pub mod validation;

pub use closing::{ClosingResult, TotalSummary, close_books};
pub use journal::create_journal;
pub use ledger::{Ledger, LedgerRow, general_ledger};
