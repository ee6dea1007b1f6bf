//! Ingests UK parliamentary expense-claim records, filters them by
//! newsworthiness heuristics, and posts one previously-unposted claim per
//! run. The interesting parts are the percentile threshold generator and
//! the ordered decision rule in [`filter`]; fetching, posting and member
//! lookup sit behind traits so the batch logic stays pure and testable.

pub mod config;
pub mod expense;
pub mod filter;
pub mod history;
pub mod importer;
pub mod job;
pub mod members;
pub mod poster;
pub mod render;
pub mod select;
pub mod thresholds;

// Flat public surface for the domain types and functions.
pub use config::Config;
pub use expense::{describe_expenses, Expense, FIRST_CLASS_TYPES};
pub use filter::{expense_filter, filter_expenses, CategoryShortcut, FilterPolicy};
pub use history::{MemoryHistory, PublishHistory, SqliteHistory};
pub use importer::{
    load_years, parse_date, positive_decimal_or_none, read_expenses, year_code,
    year_codes_range, CsvDirSource, ExpenseSource, ImportError, EXPECTED_FIELDS,
};
pub use job::{PostingWindow, RunOutcome};
pub use members::{Member, MemberCache, MemberLookup, NoLookup, NotableMembers, StaticLookup};
pub use poster::{LogPoster, Poster};
pub use render::{claim_text, expense_text, first_class_claim_text, money_string};
pub use select::{choose_unpublished, within_window};
pub use thresholds::{
    generate_group_thresholds, generate_travel_thresholds, ThresholdMap, ThresholdParams,
};
