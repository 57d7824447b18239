// Library root: the Yahoo Fantasy response normalizer.
//
// Raw payloads flow through the shape-tolerant accessors in `raw`, into the
// per-resource parsers (`league`, `teams`, `keepers`), and finally through
// `reconcile`. Nothing here performs I/O or holds state across calls.

pub mod context;
pub mod keepers;
pub mod league;
pub mod league_key;
pub mod meta;
pub mod raw;
pub mod reconcile;
pub mod teams;

pub use context::SessionContext;
pub use keepers::KeeperPlayerRecord;
pub use league::LeagueSummary;
pub use meta::LeagueMeta;
pub use reconcile::{ReconciliationResult, RosterSummary, SeasonInput, SeasonKeepers};
pub use teams::TeamRecord;
