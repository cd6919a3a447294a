// 8.0: the desk ties lending, margin, the log and the mocked service together.
// each user action runs validate -> service -> apply + log, and answers with an ActionOutcome.
// the margin book is shared with the price ticker, everything else is owned.

mod core;
mod funding;
mod margin;
mod results;

pub use self::core::{Desk, MarketView};
pub use results::{ActionOutcome, DeskError};
