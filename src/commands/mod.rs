//! Command implementations for reelwatch CLI

mod check;
mod misc;
mod notify;
mod watchlist;

pub use check::*;
pub use misc::*;
pub use notify::*;
pub use watchlist::*;
