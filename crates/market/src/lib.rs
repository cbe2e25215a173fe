//! Swap routing surface for the stabpool liquidation engine.
//!
//! The engine needs exactly one thing from a market: given an ordered asset
//! path, obtain an exact output amount of the terminal asset while spending
//! no more than a caller-supplied input bound. [`MarketRouter`] is that
//! seam; [`AmmRouter`] is a constant-product reference implementation with
//! the standard 0.3% pool fee.

mod amm;
mod router;

pub use amm::AmmRouter;
pub use router::{MarketRouter, RouterError};
