//! Protocol Adapters - Concrete Pool Integrations
//!
//! - `erc4626`: share-price vaults (base capability)
//! - `lending`: Aave-style supply/borrow markets (base + borrowing)
//! - `curve`: multi-coin stable pools with gauges (base + staking + rewards)
//!
//! Calldata is encoded with `alloy::sol!` interfaces.

pub mod curve;
pub mod erc20;
pub mod erc4626;
pub mod lending;
pub mod swap;

pub use curve::{CurveAdapter, CurvePool};
pub use erc4626::Erc4626Adapter;
pub use lending::{LendingAdapter, LendingMarket};
pub use swap::SwapRouter;
