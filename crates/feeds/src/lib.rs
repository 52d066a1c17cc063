//! Token data-source fetchers.
//!
//! Every provider implements [`SourceFetcher`]; the poll loop only ever sees
//! that trait. Provider failures never cross it: `fetch` logs and yields an
//! empty batch.
//!
//! ## Providers
//!
//! - `dexscreener` - pair search plus the per-token lookup used for enrichment
//! - `raydium` - the Raydium pair list
//! - `birdeye` - top tokens by 24h volume
//! - `shyft` - token list, enriched through DexScreener

pub mod birdeye;
pub mod dexscreener;
pub mod error;
pub mod http;
pub mod raydium;
pub mod shyft;
pub mod source;

#[cfg(test)]
mod testing;

pub use birdeye::{BirdeyeConfig, BirdeyeFetcher, BIRDEYE_BASE_URL};
pub use dexscreener::{DexScreenerClient, DexScreenerConfig, DexScreenerFetcher, DEXSCREENER_BASE_URL};
pub use error::*;
pub use http::{build_client, DEFAULT_REQUEST_TIMEOUT};
pub use raydium::{RaydiumConfig, RaydiumFetcher, RAYDIUM_BASE_URL};
pub use shyft::{ShyftConfig, ShyftFetcher, SHYFT_BASE_URL};
pub use source::*;
