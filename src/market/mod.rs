// SPDX-License-Identifier: MIT

//! Market data: the offline price cache, the live quote source, and the
//! resolver that chains them.

pub mod cache;
pub mod live;
pub mod resolver;

pub use cache::{OfflineCache, OfflineCacheEntry};
pub use live::{LiveQuotes, LiveTick, YahooQuotes};
pub use resolver::{PriceRecord, PriceResolver, PriceSource};
