pub mod broadcast;
pub mod handlers;
pub mod models;
pub mod portfolio;
pub mod quotes;
pub mod registry;

use std::sync::Arc;

// Re-export commonly used items
pub use broadcast::{Broadcaster, PriceBook, SnapshotRefresher};
pub use portfolio::Ledger;
pub use quotes::{QuoteError, QuoteSource};
pub use registry::SubscriptionRegistry;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn QuoteSource>,
    pub registry: Arc<SubscriptionRegistry>,
    pub book: PriceBook,
    pub ledger: Ledger,
}
