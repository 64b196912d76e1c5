use crate::models::Quote;
use crate::quotes::QuoteSource;
use crate::registry::SubscriptionRegistry;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Symbols every tick covers, whether or not anyone subscribed to them.
pub const TRACKED_SYMBOLS: [&str; 8] = [
    "AAPL", "GOOGL", "MSFT", "AMZN", "TSLA", "NVDA", "META", "NFLX",
];

/// Server-push cadence for WebSocket subscribers.
pub const BROADCAST_PERIOD: Duration = Duration::from_secs(10);

/// Cadence of the local snapshot refresh that keeps portfolio valuation
/// current independently of the broadcast loop.
pub const REFRESH_PERIOD: Duration = Duration::from_secs(3);

/// Latest quote per symbol. A newer quote for a symbol supersedes the old
/// one; nothing is ever removed.
#[derive(Clone, Default)]
pub struct PriceBook {
    inner: Arc<RwLock<HashMap<String, Quote>>>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn apply(&self, batch: &[Quote]) {
        let mut book = self.inner.write().await;
        for quote in batch {
            book.insert(quote.symbol.clone(), quote.clone());
        }
    }

    /// Symbol → latest price, the shape `valuate` consumes.
    pub async fn latest_prices(&self) -> HashMap<String, f64> {
        self.inner
            .read()
            .await
            .iter()
            .map(|(symbol, quote)| (symbol.clone(), quote.price))
            .collect()
    }

    pub async fn price(&self, symbol: &str) -> Option<f64> {
        self.inner.read().await.get(symbol).map(|q| q.price)
    }
}

/// Fetch one quote per symbol concurrently and keep the successes. A
/// failing symbol is logged and skipped; it must not block the others or
/// abort the cycle.
async fn fetch_batch(source: &dyn QuoteSource, symbols: &[String]) -> Vec<Quote> {
    let fetches = symbols.iter().map(|symbol| async move {
        match source.latest_quote(symbol).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                tracing::warn!("skipping {} this cycle: {}", symbol, e);
                None
            }
        }
    });
    join_all(fetches).await.into_iter().flatten().collect()
}

/// Handle to a running tick loop. Dropping it leaves the loop running;
/// `stop` shuts it down and waits for the task to finish.
pub struct LoopHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl LoopHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("tick loop did not shut down cleanly: {}", e);
        }
    }
}

fn spawn_tick_loop<F, Fut>(period: Duration, mut on_tick: F) -> LoopHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => on_tick().await,
            }
        }
    });
    LoopHandle { shutdown, task }
}

/// Periodically assembles a quote batch for the tracked symbols and
/// publishes it to WebSocket subscribers. Runs until stopped; per-symbol
/// failures never terminate it.
pub struct Broadcaster {
    source: Arc<dyn QuoteSource>,
    registry: Arc<SubscriptionRegistry>,
    book: PriceBook,
    symbols: Vec<String>,
    period: Duration,
}

impl Broadcaster {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        registry: Arc<SubscriptionRegistry>,
        book: PriceBook,
    ) -> Self {
        Broadcaster {
            source,
            registry,
            book,
            symbols: TRACKED_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            period: BROADCAST_PERIOD,
        }
    }

    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn start(self) -> LoopHandle {
        let Broadcaster {
            source,
            registry,
            book,
            symbols,
            period,
        } = self;
        tracing::info!(
            "broadcaster started: {} symbols every {:?}",
            symbols.len(),
            period
        );
        spawn_tick_loop(period, move || {
            let source = source.clone();
            let registry = registry.clone();
            let book = book.clone();
            let symbols = symbols.clone();
            async move {
                let batch = fetch_batch(source.as_ref(), &symbols).await;
                if batch.is_empty() {
                    // Zero successes this cycle: nothing to publish.
                    tracing::debug!("no quotes this cycle");
                    return;
                }
                book.apply(&batch).await;
                let delivered = registry.publish(&batch).await;
                tracing::debug!(
                    "published {} quotes to {} connections",
                    batch.len(),
                    delivered
                );
            }
        })
    }
}

/// The client-local fallback tick of the original dashboard: refreshes the
/// price book on its own (faster) timer so portfolio valuation stays fresh
/// even with zero subscribers.
pub struct SnapshotRefresher {
    source: Arc<dyn QuoteSource>,
    book: PriceBook,
    symbols: Vec<String>,
    period: Duration,
}

impl SnapshotRefresher {
    pub fn new(source: Arc<dyn QuoteSource>, book: PriceBook) -> Self {
        SnapshotRefresher {
            source,
            book,
            symbols: TRACKED_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            period: REFRESH_PERIOD,
        }
    }

    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn start(self) -> LoopHandle {
        let SnapshotRefresher {
            source,
            book,
            symbols,
            period,
        } = self;
        tracing::info!("snapshot refresher started: every {:?}", period);
        spawn_tick_loop(period, move || {
            let source = source.clone();
            let book = book.clone();
            let symbols = symbols.clone();
            async move {
                let batch = fetch_batch(source.as_ref(), &symbols).await;
                if !batch.is_empty() {
                    book.apply(&batch).await;
                }
            }
        })
    }
}
