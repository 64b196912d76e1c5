pub mod alpha_vantage;
pub mod factory;
pub mod fallback;
pub mod mock;
pub mod source;

pub use alpha_vantage::AlphaVantageSource;
pub use factory::source_from_env;
pub use fallback::FallbackSource;
pub use mock::MockQuoteSource;
pub use source::{QuoteError, QuoteSource};
