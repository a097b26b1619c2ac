pub mod client;
pub mod fetcher;

pub use client::{AlphaVantageClient, Quote, QuoteSource};
pub use fetcher::{run_poll_loop, spawn_fetch_cycle};
