//! Siskin: rate-limit admission control as a service.
//!
//! Every decision is a single question: may this client perform one more
//! unit of work right now? The answer comes from one of five algorithms
//! (fixed window, sliding window log, sliding window counter, token bucket,
//! leaky bucket), all of which keep their state in a [`store::CounterStore`]
//! shared across server instances.
pub mod api;
pub mod cli;
pub mod error;
pub mod limiters;
pub mod settings;
pub mod store;
