//! Remote source retrieval.
//!
//! A single HTTP GET per call through an injected `reqwest::Client`; every
//! failure is folded into one [`FetchError`] whose source carries the
//! technical [`FetchCause`].

mod fetcher;

pub use fetcher::{
    fetch_source, FetchCause, FetchError, DEFAULT_FETCH_TIMEOUT, MAX_SOURCE_SIZE,
};
