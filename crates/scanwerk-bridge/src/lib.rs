// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk — capability bridges.
//
// The decode pipeline consumes three external collaborators through narrow
// traits: a rasterizer for paginated documents, a fetcher for remote sources,
// and the single-shot code decoder. This crate defines those traits, the
// stub implementations for builds that lack a capability, and the default
// implementations enabled by feature flags.

pub mod stub;
pub mod traits;

#[cfg(feature = "http")]
pub mod fetch;

#[cfg(feature = "rqrr")]
pub mod decoder;

pub use traits::{Decoder, FetchedResource, Fetcher, RasterDocument, Rasterizer};

#[cfg(feature = "http")]
pub use fetch::{HttpFetcher, HttpFetcherConfig};

#[cfg(feature = "rqrr")]
pub use decoder::RqrrDecoder;

/// The fetcher this build supports.
///
/// RETURNS: the reqwest-backed [`HttpFetcher`] when the `http` feature is on,
/// otherwise a stub that refuses every URL.
pub fn default_fetcher() -> Box<dyn Fetcher> {
    #[cfg(feature = "http")]
    {
        match HttpFetcher::new(HttpFetcherConfig::default()) {
            Ok(fetcher) => Box::new(fetcher),
            Err(err) => {
                tracing::warn!(%err, "HTTP client unavailable, falling back to stub fetcher");
                Box::new(stub::UnavailableFetcher)
            }
        }
    }
    #[cfg(not(feature = "http"))]
    {
        Box::new(stub::UnavailableFetcher)
    }
}
