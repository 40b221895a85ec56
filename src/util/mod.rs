//! Utility functions shared by the fetcher and the parsers.
//!
//! - **URL validation**: shape checks for IPTV source URLs
//! - **URL suffix matching**: used by parsers to recognize `.m3u` / `.txt` sources
//!
//! # Examples
//!
//! ```
//! use iptv_catalog::util::{url_path_has_suffix, validate_source_url};
//!
//! let url = validate_source_url("https://example.com/live.m3u").unwrap();
//! assert!(url_path_has_suffix(url.as_str(), &[".m3u", ".m3u8"]));
//! ```

mod url_validator;

pub use url_validator::{url_path_has_suffix, validate_source_url, UrlValidationError};
