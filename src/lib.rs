//! Client for the Wappalyzer technology lookup API.
//!
//! [`LookupClient::analyze`] validates the target URLs, queries the API and
//! returns its JSON with icon filenames expanded into full image URLs.

pub mod config;
pub mod lookup;
pub mod models;

pub use config::{ConfigError, LookupConfig};
pub use lookup::{LookupClient, LookupError};
pub use models::{LookupRequest, LookupResult, Targets};
