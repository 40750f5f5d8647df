//! Integration tests.
//!
//! `mock_feed` holds the scripted transports; `pipeline` drives full scan
//! cycles into SQLite; `http_adapters` checks the HTTP clients against a
//! local mock server.

mod http_adapters;
mod mock_feed;
mod pipeline;
