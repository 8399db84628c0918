//! JSON read API for Tally.
//!
//! Every listing shares the keyset pagination envelope:
//!
//! ```text
//! GET /transactions?direction=forward&count=20&target=<uuid>&subject=search&search=rent
//! { "page_info": { ... }, "edges": [ { "cursor": "<uuid>", "node": { ... } } ] }
//! ```
//!
//! Requests are scoped to the owner named by the `x-owner-id` header.
//! Amounts are returned in major units.
//!
//! ```ignore
//! let repositories = Arc::new(PgRepositories::new(&db));
//! tally_api::serve_with_shutdown(repositories, ServerConfig::default(), shutdown).await?;
//! ```

mod dto;
mod error;
mod extract;
mod params;
mod routes;
mod server;

pub use error::ApiError;
pub use extract::OWNER_HEADER;
pub use params::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use server::{ServerConfig, router, serve_with_shutdown};
