//! Core domain layer for the Tally finance tracker.
//!
//! This crate contains the domain models, port traits (interfaces), and
//! the pagination service shared by every listing. It follows hexagonal
//! architecture principles - this is the innermost layer with no
//! dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      tally (binary)                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │         tally-api            │        tally-storage         │
//! │      (HTTP, JSON DTOs)       │        (PostgreSQL)          │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │                      tally-core  ← YOU ARE HERE             │
//! │               (models, ports, services)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Entities, identifiers ([`models::CursorCodec`]) and money
//!   normalization ([`models::ValueCodec`])
//! - [`ports`] - Pagination envelope and the keyset source traits
//! - [`services`] - The pagination resolver
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Pagination
//!
//! Each listing is a [`ports::KeysetSource`]. [`services::paginate`]
//! resolves a [`ports::PaginationQuery`] against it:
//!
//! 1. Locate the target cursor's sort key inside the filtered set
//! 2. Fetch `count + 1` rows past it, and count the filtered set
//! 3. Restore ascending order and trim the over-fetched row
//! 4. Build [`ports::PageInfo`] and wrap rows as `{cursor, node}` edges

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;
