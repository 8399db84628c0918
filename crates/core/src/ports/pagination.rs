//! Pagination types for list queries.
//!
//! These types implement keyset pagination with a Relay-style envelope:
//! a page of `{cursor, node}` edges plus a [`PageInfo`] block. Every
//! collection uses the same envelope, and edges are always returned in
//! ascending order whatever the query direction.

use std::num::NonZeroU32;

use serde::Serialize;

use crate::error::{DomainError, DomainResult};
use crate::models::{Identified, Identifier};

/// Traversal direction of a pagination query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    /// Towards larger sort keys (the next page).
    #[default]
    Forward,
    /// Towards smaller sort keys (the previous page).
    Backward,
}

impl Direction {
    /// Lowercase name, as used on the wire and in metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        }
    }
}

/// Ordering direction of a store scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl From<Direction> for OrderDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Forward => Self::Asc,
            Direction::Backward => Self::Desc,
        }
    }
}

/// A validated pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationQuery {
    pub direction: Direction,
    /// Maximum number of edges in the page.
    pub count: NonZeroU32,
    /// Cursor to page away from. `None` starts from the edge of the set.
    pub target: Option<Identifier>,
}

impl PaginationQuery {
    /// Build a query, rejecting non-positive or oversized counts.
    pub fn new(direction: Direction, count: i64, target: Option<Identifier>) -> DomainResult<Self> {
        let count = u32::try_from(count)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| {
                DomainError::InvalidQuery(format!("count must be a positive integer, got {}", count))
            })?;

        Ok(Self {
            direction,
            count,
            target,
        })
    }

    /// First page of a forward traversal.
    pub fn first(count: NonZeroU32) -> Self {
        Self {
            direction: Direction::Forward,
            count,
            target: None,
        }
    }

    /// Page size as a `usize`.
    pub fn page_size(&self) -> usize {
        self.count.get() as usize
    }
}

/// Information about the current page in a paginated result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    /// Size of the whole filtered set, not of the page.
    pub total_count: u64,
    /// Cursor of the first edge, `None` iff the page is empty.
    pub start_cursor: Option<Identifier>,
    /// Cursor of the last edge, `None` iff the page is empty.
    pub end_cursor: Option<Identifier>,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

/// A single item in a paginated result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge<T> {
    /// Always the node's identifier.
    pub cursor: Identifier,
    pub node: T,
}

/// Paginated result set with edges and page info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationResponse<T> {
    pub page_info: PageInfo,
    pub edges: Vec<Edge<T>>,
}

impl<T> PaginationResponse<T> {
    /// Convert every node, keeping cursors and page info untouched.
    pub fn map_nodes<U>(self, mut f: impl FnMut(T) -> U) -> PaginationResponse<U> {
        PaginationResponse {
            page_info: self.page_info,
            edges: self
                .edges
                .into_iter()
                .map(|edge| Edge {
                    cursor: edge.cursor,
                    node: f(edge.node),
                })
                .collect(),
        }
    }

    /// The nodes of the page, in edge order.
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|edge| &edge.node)
    }
}

/// Compute page info for a trimmed, ascending page.
///
/// `over_fetched` tells whether more rows exist beyond the page in the
/// direction of travel. The flag for the opposite side is set when the
/// query was anchored on a resolved target, since the target itself lies
/// on that side.
pub fn build_page_info<T: Identified>(
    page: &[T],
    over_fetched: bool,
    direction: Direction,
    target_resolved: bool,
    total_count: u64,
) -> PageInfo {
    if page.is_empty() {
        return PageInfo {
            total_count,
            start_cursor: None,
            end_cursor: None,
            has_previous_page: false,
            has_next_page: false,
        };
    }

    let (has_previous_page, has_next_page) = match direction {
        Direction::Forward => (target_resolved, over_fetched),
        Direction::Backward => (over_fetched, target_resolved),
    };

    PageInfo {
        total_count,
        start_cursor: page.first().map(Identified::id),
        end_cursor: page.last().map(Identified::id),
        has_previous_page,
        has_next_page,
    }
}

/// Wrap rows as edges keyed by their identifiers.
pub fn assemble<T: Identified>(rows: Vec<T>, page_info: PageInfo) -> PaginationResponse<T> {
    PaginationResponse {
        page_info,
        edges: rows
            .into_iter()
            .map(|node| Edge {
                cursor: node.id(),
                node,
            })
            .collect(),
    }
}
