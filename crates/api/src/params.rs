//! Query string parameters and their validation.
//!
//! Every field arrives as text so that malformed input is reported as
//! `invalid_query` with a precise message. All validation happens here,
//! before any store access.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use tally_core::error::{DomainError, DomainResult};
use tally_core::models::{CursorCodec, Identifier, ValueCodec};
use tally_core::ports::{
    CategoryFilter, CategorySelection, Direction, PaginationQuery, SubjectFilter,
    TransactionFilter, YearFilter,
};

/// Default page size for pagination.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Maximum page size for pagination.
pub const MAX_PAGE_SIZE: u32 = 100;
/// Maximum length for string filter parameters.
const MAX_FILTER_STRING_LENGTH: usize = 128;
/// Maximum number of category ids in one transaction filter.
const MAX_CATEGORY_IDS: usize = 50;
/// Longest excerpt of user input echoed in an error message.
const MAX_ECHO_LENGTH: usize = 40;

const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// Page size policy applied to every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Page size used when `count` is absent.
    pub default: u32,
    /// Larger counts are lowered to this.
    pub max: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default: DEFAULT_PAGE_SIZE,
            max: MAX_PAGE_SIZE,
        }
    }
}

impl PageLimits {
    /// Build limits, forcing `1 <= default <= max`.
    pub fn new(default: u32, max: u32) -> Self {
        let max = max.max(1);
        Self {
            default: default.clamp(1, max),
            max,
        }
    }
}

fn invalid(message: impl Into<String>) -> DomainError {
    DomainError::InvalidQuery(message.into())
}

fn echo(raw: &str) -> &str {
    match raw.char_indices().nth(MAX_ECHO_LENGTH) {
        Some((end, _)) => &raw[..end],
        None => raw,
    }
}

fn validate_filter_string<'a>(value: &'a str, field_name: &str) -> DomainResult<&'a str> {
    if value.is_empty() {
        return Err(invalid(format!("{} cannot be empty", field_name)));
    }
    if value.chars().count() > MAX_FILTER_STRING_LENGTH {
        return Err(invalid(format!(
            "{} too long: maximum {} characters allowed",
            field_name, MAX_FILTER_STRING_LENGTH
        )));
    }
    // Postgres refuses NUL in text parameters.
    if value.chars().any(char::is_control) {
        return Err(invalid(format!(
            "{} cannot contain control characters",
            field_name
        )));
    }
    Ok(value)
}

fn parse_bool(raw: &str, field_name: &str) -> DomainResult<bool> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(invalid(format!(
            "{} must be true or false, got {:?}",
            field_name,
            echo(other)
        ))),
    }
}

fn parse_date(raw: &str, field_name: &str) -> DomainResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        invalid(format!(
            "{} must be a YYYY-MM-DD date, got {:?}",
            field_name,
            echo(raw)
        ))
    })
}

/// A required amount in major units.
fn parse_amount(raw: Option<&str>, field_name: &str) -> DomainResult<Decimal> {
    let raw = raw.ok_or_else(|| invalid(format!("subject=value requires {}", field_name)))?;
    Decimal::from_str(raw.trim()).map_err(|_| {
        invalid(format!(
            "{} must be a decimal amount, got {:?}",
            field_name,
            echo(raw)
        ))
    })
}

// =============================================================================
// Pagination
// =============================================================================

/// `direction`, `count` and `target`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub direction: Option<String>,
    pub count: Option<String>,
    pub target: Option<String>,
}

impl PageParams {
    /// Validate into a pagination query under the given limits.
    pub fn to_query(&self, limits: PageLimits) -> DomainResult<PaginationQuery> {
        let direction = match self.direction.as_deref() {
            None | Some("forward") => Direction::Forward,
            Some("backward") => Direction::Backward,
            Some(other) => {
                return Err(invalid(format!(
                    "direction must be forward or backward, got {:?}",
                    echo(other)
                )));
            }
        };

        let count = match self.count.as_deref() {
            None => i64::from(limits.default),
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
                invalid(format!("count must be an integer, got {:?}", echo(raw)))
            })?,
        };

        let target = self
            .target
            .as_deref()
            .map(CursorCodec::parse)
            .transpose()?;

        PaginationQuery::new(direction, count.min(i64::from(limits.max)), target)
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Filters of `GET /categories`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryParams {
    pub search: Option<String>,
    pub meta: Option<String>,
}

impl CategoryParams {
    /// An empty `search` is treated as absent.
    pub fn into_filter(self, owner_id: Identifier) -> DomainResult<CategoryFilter> {
        let search = self.search.filter(|search| !search.is_empty());
        if let Some(search) = &search {
            validate_filter_string(search, "search")?;
        }
        let is_meta = self
            .meta
            .as_deref()
            .map(|raw| parse_bool(raw, "meta"))
            .transpose()?;

        Ok(CategoryFilter {
            owner_id,
            search,
            is_meta,
        })
    }
}

/// Filters of `GET /transactions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionParams {
    /// `all`, `search` or `value`.
    pub subject: Option<String>,
    pub search: Option<String>,
    /// Inclusive lower value bound, in major units.
    pub min: Option<String>,
    /// Inclusive upper value bound, in major units.
    pub max: Option<String>,
    /// `all`, `uncategorized` or a comma separated list of category ids.
    pub categories: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl TransactionParams {
    pub fn into_filter(self, owner_id: Identifier) -> DomainResult<TransactionFilter> {
        let subject = self.subject()?;
        let categories = self.categories()?;

        let date_from = self
            .from
            .as_deref()
            .map(|raw| parse_date(raw, "from"))
            .transpose()?;
        let date_to = self
            .to
            .as_deref()
            .map(|raw| parse_date(raw, "to"))
            .transpose()?;
        if let (Some(from), Some(to)) = (date_from, date_to) {
            if from > to {
                return Err(invalid(format!("from ({}) is after to ({})", from, to)));
            }
        }

        Ok(TransactionFilter {
            owner_id,
            subject,
            categories,
            date_from,
            date_to,
        })
    }

    fn subject(&self) -> DomainResult<SubjectFilter> {
        match self.subject.as_deref() {
            None | Some("all") => Ok(SubjectFilter::All),
            Some("search") => {
                let search = self
                    .search
                    .as_deref()
                    .ok_or_else(|| invalid("subject=search requires search"))?;
                let search = validate_filter_string(search, "search")?;
                Ok(SubjectFilter::Search(search.to_string()))
            }
            Some("value") => {
                let min = parse_amount(self.min.as_deref(), "min")?;
                let max = parse_amount(self.max.as_deref(), "max")?;
                if min > max {
                    return Err(invalid(format!("min ({}) is greater than max ({})", min, max)));
                }
                Ok(SubjectFilter::ValueRange {
                    min: ValueCodec::to_minor_units(min)?,
                    max: ValueCodec::to_minor_units(max)?,
                })
            }
            Some(other) => Err(invalid(format!(
                "subject must be all, search or value, got {:?}",
                echo(other)
            ))),
        }
    }

    fn categories(&self) -> DomainResult<CategorySelection> {
        match self.categories.as_deref() {
            None | Some("all") => Ok(CategorySelection::All),
            Some("uncategorized") => Ok(CategorySelection::Uncategorized),
            Some(list) => {
                let ids = list
                    .split(',')
                    .map(|raw| {
                        CursorCodec::parse(raw.trim()).map_err(|_| {
                            invalid(format!("invalid category id {:?}", echo(raw)))
                        })
                    })
                    .collect::<DomainResult<Vec<_>>>()?;
                if ids.len() > MAX_CATEGORY_IDS {
                    return Err(invalid(format!(
                        "categories: maximum {} ids allowed",
                        MAX_CATEGORY_IDS
                    )));
                }
                Ok(CategorySelection::Only(ids))
            }
        }
    }
}

/// The `year` of budget and rollup endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YearParams {
    pub year: Option<String>,
}

impl YearParams {
    pub fn into_filter(self, owner_id: Identifier) -> DomainResult<YearFilter> {
        let raw = self.year.ok_or_else(|| invalid("year is required"))?;
        let year = raw
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|year| (MIN_YEAR..=MAX_YEAR).contains(year))
            .ok_or_else(|| {
                invalid(format!(
                    "year must be between {} and {}, got {:?}",
                    MIN_YEAR,
                    MAX_YEAR,
                    echo(&raw)
                ))
            })?;

        Ok(YearFilter { owner_id, year })
    }
}
