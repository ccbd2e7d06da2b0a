//! Paging and sorting request model.
//!
//! # Invariants
//! - `Pageable` accepts any value at construction; the page slicer rejects
//!   `page < 1` or `page_size < 1` before touching the store.
//! - Sort entries keep caller order; earlier entries take precedence.

use crate::repo::{RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Page size used when a request does not name one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

static SORT_ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-)?([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)(?::([A-Za-z]+))?$")
        .expect("valid sort entry regex")
});

/// 1-based page number plus page size. Missing fields deserialize to the
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pageable {
    pub page: u32,
    pub page_size: u32,
}

impl Pageable {
    pub const fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }
}

impl Default for Pageable {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Ordering on one dotted field path, e.g. `address.city`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Ordered list of sort specs. Empty means "leave unordered".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sortable(Vec<SortSpec>);

impl Sortable {
    pub fn unsorted() -> Self {
        Self::default()
    }

    /// Appends a lower-precedence sort entry.
    pub fn then(mut self, spec: SortSpec) -> Self {
        self.0.push(spec);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn specs(&self) -> &[SortSpec] {
        &self.0
    }

    /// Parses a `sortBy` parameter such as `"lastName,-address.city,age:desc"`.
    ///
    /// Entries are comma separated. A leading `-` or a `:desc` suffix sorts
    /// descending; `:asc` or no marker sorts ascending. Blank entries are
    /// skipped.
    ///
    /// # Errors
    /// - `InvalidSortField` for malformed entries or unknown direction words.
    pub fn parse(sort_by: &str) -> RepoResult<Self> {
        let mut specs = Vec::new();
        for raw in sort_by.split(',') {
            let entry = raw.trim();
            if entry.is_empty() {
                continue;
            }
            specs.push(parse_entry(entry)?);
        }
        Ok(Self(specs))
    }
}

impl From<Vec<SortSpec>> for Sortable {
    fn from(value: Vec<SortSpec>) -> Self {
        Self(value)
    }
}

impl FromIterator<SortSpec> for Sortable {
    fn from_iter<I: IntoIterator<Item = SortSpec>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn parse_entry(entry: &str) -> RepoResult<SortSpec> {
    let invalid = |reason: String| RepoError::InvalidSortField {
        field: entry.to_string(),
        reason,
    };

    let captures = SORT_ENTRY_RE
        .captures(entry)
        .ok_or_else(|| invalid("expected `field`, `-field` or `field:asc|desc`".to_string()))?;
    let negated = captures.get(1).is_some();
    let field = captures
        .get(2)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let direction = match captures.get(3).map(|m| m.as_str().to_ascii_lowercase()) {
        None if negated => SortDirection::Desc,
        None => SortDirection::Asc,
        Some(_) if negated => {
            return Err(invalid(
                "`-` prefix cannot be combined with a direction suffix".to_string(),
            ))
        }
        Some(word) if word == "asc" => SortDirection::Asc,
        Some(word) if word == "desc" => SortDirection::Desc,
        Some(word) => return Err(invalid(format!("unknown sort direction `{word}`"))),
    };

    Ok(SortSpec { field, direction })
}

/// Paging window plus ordering, as received from the resource layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortablePageRequest {
    #[serde(flatten)]
    pub pageable: Pageable,
    #[serde(default)]
    pub sort: Sortable,
}

impl SortablePageRequest {
    pub fn new(pageable: Pageable, sort: Sortable) -> Self {
        Self { pageable, sort }
    }

    /// Unsorted request for one page.
    pub fn page(page: u32, page_size: u32) -> Self {
        Self::new(Pageable::new(page, page_size), Sortable::unsorted())
    }

    pub fn sorted_by(mut self, spec: SortSpec) -> Self {
        self.sort = self.sort.then(spec);
        self
    }

    /// Builds a request from raw `page`, `pageSize` and `sortBy` parameters.
    ///
    /// Missing `page` means 1, missing `pageSize` means [`DEFAULT_PAGE_SIZE`].
    /// Explicit zero values are kept so the page slicer can reject them.
    pub fn from_params(
        page: Option<u32>,
        page_size: Option<u32>,
        sort_by: Option<&str>,
    ) -> RepoResult<Self> {
        let pageable = Pageable::new(page.unwrap_or(1), page_size.unwrap_or(DEFAULT_PAGE_SIZE));
        let sort = match sort_by {
            Some(raw) => Sortable::parse(raw)?,
            None => Sortable::unsorted(),
        };
        Ok(Self::new(pageable, sort))
    }
}
