use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Zero-based page of `limit` rows. Construct through [`Pagination::new`] so
/// the offset arithmetic never sees a non-positive limit or a negative page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    limit: i64,
    page: i64,
}

impl Pagination {
    pub fn new(limit: i64, page: i64) -> Result<Self> {
        if limit <= 0 {
            return Err(Error::validation(
                "limit",
                format!("must be greater than zero, got {limit}"),
            ));
        }
        if page < 0 {
            return Err(Error::validation(
                "page",
                format!("must not be negative, got {page}"),
            ));
        }
        page.checked_mul(limit)
            .ok_or_else(|| Error::validation("page", "offset overflows"))?;
        Ok(Self { limit, page })
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn offset(&self) -> i64 {
        self.page * self.limit
    }
}

/// Row order for chat listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatSort {
    #[default]
    LastActive,
    Name,
}

impl ChatSort {
    pub(crate) fn order_by(&self) -> &'static str {
        match self {
            // jid breaks ties so pages never overlap
            Self::LastActive => "c.last_message_time DESC, c.jid ASC",
            Self::Name => "c.name ASC, c.jid ASC",
        }
    }
}

impl FromStr for ChatSort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "last_active" => Ok(Self::LastActive),
            "name" => Ok(Self::Name),
            other => Err(Error::validation(
                "sort_by",
                format!("expected \"name\" or \"last_active\", got {other:?}"),
            )),
        }
    }
}

/// Newest first; message id breaks timestamp ties.
pub(crate) const MESSAGE_ORDER: &str = "m.timestamp DESC, m.id DESC";

/// Validate a context-window size. Zero is allowed and yields an empty side.
pub(crate) fn context_count(field: &'static str, count: i64) -> Result<i64> {
    if count < 0 {
        return Err(Error::validation(
            field,
            format!("must not be negative, got {count}"),
        ));
    }
    Ok(count)
}
