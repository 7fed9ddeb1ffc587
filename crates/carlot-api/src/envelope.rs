// Wire envelopes shared by every endpoint.
//
// Single records come back as `{"data": {...}}`, collections as
// `{"data": [...], "pagination": {...}}`, failures as
// `{"message": "...", "errors": {"field": "reason"}}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `{"data": T}`
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

/// `{"data": [T], "pagination": {...}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ListEnvelope<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

/// Server-side paging information for a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u32,
}

/// One page of a collection plus its paging information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// A single page holding every item, for endpoints that don't paginate.
    pub fn unpaged(items: Vec<T>) -> Self {
        let total = u64::try_from(items.len()).unwrap_or(u64::MAX);
        Self {
            pagination: Pagination {
                page: 1,
                limit: u32::try_from(items.len()).unwrap_or(u32::MAX),
                total,
                pages: 1,
            },
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> From<ListEnvelope<T>> for Page<T> {
    fn from(env: ListEnvelope<T>) -> Self {
        match env.pagination {
            Some(pagination) => Self {
                items: env.data,
                pagination,
            },
            None => Self::unpaged(env.data),
        }
    }
}
