//! Read options for `get_entities` and their query-string encoding.
//!
//! Filters and orders are opaque strings in the backend's mini-language
//! (`field:op:value`, `field:asc`); they are transported verbatim.

use std::num::NonZeroU32;

use url::form_urlencoded;

/// Filtering, ordering and pagination for a `get_entities` read.
///
/// A limit of zero cannot be expressed: `limit(0)` means "not provided".
/// An offset is sent whenever one was set, including `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetEntitiesOptions {
    pub filters: Vec<String>,
    pub orders: Vec<String>,
    pub limit: Option<NonZeroU32>,
    pub offset: Option<u32>,
}

impl GetEntitiesOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.orders.push(order.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = NonZeroU32::new(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Encode as a URL query string (no leading `?`).
    ///
    /// Parameters appear as every `filter`, every `order`, then `limit` and
    /// `offset`. No options yield an empty string.
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for filter in &self.filters {
            serializer.append_pair("filter", filter);
        }
        for order in &self.orders {
            serializer.append_pair("order", order);
        }
        if let Some(limit) = self.limit {
            serializer.append_pair("limit", &limit.to_string());
        }
        if let Some(offset) = self.offset {
            serializer.append_pair("offset", &offset.to_string());
        }
        serializer.finish()
    }
}
