use serde::{Deserialize, Serialize};

use crate::errors::{ApiError, FieldError};
use crate::store::{ListQuery, SortField, SortSpec, DEFAULT_PAGE_SIZE};

/// Raw listing query parameters as they arrive on the wire.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    pub sort: Option<String>,
}

impl ListParams {
    /// Normalizes into a store query, collecting every bad parameter into
    /// one validation failure.
    pub fn into_query(self) -> Result<ListQuery, ApiError> {
        let mut errors = Vec::new();

        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit < 1 {
            errors.push(FieldError::new("limit", "limit must be a positive integer"));
        }
        let skip = self.skip.unwrap_or(0);
        if skip < 0 {
            errors.push(FieldError::new("skip", "skip must not be negative"));
        }

        let sort = match self.sort.as_deref() {
            None | Some("") => None,
            Some(raw) => {
                let (field, ascending) = match raw.strip_prefix('-') {
                    Some(rest) => (rest, false),
                    None => (raw, true),
                };
                match SortField::parse(field) {
                    Some(field) => Some(SortSpec { field, ascending }),
                    None => {
                        errors.push(FieldError::new("sort", format!("cannot sort by {field}")));
                        None
                    }
                }
            }
        };

        if !errors.is_empty() {
            return Err(ApiError::validation(errors));
        }
        Ok(ListQuery {
            category: self.category,
            limit,
            skip,
            sort,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    pub first: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    pub last: String,
}

pub fn number_of_pages(total: u64, limit: i64) -> u64 {
    total.div_ceil(limit.max(1) as u64)
}

/// Navigation URLs for a paged listing; a pure function of the base URL,
/// the current query, and the total match count.
pub fn page_links(base_url: &str, query: &ListQuery, total: u64) -> PageLinks {
    let limit = query.limit.max(1);
    let pages = number_of_pages(total, limit);
    let last_skip = if pages == 0 {
        0
    } else {
        (pages as i64 - 1) * limit
    };

    let url = |skip: i64| {
        let mut params = Vec::new();
        if let Some(category) = &query.category {
            params.push(format!("category={}", urlencoding::encode(category)));
        }
        if let Some(sort) = query.sort {
            let direction = if sort.ascending { "" } else { "-" };
            params.push(format!("sort={direction}{}", sort.field.key()));
        }
        params.push(format!("limit={limit}"));
        params.push(format!("skip={skip}"));
        format!("{base_url}?{}", params.join("&"))
    };

    PageLinks {
        first: url(0),
        prev: (query.skip > 0).then(|| url((query.skip - limit).max(0))),
        next: (query.skip + limit < total as i64).then(|| url(query.skip + limit)),
        last: url(last_skip),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_of_pages_rounds_up() {
        assert_eq!(number_of_pages(5, 2), 3);
        assert_eq!(number_of_pages(4, 2), 2);
        assert_eq!(number_of_pages(1, 10), 1);
        assert_eq!(number_of_pages(0, 10), 0);
    }

    #[test]
    fn defaults_are_applied() {
        let query = ListParams::default().into_query().expect("defaults are valid");
        assert_eq!(query.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(query.skip, 0);
        assert!(query.sort.is_none());
        assert!(query.category.is_none());
    }

    #[test]
    fn bad_limit_and_bad_sort_are_collected_together() {
        let params = ListParams {
            limit: Some(0),
            sort: Some("priciness".to_string()),
            ..ListParams::default()
        };
        match params.into_query().unwrap_err() {
            ApiError::Validation(list) => {
                let fields: Vec<_> = list.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, ["limit", "sort"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn descending_sort_is_parsed() {
        let params = ListParams {
            sort: Some("-price".to_string()),
            ..ListParams::default()
        };
        let query = params.into_query().expect("sort is valid");
        let sort = query.sort.expect("sort present");
        assert_eq!(sort.field, SortField::Price);
        assert!(!sort.ascending);
    }

    #[test]
    fn links_navigate_middle_page() {
        let query = ListQuery {
            category: Some("office chairs".to_string()),
            limit: 2,
            skip: 2,
            sort: Some(SortSpec {
                field: SortField::Price,
                ascending: false,
            }),
        };
        let links = page_links("http://localhost:3420/products", &query, 5);
        assert_eq!(
            links.first,
            "http://localhost:3420/products?category=office%20chairs&sort=-price&limit=2&skip=0"
        );
        assert_eq!(
            links.prev.as_deref(),
            Some("http://localhost:3420/products?category=office%20chairs&sort=-price&limit=2&skip=0")
        );
        assert_eq!(
            links.next.as_deref(),
            Some("http://localhost:3420/products?category=office%20chairs&sort=-price&limit=2&skip=4")
        );
        assert_eq!(
            links.last,
            "http://localhost:3420/products?category=office%20chairs&sort=-price&limit=2&skip=4"
        );
    }

    #[test]
    fn first_and_last_page_drop_prev_and_next() {
        let query = ListQuery {
            limit: 2,
            skip: 0,
            ..ListQuery::default()
        };
        let links = page_links("http://localhost:3420/products", &query, 5);
        assert!(links.prev.is_none());
        assert!(links.next.is_some());

        let last_page = ListQuery {
            limit: 2,
            skip: 4,
            ..ListQuery::default()
        };
        let links = page_links("http://localhost:3420/products", &last_page, 5);
        assert!(links.prev.is_some());
        assert!(links.next.is_none());
    }

    #[test]
    fn empty_listing_still_links_to_itself() {
        let links = page_links("http://localhost:3420/products", &ListQuery::default(), 0);
        assert_eq!(links.first, links.last);
        assert!(links.prev.is_none());
        assert!(links.next.is_none());
    }
}
