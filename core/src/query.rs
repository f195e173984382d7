//! Query-string encoding for endpoint dispatch.
//!
//! Nested keys use bracket notation (`page[size]=10`), list values repeat
//! their key (`filter[terms3]=1&filter[terms3]=2`). Brackets stay literal;
//! every key segment and value is percent-encoded.

use crate::types::{Filter, FilterValue, Query};

const DOUBLE_ESCAPED_HASH: &str = "%2523";
const ESCAPED_HASH: &str = "%23";

/// Encode `query` as a leading-`?` query string; empty when there is
/// nothing to encode.
pub fn encode_query(query: Option<&Query>) -> String {
    let Some(query) = query else {
        return String::new();
    };

    let mut pairs: Vec<(String, String)> = Vec::new();

    if !query.include.is_empty() {
        pairs.push(("include".to_string(), query.include.join(",")));
    }
    if let Some(sort) = &query.sort {
        pairs.push(("sort".to_string(), sort.clone()));
    }
    if let Some(page) = &query.page {
        if let Some(size) = page.size {
            pairs.push(("page[size]".to_string(), size.to_string()));
        }
        if let Some(number) = page.number {
            pairs.push(("page[number]".to_string(), number.to_string()));
        }
    }
    push_filter(&mut pairs, "filter", &query.filter);

    if pairs.is_empty() {
        return String::new();
    }

    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    // A key that already carried an escaped hash gets escaped twice; the
    // server expects a single level.
    format!("?{}", joined.replace(DOUBLE_ESCAPED_HASH, ESCAPED_HASH))
}

fn push_filter(pairs: &mut Vec<(String, String)>, prefix: &str, filter: &Filter) {
    for (key, value) in filter.iter() {
        let name = format!("{prefix}[{}]", urlencoding::encode(key));
        match value {
            FilterValue::Scalar(v) => pairs.push((name, v.clone())),
            FilterValue::List(items) => {
                pairs.extend(items.iter().map(|v| (name.clone(), v.clone())));
            }
            FilterValue::Nested(inner) => push_filter(pairs, &name, inner),
        }
    }
}
