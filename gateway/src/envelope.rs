//! Classification and truncation of upstream response bodies.
//!
//! Upstreams return rows in one of three top-level shapes:
//!
//! - **Bare**: the body is the row array itself.
//! - **Wrapped items**: `{"items": [...]}`.
//! - **Wrapped content**: `{"content": [...], ...paging metadata}`.
//!
//! Some upstreams put one of these inside a `{"success", "data", "status"}`
//! wrapper, so a top-level `data` field is unwrapped before classification.
//! Anything else is unrenderable and yields no rows.

use crate::template::EffectivePageSize;
use serde_json::Value;

/// Row floor for the wrapped items shape. Smaller pages are not useful downstream.
pub const ITEMS_MIN_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Bare(Vec<Value>),
    WrappedItems(Vec<Value>),
    WrappedContent(Vec<Value>),
}

impl Envelope {
    /// Detects the envelope shape. Priority: array, then `items`, then `content`.
    pub fn classify(value: Value) -> Option<Self> {
        match unwrap_data(value) {
            Value::Array(rows) => Some(Envelope::Bare(rows)),
            Value::Object(mut map) => {
                if let Some(Value::Array(rows)) = map.remove("items") {
                    return Some(Envelope::WrappedItems(rows));
                }
                if let Some(Value::Array(rows)) = map.remove("content") {
                    return Some(Envelope::WrappedContent(rows));
                }
                None
            }
            _ => None,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Envelope::Bare(_) => "bare",
            Envelope::WrappedItems(_) => "items",
            Envelope::WrappedContent(_) => "content",
        }
    }

    /// Applies the size bound and returns the rows.
    ///
    /// Items upstreams ignore size hints, so that shape is always clamped to
    /// `max(page_size, ITEMS_MIN_PAGE_SIZE)`. Bare and content shapes are
    /// clamped to `page_size` only when the upstream never saw the hint.
    pub fn into_rows(self, page_size: EffectivePageSize, has_placeholder: bool) -> Vec<Value> {
        match self {
            Envelope::WrappedItems(mut rows) => {
                rows.truncate(page_size.get().max(ITEMS_MIN_PAGE_SIZE));
                rows
            }
            Envelope::Bare(mut rows) | Envelope::WrappedContent(mut rows) => {
                if !has_placeholder {
                    rows.truncate(page_size.get());
                }
                rows
            }
        }
    }
}

fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(inner) => inner,
            None => Value::Object(map),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({ "id": i })).collect()
    }

    fn page(n: i64) -> EffectivePageSize {
        EffectivePageSize::resolve(Some(n), 10)
    }

    #[test]
    fn test_classify_shapes() {
        assert_eq!(
            Envelope::classify(json!([1, 2])),
            Some(Envelope::Bare(vec![json!(1), json!(2)]))
        );
        assert_eq!(
            Envelope::classify(json!({"items": [1], "total": 9})),
            Some(Envelope::WrappedItems(vec![json!(1)]))
        );
        assert_eq!(
            Envelope::classify(json!({"content": [1], "totalElements": 9})),
            Some(Envelope::WrappedContent(vec![json!(1)]))
        );
    }

    #[test]
    fn test_items_take_priority_over_content() {
        let envelope = Envelope::classify(json!({"content": [1, 2], "items": [3]})).unwrap();
        assert_eq!(envelope, Envelope::WrappedItems(vec![json!(3)]));
    }

    #[test]
    fn test_non_array_fields_fall_through() {
        let envelope = Envelope::classify(json!({"items": "nope", "content": [1]})).unwrap();
        assert_eq!(envelope.kind(), "content");

        assert_eq!(Envelope::classify(json!({"items": {"a": 1}})), None);
    }

    #[test]
    fn test_unwraps_data_field() {
        let body = json!({"success": true, "status": 200, "data": {"content": [1, 2, 3]}});
        assert_eq!(
            Envelope::classify(body),
            Some(Envelope::WrappedContent(vec![json!(1), json!(2), json!(3)]))
        );

        let body = json!({"success": true, "data": [1]});
        assert_eq!(Envelope::classify(body), Some(Envelope::Bare(vec![json!(1)])));
    }

    #[test]
    fn test_data_is_unwrapped_once() {
        assert_eq!(Envelope::classify(json!({"data": {"data": [1]}})), None);
        assert_eq!(Envelope::classify(json!({"data": null, "items": [1]})), None);
    }

    #[test]
    fn test_unrecognized_shapes() {
        for value in [
            json!(null),
            json!(42),
            json!("rows"),
            json!(true),
            json!({}),
            json!({"results": [1, 2]}),
        ] {
            assert_eq!(Envelope::classify(value), None);
        }
    }

    #[test]
    fn test_bare_truncation_without_placeholder() {
        for n in [0, 1, 5, 7, 30] {
            for size in [1, 5, 10, 25] {
                let result = Envelope::Bare(rows(n)).into_rows(page(size), false);
                assert_eq!(result.len(), n.min(size as usize));
            }
        }
    }

    #[test]
    fn test_bare_and_content_pass_through_with_placeholder() {
        for n in [0, 3, 7, 50] {
            assert_eq!(Envelope::Bare(rows(n)).into_rows(page(5), true).len(), n);
            assert_eq!(
                Envelope::WrappedContent(rows(n)).into_rows(page(5), true).len(),
                n
            );
        }
    }

    #[test]
    fn test_content_truncation_without_placeholder() {
        let result = Envelope::WrappedContent(rows(12)).into_rows(page(4), false);
        assert_eq!(result, rows(4));
    }

    #[test]
    fn test_items_clamp_with_floor() {
        for has_placeholder in [true, false] {
            for n in [0, 10, 20, 45] {
                for size in [1, 3, 20, 30] {
                    let result =
                        Envelope::WrappedItems(rows(n)).into_rows(page(size), has_placeholder);
                    assert_eq!(
                        result.len(),
                        n.min((size as usize).max(ITEMS_MIN_PAGE_SIZE))
                    );
                }
            }
        }
    }

    #[test]
    fn test_truncation_keeps_order() {
        let result = Envelope::Bare(rows(10)).into_rows(page(3), false);
        assert_eq!(result, vec![json!({"id": 0}), json!({"id": 1}), json!({"id": 2})]);
    }
}
