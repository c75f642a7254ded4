//! Recursive expander: turns IDs found in confirmed JSON responses into
//! child candidates one level deeper.
//!
//! A response qualifies when it is a JSON array, or an object with
//! array-valued fields (e.g. `{"items": [...]}`). Identifier fields are read
//! from the objects that are elements of those arrays. The walk is
//! iterative and bounded by depth and node count.
//!
//! IDs under a field that names a resource (`{"journeys": [{"id": 2}]}` at
//! `/api/projects/1`) yield both `/api/projects/1/2` and
//! `/api/projects/1/journeys/2`. Envelope fields such as `items` or `data`
//! only yield the first form.

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::VecDeque;
use tracing::debug;

use crate::generator::PatternGenerator;
use crate::types::candidate::Candidate;
use crate::types::config::{DiscoveryConfig, ExpansionLimits};
use crate::types::probe::ProbeResult;

#[derive(Debug, Clone)]
pub struct RecursiveExpander {
    max_depth: usize,
    limits: ExpansionLimits,
}

impl RecursiveExpander {
    pub fn new(max_depth: usize, limits: ExpansionLimits) -> Self {
        Self { max_depth, limits }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(config.max_depth, config.expansion.clone())
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Child candidates for one probe result.
    ///
    /// Empty unless the result is confirmed, its depth is below `max_depth`,
    /// and its body parses as JSON containing ID-bearing array elements.
    pub fn expand(&self, result: &ProbeResult, generator: &PatternGenerator) -> Vec<Candidate> {
        if !result.is_confirmed() {
            return Vec::new();
        }

        let depth = result.candidate.source_depth();
        if depth >= self.max_depth {
            return Vec::new();
        }

        let Some(body) = result.body_sample.as_deref() else {
            return Vec::new();
        };

        // A truncated body usually fails to parse; that just means no children
        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => {
                debug!(path = %result.candidate.path(), error = %e, "Confirmed body is not JSON, not expanding");
                return Vec::new();
            }
        };

        let found = self.walk(&value);
        if found.is_empty() {
            return Vec::new();
        }

        debug!(path = %result.candidate.path(), ids = found.len(), depth = depth + 1, "Expanding");

        let path = result.candidate.path();
        found
            .into_iter()
            .flat_map(|(id, field)| {
                let mut children = generator.child_candidates(path, id, depth + 1);
                if let Some(field) = field.filter(|f| self.names_resource(f)) {
                    let nested = format!("{}/{}", path.trim_end_matches('/'), field);
                    children.extend(generator.child_candidates(&nested, id, depth + 1));
                }
                children
            })
            .collect()
    }

    /// Integer-looking IDs from array elements, in document order, deduplicated
    /// and capped at `max_ids_per_response`.
    pub fn extract_ids(&self, value: &Value) -> Vec<u64> {
        self.walk(value).into_keys().collect()
    }

    /// IDs paired with the name of the object field holding their array,
    /// `None` for a top-level array. The first field seen wins for an ID.
    fn walk<'v>(&self, value: &'v Value) -> IndexMap<u64, Option<&'v str>> {
        let limits = &self.limits;
        let mut found: IndexMap<u64, Option<&'v str>> = IndexMap::new();
        let mut queue: VecDeque<(&'v Value, Option<&'v str>, usize)> = VecDeque::new();
        let mut visited = 0usize;
        queue.push_back((value, None, 0));

        'walk: while let Some((node, field, level)) = queue.pop_front() {
            if visited >= limits.max_nodes || found.len() >= limits.max_ids_per_response {
                break;
            }
            visited += 1;

            match node {
                Value::Array(items) => {
                    for item in items {
                        // Every element counts, ID-bearing or not
                        if visited >= limits.max_nodes {
                            break 'walk;
                        }
                        visited += 1;

                        match item {
                            Value::Object(fields) => {
                                if let Some(id) = self.id_of(fields) {
                                    found.entry(id).or_insert(field);
                                    if found.len() >= limits.max_ids_per_response {
                                        break 'walk;
                                    }
                                }
                            }
                            Value::Array(_) if level < limits.max_walk_depth => {
                                queue.push_back((item, field, level + 1));
                            }
                            _ => {}
                        }
                    }
                }
                // Wrapper object: look through its container-valued fields
                Value::Object(fields) if level < limits.max_walk_depth => {
                    for (name, child) in fields {
                        if child.is_array() || child.is_object() {
                            queue.push_back((child, Some(name.as_str()), level + 1));
                        }
                    }
                }
                _ => {}
            }
        }

        found
    }

    /// Field names usable as a path segment that are not listing envelopes.
    fn names_resource(&self, field: &str) -> bool {
        !field.is_empty()
            && field
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
            && !self.limits.is_wrapper_field(field)
    }

    fn id_of(&self, fields: &serde_json::Map<String, Value>) -> Option<u64> {
        self.limits
            .id_fields
            .iter()
            .find_map(|name| fields.get(name).and_then(integer_like))
    }
}

/// A non-negative integer, or a string of ASCII digits.
fn integer_like(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expander(max_depth: usize) -> RecursiveExpander {
        RecursiveExpander::new(max_depth, ExpansionLimits::default())
    }

    fn generator() -> PatternGenerator {
        PatternGenerator::from_config(&DiscoveryConfig::new("https://x").with_resource_stems(["project"]))
    }

    fn confirmed(path: &str, depth: usize, body: &str) -> ProbeResult {
        ProbeResult::from_response(
            Candidate::new(crate::types::candidate::Method::Get, path, depth),
            200,
            body.to_string(),
            Some("application/json".to_string()),
            false,
        )
    }

    #[test]
    fn test_top_level_array() {
        let children = expander(1).expand(&confirmed("/api/projects", 0, r#"[{"id":7}]"#), &generator());
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].path(), "/api/projects/7");
        assert_eq!(children[0].source_depth(), 1);
    }

    #[test]
    fn test_max_depth_zero_never_expands() {
        let children = expander(0).expand(&confirmed("/api/projects", 0, r#"[{"id":7}]"#), &generator());
        assert!(children.is_empty());
    }

    #[test]
    fn test_depth_limit_reached() {
        let children = expander(2).expand(&confirmed("/api/projects/7", 2, r#"[{"id":1}]"#), &generator());
        assert!(children.is_empty());
    }

    #[test]
    fn test_unconfirmed_not_expanded() {
        let not_found = ProbeResult::from_response(
            Candidate::get("/api/projects"),
            404,
            r#"[{"id":7}]"#.to_string(),
            None,
            false,
        );
        assert!(expander(3).expand(&not_found, &generator()).is_empty());
    }

    #[test]
    fn test_non_json_body() {
        let truncated = confirmed("/api/projects", 0, r#"[{"id":7},{"id":"#);
        assert!(expander(1).expand(&truncated, &generator()).is_empty());
    }

    #[test]
    fn test_wrapper_object() {
        let ids = expander(1).extract_ids(&json!({
            "total": 3,
            "items": [{"id": 1}, {"id": "22"}, {"name": "no id"}],
            "meta": {"page": {"id": 99}}
        }));
        assert_eq!(ids, vec![1, 22]);
    }

    #[test]
    fn test_nested_wrapper() {
        let ids = expander(1).extract_ids(&json!({"data": {"results": [{"id": 5}, {"id": 6}]}}));
        assert_eq!(ids, vec![5, 6]);
    }

    #[test]
    fn test_non_integer_ids_ignored() {
        let ids = expander(1).extract_ids(&json!([
            {"id": -3},
            {"id": 1.5},
            {"id": "abc"},
            {"id": "12a"},
            {"id": null},
            {"id": 4}
        ]));
        assert_eq!(ids, vec![4]);
    }

    #[test]
    fn test_duplicate_ids_collapse() {
        let ids = expander(1).extract_ids(&json!([{"id": 3}, {"id": "3"}, {"id": 3}]));
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_element_children_not_walked() {
        let ids = expander(1).extract_ids(&json!([{"id": 1, "steps": [{"id": 900}]}]));
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_id_cap() {
        let items: Vec<Value> = (0..100).map(|i| json!({ "id": i })).collect();
        let limited = RecursiveExpander::new(1, ExpansionLimits::default().with_max_ids(10));
        assert_eq!(limited.extract_ids(&Value::Array(items)), (0..10).collect::<Vec<u64>>());
    }

    #[test]
    fn test_deep_nesting_is_bounded() {
        let mut value = json!([{"id": 42}]);
        for _ in 0..200 {
            value = json!({ "wrap": value });
        }
        // Far below the nesting, so nothing is found, but the walk returns
        assert!(expander(1).extract_ids(&value).is_empty());

        let shallow = RecursiveExpander::new(1, ExpansionLimits::default().with_max_walk_depth(3));
        assert_eq!(shallow.extract_ids(&json!({"a": {"b": [{"id": 1}]}})), vec![1]);
        assert!(shallow.extract_ids(&json!({"a": {"b": {"c": {"d": [{"id": 1}]}}}})).is_empty());
    }

    #[test]
    fn test_custom_id_fields() {
        let custom = RecursiveExpander::new(1, ExpansionLimits::default().with_id_fields(["project_id", "id"]));
        assert_eq!(custom.extract_ids(&json!([{"project_id": 8, "id": 1}, {"id": 2}])), vec![8, 2]);
    }

    #[test]
    fn test_children_include_sub_resources() {
        let generator = PatternGenerator::from_config(
            &DiscoveryConfig::new("https://x")
                .with_resource_stems(["execution"])
                .with_sub_resources(["steps"]),
        );
        let children = expander(1).expand(&confirmed("/api/executions", 0, r#"{"items":[{"id":88715}]}"#), &generator);
        let paths: Vec<&str> = children.iter().map(|c| c.path()).collect();
        assert_eq!(paths, vec!["/api/executions/88715", "/api/executions/88715/steps"]);
    }

    #[test]
    fn test_node_cap_counts_every_element() {
        let items: Vec<Value> = (0..100).map(|i| json!({ "id": i })).collect();
        let limited = RecursiveExpander::new(
            1,
            ExpansionLimits::default().with_max_nodes(5).with_max_ids(1000),
        );
        // The array itself is one of the five nodes
        assert_eq!(limited.extract_ids(&Value::Array(items)), vec![0, 1, 2, 3]);

        let mut mixed: Vec<Value> = (0..50).map(|_| json!("filler")).collect();
        mixed.push(json!({"id": 7}));
        let capped = RecursiveExpander::new(1, ExpansionLimits::default().with_max_nodes(10));
        assert!(capped.extract_ids(&Value::Array(mixed)).is_empty());
    }

    #[test]
    fn test_named_field_adds_nested_children() {
        let children = expander(2).expand(
            &confirmed("/api/projects/1", 1, r#"{"journeys":[{"id":2}]}"#),
            &generator(),
        );
        let paths: Vec<&str> = children.iter().map(|c| c.path()).collect();
        assert_eq!(paths, vec!["/api/projects/1/2", "/api/projects/1/journeys/2"]);
        assert!(children.iter().all(|c| c.source_depth() == 2));
    }

    #[test]
    fn test_envelope_field_adds_no_nested_children() {
        let children = expander(1).expand(
            &confirmed("/api/projects", 0, r#"{"data":[{"id":4}],"meta":{"links":[{"id":9}]}}"#),
            &generator(),
        );
        let paths: Vec<&str> = children.iter().map(|c| c.path()).collect();
        assert_eq!(
            paths,
            vec!["/api/projects/4", "/api/projects/9", "/api/projects/links/9"]
        );
    }

    #[test]
    fn test_unsafe_field_name_not_used_as_segment() {
        let children = expander(1).expand(
            &confirmed("/api/projects", 0, r#"{"related items":[{"id":3}]}"#),
            &generator(),
        );
        let paths: Vec<&str> = children.iter().map(|c| c.path()).collect();
        assert_eq!(paths, vec!["/api/projects/3"]);
    }
}
