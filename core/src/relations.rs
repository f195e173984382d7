//! Relationship helpers over already-fetched resources.

use std::collections::HashSet;

use tracing::warn;

use crate::types::{Category, RelatedPointer, Resource, ResourceType};

/// Find the resource `pointer` names in `pool`.
///
/// A missing pointer and a pointer with no match both give `None`.
pub fn resolve_related<'a>(
    pointer: Option<&RelatedPointer>,
    pool: &'a [Resource],
) -> Option<&'a Resource> {
    let pointer = pointer?;
    pool.iter().find(|resource| resource.matches(pointer))
}

/// Ids of `category` and all of its descendants in `all`, depth-first
/// pre-order, siblings in the order they appear in `all`.
///
/// The starting id always comes first, even if `category` is not in `all`.
/// Parent cycles are cut: an id is emitted at most once.
pub fn collect_category_ids(category: &Category, all: &[Category]) -> Vec<String> {
    let mut ids = vec![category.id.clone()];
    let mut seen: HashSet<&str> = HashSet::from([category.id.as_str()]);
    collect_children(&category.id, all, &mut ids, &mut seen);
    ids
}

fn collect_children<'a>(
    parent_id: &str,
    all: &'a [Category],
    ids: &mut Vec<String>,
    seen: &mut HashSet<&'a str>,
) {
    for child in all.iter().filter(|c| is_child_of(c, parent_id)) {
        if !seen.insert(child.id.as_str()) {
            warn!(
                category = %child.id,
                parent = %parent_id,
                "category tree: parent cycle detected, skipping"
            );
            continue;
        }
        ids.push(child.id.clone());
        collect_children(&child.id, all, ids, seen);
    }
}

fn is_child_of(category: &Category, parent_id: &str) -> bool {
    category
        .parent()
        .is_some_and(|p| p.kind == ResourceType::Category && p.id == parent_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoryAttributes, Relationship, RelationshipData};
    use serde_json::{json, Map};

    fn category(id: &str, parent: Option<&str>) -> Category {
        let mut relationships = crate::types::Relationships::new();
        relationships.insert(
            "parentCategory".to_string(),
            Relationship {
                data: parent.map(|p| {
                    RelationshipData::One(RelatedPointer::new(p, ResourceType::Category))
                }),
            },
        );
        Category {
            id: id.to_string(),
            attributes: CategoryAttributes {
                name: format!("Category {id}"),
                path: format!("/c/{id}"),
                slug: format!("c-{id}"),
                extra: Map::new(),
            },
            relationships,
        }
    }

    // 1 <- 2 <- 3, 4;  1 <- 5;  6 <- 7
    fn forest() -> Vec<Category> {
        vec![
            category("1", None),
            category("2", Some("1")),
            category("3", Some("2")),
            category("4", Some("2")),
            category("5", Some("1")),
            category("6", None),
            category("7", Some("6")),
        ]
    }

    #[test]
    fn subtree_of_inner_node() {
        let all = forest();
        assert_eq!(collect_category_ids(&all[1], &all), ["2", "3", "4"]);
    }

    #[test]
    fn subtree_of_root_is_pre_order() {
        let all = forest();
        assert_eq!(collect_category_ids(&all[0], &all), ["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn leaf_is_a_singleton() {
        let all = forest();
        assert_eq!(collect_category_ids(&all[6], &all), ["7"]);
    }

    #[test]
    fn absent_category_is_a_singleton() {
        let all = forest();
        let missing = category("999", None);
        assert_eq!(collect_category_ids(&missing, &all), ["999"]);
    }

    #[test]
    fn sibling_order_follows_input() {
        let all = vec![
            category("10", None),
            category("13", Some("10")),
            category("11", Some("10")),
            category("12", Some("11")),
        ];
        assert_eq!(collect_category_ids(&all[0], &all), ["10", "13", "11", "12"]);
    }

    #[test]
    fn parent_cycle_terminates() {
        let all = vec![category("1", Some("2")), category("2", Some("1"))];
        assert_eq!(collect_category_ids(&all[0], &all), ["1", "2"]);
    }

    #[test]
    fn resolve_finds_matching_identity() {
        let pool: Vec<Resource> = serde_json::from_value(json!([
            {"id": "1", "type": "author", "attributes": {"name": "Ada"}},
            {"id": "1", "type": "term", "attributes": {"name": "rust"}},
        ]))
        .unwrap();
        let pointer = RelatedPointer::new("1", ResourceType::Term);
        let found = resolve_related(Some(&pointer), &pool).unwrap();
        assert_eq!(found.kind(), ResourceType::Term);
    }

    #[test]
    fn resolve_misses_are_none() {
        let pool: Vec<Resource> = serde_json::from_value(json!([
            {"id": "1", "type": "author", "attributes": {}},
        ]))
        .unwrap();
        assert!(resolve_related(None, &pool).is_none());
        let wrong_type = RelatedPointer::new("1", ResourceType::Post);
        assert!(resolve_related(Some(&wrong_type), &pool).is_none());
        let wrong_id = RelatedPointer::new("2", ResourceType::Author);
        assert!(resolve_related(Some(&wrong_id), &pool).is_none());
    }
}
