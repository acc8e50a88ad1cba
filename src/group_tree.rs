//! The group forest behind `groupFields`.
//!
//! Groups arrive as flat `(id, groupId)` pairs. [`GroupTree::build`] indexes
//! them once, rejecting duplicate ids, dangling parent or field references
//! and parent cycles, so the recursive encoders can walk children without
//! any risk of looping.
//!
//! ```text
//! groupFields: [{id:1, logic:OR}, {id:2, logic:AND, groupId:1}, {id:3, logic:AND NOT, groupId:1}]
//!
//!   1 (OR) ── fields of 1
//!    ├─ 2 (AND) ── fields of 2
//!    └─ 3 (AND NOT) ── fields of 3
//! ```

use crate::descriptor::{FilterField, GroupField, GroupId};
use crate::error::EncodeError;
use crate::LOG_TARGET;
use std::collections::HashMap;

#[derive(Debug)]
pub struct GroupTree<'a> {
    /// Groups in declaration order
    groups: &'a [GroupField],
    index: HashMap<&'a GroupId, usize>,
    /// Child positions per parent id, in declaration order
    children: HashMap<&'a GroupId, Vec<usize>>,
    /// Fields per owning group, in declaration order
    fields: HashMap<&'a GroupId, Vec<&'a FilterField>>,
}

impl<'a> GroupTree<'a> {
    pub fn build(groups: &'a [GroupField], fields: &'a [FilterField]) -> Result<Self, EncodeError> {
        let mut index = HashMap::with_capacity(groups.len());
        for (position, group) in groups.iter().enumerate() {
            if index.insert(&group.id, position).is_some() {
                return Err(EncodeError::DuplicateGroup {
                    id: group.id.to_string(),
                });
            }
        }

        let mut children: HashMap<&GroupId, Vec<usize>> = HashMap::new();
        for (position, group) in groups.iter().enumerate() {
            if let Some(parent) = &group.group_id {
                if !index.contains_key(parent) {
                    return Err(EncodeError::UnknownGroup {
                        owner: format!("group {}", group.id),
                        group: parent.to_string(),
                    });
                }
                children.entry(parent).or_default().push(position);
            }
        }

        let mut owned: HashMap<&GroupId, Vec<&FilterField>> = HashMap::new();
        for field in fields {
            match &field.group_id {
                Some(group) if index.contains_key(group) => {
                    owned.entry(group).or_default().push(field)
                }
                Some(group) => {
                    return Err(EncodeError::UnknownGroup {
                        owner: field.attribute.clone(),
                        group: group.to_string(),
                    })
                }
                None => tracing::warn!(
                    target: LOG_TARGET,
                    attribute = %field.attribute,
                    "field without group ignored"
                ),
            }
        }

        let tree = Self {
            groups,
            index,
            children,
            fields: owned,
        };
        tree.check_acyclic()?;
        Ok(tree)
    }

    /// Walks every parent chain; a chain longer than the number of groups
    /// must revisit a group.
    fn check_acyclic(&self) -> Result<(), EncodeError> {
        for group in self.groups {
            let mut current = group;
            let mut steps = 0;
            while let Some(parent) = &current.group_id {
                steps += 1;
                if steps > self.groups.len() {
                    return Err(EncodeError::GroupCycle {
                        id: group.id.to_string(),
                    });
                }
                current = &self.groups[self.index[parent]];
            }
        }
        Ok(())
    }

    /// The group the attribute filter is rendered from: the first declared one.
    pub fn root(&self) -> Option<&'a GroupField> {
        self.groups.first()
    }

    pub fn children(&self, group: &GroupField) -> impl Iterator<Item = &'a GroupField> + '_ {
        let groups = self.groups;
        self.children
            .get(&group.id)
            .into_iter()
            .flatten()
            .map(move |&position| &groups[position])
    }

    pub fn fields(&self, group: &GroupField) -> &[&'a FilterField] {
        self.fields.get(&group.id).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn groups(value: serde_json::Value) -> Vec<GroupField> {
        serde_json::from_value(value).unwrap()
    }

    fn fields(value: serde_json::Value) -> Vec<FilterField> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_children_follow_declaration_order() {
        let groups = groups(json!([
            {"id": 1, "logic": "OR"},
            {"id": 3, "logic": "AND", "groupId": 1},
            {"id": 2, "logic": "AND NOT", "groupId": 1},
            {"id": 4, "logic": "AND", "groupId": 2}
        ]));
        let tree = GroupTree::build(&groups, &[]).unwrap();
        let root = tree.root().unwrap();
        let ids: Vec<_> = tree.children(root).map(|g| g.id.0.as_str()).collect();
        assert_eq!(ids, ["3", "2"]);
        let second = tree.children(root).nth(1).unwrap();
        let grandchildren: Vec<_> = tree.children(second).map(|g| g.id.0.as_str()).collect();
        assert_eq!(grandchildren, ["4"]);
    }

    #[test]
    fn test_fields_are_attached_to_their_group() {
        let groups = groups(json!([{"id": 1, "logic": "OR"}, {"id": 2, "logic": "AND", "groupId": 1}]));
        let fields = fields(json!([
            {"attribute": "A", "operator": "=", "type": "string", "value": "x", "groupId": 2},
            {"attribute": "B", "operator": "=", "type": "string", "value": "y", "groupId": 1},
            {"attribute": "C", "operator": "=", "type": "string", "value": "z"}
        ]));
        let tree = GroupTree::build(&groups, &fields).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(tree.fields(root).len(), 1);
        assert_eq!(tree.fields(root)[0].attribute, "B");
        let child = tree.children(root).next().unwrap();
        assert_eq!(tree.fields(child)[0].attribute, "A");
    }

    #[test]
    fn test_unknown_field_group_is_rejected() {
        let groups = groups(json!([{"id": 1, "logic": "OR"}]));
        let fields = fields(json!([
            {"attribute": "A", "operator": "=", "type": "string", "value": "x", "groupId": 9}
        ]));
        let err = GroupTree::build(&groups, &fields).unwrap_err();
        assert!(matches!(err, EncodeError::UnknownGroup { ref group, .. } if group == "9"));
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let groups = groups(json!([{"id": 1, "logic": "OR", "groupId": 5}]));
        assert!(matches!(
            GroupTree::build(&groups, &[]),
            Err(EncodeError::UnknownGroup { .. })
        ));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let groups = groups(json!([
            {"id": 1, "logic": "OR", "groupId": 2},
            {"id": 2, "logic": "AND", "groupId": 1}
        ]));
        assert!(matches!(
            GroupTree::build(&groups, &[]),
            Err(EncodeError::GroupCycle { .. })
        ));

        let self_loop = groups_self_loop();
        assert!(matches!(
            GroupTree::build(&self_loop, &[]),
            Err(EncodeError::GroupCycle { .. })
        ));
    }

    fn groups_self_loop() -> Vec<GroupField> {
        groups(json!([{"id": "a", "logic": "AND", "groupId": "a"}]))
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let groups = groups(json!([{"id": 1, "logic": "OR"}, {"id": "1", "logic": "AND"}]));
        assert!(matches!(
            GroupTree::build(&groups, &[]),
            Err(EncodeError::DuplicateGroup { .. })
        ));
    }
}
