use crate::model::{GroupNode, NodeRef, TreeModel};
use crate::settings::UNCATEGORIZED_GROUP;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOpError {
    /// The reserved "Uncategorized" group cannot be renamed or deleted.
    ReservedGroup,
    DuplicateName(String),
    UnknownNode,
}

impl std::fmt::Display for GroupOpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReservedGroup => write!(
                f,
                "The \"{UNCATEGORIZED_GROUP}\" group cannot be renamed or deleted."
            ),
            Self::DuplicateName(name) => {
                write!(f, "A group named \"{name}\" already exists.")
            }
            Self::UnknownNode => write!(f, "The selected item no longer exists."),
        }
    }
}

impl std::error::Error for GroupOpError {}

/// What a drop did to the tree. `Ignored` drops must not trigger a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    GroupReordered { from: usize, to: usize },
    /// Entry appended to this group; the shell expands it after re-render.
    EntryMoved { group: usize },
    Ignored,
}

pub fn is_reserved(tree: &TreeModel, group: usize) -> bool {
    tree.groups
        .get(group)
        .map(|g| g.name == UNCATEGORIZED_GROUP)
        .unwrap_or(false)
}

/// Appends a new empty group and returns its index.
pub fn create_group(tree: &mut TreeModel, name: &str) -> Result<usize, GroupOpError> {
    if tree.group_position(name).is_some() {
        return Err(GroupOpError::DuplicateName(name.to_string()));
    }
    tree.groups.push(GroupNode {
        name: name.to_string(),
        entries: Vec::new(),
    });
    Ok(tree.groups.len() - 1)
}

pub fn rename_group(
    tree: &mut TreeModel,
    group: usize,
    new_name: &str,
) -> Result<(), GroupOpError> {
    if group >= tree.groups.len() {
        return Err(GroupOpError::UnknownNode);
    }
    if is_reserved(tree, group) {
        return Err(GroupOpError::ReservedGroup);
    }
    if tree
        .group_position(new_name)
        .is_some_and(|existing| existing != group)
    {
        return Err(GroupOpError::DuplicateName(new_name.to_string()));
    }
    tree.groups[group].name = new_name.to_string();
    Ok(())
}

/// Removes a group after moving all of its entries to "Uncategorized"
/// (created at position 0 when the tree lacks it). Returns how many entries
/// moved.
pub fn delete_group(tree: &mut TreeModel, group: usize) -> Result<usize, GroupOpError> {
    if group >= tree.groups.len() {
        return Err(GroupOpError::UnknownNode);
    }
    if is_reserved(tree, group) {
        return Err(GroupOpError::ReservedGroup);
    }

    let mut group = group;
    let reserved = match tree.group_position(UNCATEGORIZED_GROUP) {
        Some(position) => position,
        None => {
            tree.groups.insert(
                0,
                GroupNode {
                    name: UNCATEGORIZED_GROUP.to_string(),
                    entries: Vec::new(),
                },
            );
            group += 1;
            0
        }
    };

    let entries = std::mem::take(&mut tree.groups[group].entries);
    let moved = entries.len();
    tree.groups[reserved].entries.extend(entries);
    tree.groups.remove(group);
    Ok(moved)
}

/// Applies a drag-drop. Group headers reorder the group list: the dragged
/// group is removed, then inserted at the captured target position (a drop on
/// an entry targets its parent group; no target appends at the end). Entries
/// move into the target group, appended last; an entry dropped on empty space
/// is ignored.
pub fn apply_drop(
    tree: &mut TreeModel,
    dragged: NodeRef,
    target: Option<NodeRef>,
) -> DropOutcome {
    match dragged {
        NodeRef::Group(from) => {
            if from >= tree.groups.len() {
                return DropOutcome::Ignored;
            }
            let to = match target {
                Some(node) => node.group_index(),
                None => tree.groups.len(),
            };
            if to > tree.groups.len() {
                return DropOutcome::Ignored;
            }
            let node = tree.groups.remove(from);
            let to = to.min(tree.groups.len());
            if to == from {
                tree.groups.insert(from, node);
                return DropOutcome::Ignored;
            }
            tree.groups.insert(to, node);
            DropOutcome::GroupReordered { from, to }
        }
        NodeRef::Entry { group, entry } => {
            let Some(node) = target else {
                return DropOutcome::Ignored;
            };
            let to = node.group_index();
            if to >= tree.groups.len() || tree.entry(group, entry).is_none() {
                return DropOutcome::Ignored;
            }
            let moved = tree.groups[group].entries.remove(entry);
            tree.groups[to].entries.push(moved);
            DropOutcome::EntryMoved { group: to }
        }
    }
}
