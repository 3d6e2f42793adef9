use sheetswitch_core::model::{EntryNode, GroupNode, NodeRef, TreeModel};
use sheetswitch_core::settings::UNCATEGORIZED_GROUP;
use sheetswitch_core::tree_ops::{
    apply_drop, create_group, delete_group, rename_group, DropOutcome, GroupOpError,
};

fn entry(title: &str, handle: isize) -> EntryNode {
    EntryNode {
        title: title.to_string(),
        handle,
    }
}

fn sample_tree() -> TreeModel {
    TreeModel {
        groups: vec![
            GroupNode {
                name: UNCATEGORIZED_GROUP.to_string(),
                entries: vec![entry("Scratch.xlsx", 1)],
            },
            GroupNode {
                name: "Reports".to_string(),
                entries: vec![entry("Q1 Report.xlsx", 2), entry("Q2 Report.xlsx", 3)],
            },
            GroupNode {
                name: "Budgets".to_string(),
                entries: vec![entry("Budget.xlsx", 4)],
            },
        ],
    }
}

#[test]
fn deleting_a_group_moves_children_to_uncategorized() {
    let mut tree = sample_tree();

    let moved = delete_group(&mut tree, 1).expect("delete should succeed");

    assert_eq!(moved, 2);
    assert!(tree.group_position("Reports").is_none());
    let reserved = &tree.groups[tree.group_position(UNCATEGORIZED_GROUP).unwrap()];
    assert_eq!(reserved.entries.len(), 3);
    assert_eq!(reserved.entries[1].title, "Q1 Report.xlsx");
    assert_eq!(reserved.entries[2].title, "Q2 Report.xlsx");
}

#[test]
fn deleting_the_reserved_group_is_blocked() {
    let mut tree = sample_tree();
    let result = delete_group(&mut tree, 0);
    assert_eq!(result, Err(GroupOpError::ReservedGroup));
    assert_eq!(tree, sample_tree());
}

#[test]
fn delete_recreates_uncategorized_when_absent() {
    let mut tree = TreeModel {
        groups: vec![GroupNode {
            name: "Reports".to_string(),
            entries: vec![entry("Q1 Report.xlsx", 2)],
        }],
    };

    let moved = delete_group(&mut tree, 0).expect("delete should succeed");

    assert_eq!(moved, 1);
    assert_eq!(tree.groups.len(), 1);
    assert_eq!(tree.groups[0].name, UNCATEGORIZED_GROUP);
    assert_eq!(tree.groups[0].entries.len(), 1);
}

#[test]
fn reserved_group_stays_unique_after_load_rebuild_and_delete() {
    let mut tree = sample_tree();
    delete_group(&mut tree, 2).expect("delete should succeed");
    let count = tree
        .groups
        .iter()
        .filter(|group| group.name == UNCATEGORIZED_GROUP)
        .count();
    assert_eq!(count, 1);
}

#[test]
fn renaming_the_reserved_group_is_blocked() {
    let mut tree = sample_tree();
    assert_eq!(
        rename_group(&mut tree, 0, "Misc"),
        Err(GroupOpError::ReservedGroup)
    );
}

#[test]
fn renaming_to_an_existing_name_is_blocked() {
    let mut tree = sample_tree();
    assert_eq!(
        rename_group(&mut tree, 1, "Budgets"),
        Err(GroupOpError::DuplicateName("Budgets".to_string()))
    );
}

#[test]
fn renaming_to_its_own_name_is_allowed() {
    let mut tree = sample_tree();
    rename_group(&mut tree, 1, "Reports").expect("same-name rename should succeed");
}

#[test]
fn created_groups_append_at_the_end() {
    let mut tree = sample_tree();
    let index = create_group(&mut tree, "Archive").expect("create should succeed");
    assert_eq!(index, 3);
    assert_eq!(tree.groups[3].name, "Archive");
    assert!(tree.groups[3].entries.is_empty());
}

#[test]
fn creating_a_duplicate_group_is_blocked() {
    let mut tree = sample_tree();
    assert_eq!(
        create_group(&mut tree, "Reports"),
        Err(GroupOpError::DuplicateName("Reports".to_string()))
    );
}

#[test]
fn dropping_an_entry_on_a_group_appends_it_there() {
    let mut tree = sample_tree();

    let outcome = apply_drop(
        &mut tree,
        NodeRef::Entry { group: 1, entry: 0 },
        Some(NodeRef::Group(2)),
    );

    assert_eq!(outcome, DropOutcome::EntryMoved { group: 2 });
    assert_eq!(tree.groups[1].entries.len(), 1);
    assert_eq!(tree.groups[2].entries.len(), 2);
    assert_eq!(tree.groups[2].entries[1].title, "Q1 Report.xlsx");
}

#[test]
fn dropping_an_entry_on_an_entry_targets_its_parent_group() {
    let mut tree = sample_tree();

    let outcome = apply_drop(
        &mut tree,
        NodeRef::Entry { group: 2, entry: 0 },
        Some(NodeRef::Entry { group: 1, entry: 1 }),
    );

    assert_eq!(outcome, DropOutcome::EntryMoved { group: 1 });
    assert!(tree.groups[2].entries.is_empty());
    assert_eq!(tree.groups[1].entries[2].title, "Budget.xlsx");
}

#[test]
fn dropping_an_entry_on_empty_space_is_ignored() {
    let mut tree = sample_tree();
    let before = tree.clone();

    let outcome = apply_drop(&mut tree, NodeRef::Entry { group: 1, entry: 0 }, None);

    assert_eq!(outcome, DropOutcome::Ignored);
    assert_eq!(tree, before);
}

#[test]
fn dropping_a_group_reorders_the_group_list() {
    let mut tree = sample_tree();

    let outcome = apply_drop(&mut tree, NodeRef::Group(2), Some(NodeRef::Group(0)));

    assert_eq!(outcome, DropOutcome::GroupReordered { from: 2, to: 0 });
    assert_eq!(tree.groups[0].name, "Budgets");
    assert_eq!(tree.groups[1].name, UNCATEGORIZED_GROUP);
    assert_eq!(tree.groups[2].name, "Reports");
}

#[test]
fn dropping_a_group_on_empty_space_moves_it_last() {
    let mut tree = sample_tree();

    let outcome = apply_drop(&mut tree, NodeRef::Group(0), None);

    assert_eq!(outcome, DropOutcome::GroupReordered { from: 0, to: 2 });
    assert_eq!(tree.groups[2].name, UNCATEGORIZED_GROUP);
}

#[test]
fn dropping_a_group_on_itself_is_ignored() {
    let mut tree = sample_tree();
    let before = tree.clone();

    let outcome = apply_drop(&mut tree, NodeRef::Group(1), Some(NodeRef::Group(1)));

    assert_eq!(outcome, DropOutcome::Ignored);
    assert_eq!(tree, before);
}

#[test]
fn dropping_a_group_on_an_entry_targets_the_entry_parent_position() {
    let mut tree = sample_tree();

    let outcome = apply_drop(
        &mut tree,
        NodeRef::Group(2),
        Some(NodeRef::Entry { group: 0, entry: 0 }),
    );

    assert_eq!(outcome, DropOutcome::GroupReordered { from: 2, to: 0 });
    assert_eq!(tree.groups[0].name, "Budgets");
}

#[test]
fn stale_drop_references_are_ignored() {
    let mut tree = sample_tree();
    let before = tree.clone();

    assert_eq!(
        apply_drop(&mut tree, NodeRef::Group(9), Some(NodeRef::Group(0))),
        DropOutcome::Ignored
    );
    assert_eq!(
        apply_drop(
            &mut tree,
            NodeRef::Entry { group: 1, entry: 9 },
            Some(NodeRef::Group(0))
        ),
        DropOutcome::Ignored
    );
    assert_eq!(tree, before);
}
