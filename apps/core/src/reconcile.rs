use crate::model::{EntryNode, GroupNode, LiveWindow, TreeModel};
use crate::settings::{GroupData, GroupSettings, UNCATEGORIZED_GROUP};

/// Matches remembered fragments against live windows and produces the display
/// tree. Matching is greedy and order-dependent: groups in settings order,
/// fragments in list order, each fragment claiming the first unclaimed window
/// whose title contains it. Leftover windows land in "Uncategorized", which
/// is created at position 0 when the settings lack it.
pub fn rebuild_tree(settings: &GroupSettings, live: &[LiveWindow]) -> TreeModel {
    let mut pool: Vec<LiveWindow> = live.to_vec();
    let mut groups = Vec::with_capacity(settings.groups.len());

    for group in &settings.groups {
        let mut entries = Vec::new();
        for fragment in &group.files {
            if let Some(position) = pool
                .iter()
                .position(|window| window.title.contains(fragment.as_str()))
            {
                let window = pool.remove(position);
                entries.push(EntryNode {
                    title: window.title,
                    handle: window.handle,
                });
            }
        }
        groups.push(GroupNode {
            name: group.name.clone(),
            entries,
        });
    }

    let mut tree = TreeModel { groups };
    if !pool.is_empty() {
        let position = match tree.group_position(UNCATEGORIZED_GROUP) {
            Some(position) => position,
            None => {
                tree.groups.insert(
                    0,
                    GroupNode {
                        name: UNCATEGORIZED_GROUP.to_string(),
                        entries: Vec::new(),
                    },
                );
                0
            }
        };
        for window in pool {
            tree.groups[position].entries.push(EntryNode {
                title: window.title,
                handle: window.handle,
            });
        }
    }

    tree
}

/// Projects the displayed tree back into the persisted shape. Entry titles
/// become the remembered fragments, so fragments whose windows are gone drop
/// out on the next save.
pub fn flatten(tree: &TreeModel) -> GroupSettings {
    GroupSettings {
        groups: tree
            .groups
            .iter()
            .map(|group| GroupData {
                name: group.name.clone(),
                files: group
                    .entries
                    .iter()
                    .map(|entry| entry.title.clone())
                    .collect(),
            })
            .collect(),
    }
}
