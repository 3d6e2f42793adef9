use std::time::{SystemTime, UNIX_EPOCH};

use sheetswitch_core::model::{LiveWindow, NodeRef};
use sheetswitch_core::reconcile::{flatten, rebuild_tree};
use sheetswitch_core::settings::{self, GroupData, GroupSettings, UNCATEGORIZED_GROUP};
use sheetswitch_core::tree_ops::{apply_drop, delete_group, DropOutcome};
use sheetswitch_core::window_tracker::{
    ActivationError, MockWindowProvider, WindowProvider, WindowTracker,
};

fn temp_settings_path(tag: &str) -> std::path::PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be valid")
        .as_nanos();
    std::env::temp_dir().join(format!("sheetswitch-flow-{tag}-{unique}/settings.json"))
}

#[test]
fn drag_then_save_then_reload_reproduces_the_displayed_tree() {
    let path = temp_settings_path("drag");
    let live = vec![
        LiveWindow::new(1, "Q1 Report.xlsx"),
        LiveWindow::new(2, "Misc.xlsx"),
    ];
    let persisted = GroupSettings {
        groups: vec![
            GroupData::named(UNCATEGORIZED_GROUP),
            GroupData {
                name: "Reports".to_string(),
                files: vec!["Q1".to_string()],
            },
        ],
    };

    let mut tree = rebuild_tree(&persisted, &live);
    // Move "Misc.xlsx" from Uncategorized into Reports.
    let outcome = apply_drop(
        &mut tree,
        NodeRef::Entry { group: 0, entry: 0 },
        Some(NodeRef::Group(1)),
    );
    assert_eq!(outcome, DropOutcome::EntryMoved { group: 1 });

    settings::save(&path, &flatten(&tree)).expect("save should succeed");

    let reloaded = settings::load(&path);
    let rebuilt = rebuild_tree(&reloaded, &live);

    assert_eq!(rebuilt, tree);
    assert_eq!(rebuilt.groups[1].entries.len(), 2);

    std::fs::remove_file(&path).expect("temp file should be removed");
}

#[test]
fn delete_survives_the_save_load_rebuild_cycle() {
    let path = temp_settings_path("delete");
    let live = vec![
        LiveWindow::new(1, "Q1 Report.xlsx"),
        LiveWindow::new(2, "Q2 Report.xlsx"),
    ];
    let persisted = GroupSettings {
        groups: vec![
            GroupData::named(UNCATEGORIZED_GROUP),
            GroupData {
                name: "Reports".to_string(),
                files: vec!["Q1".to_string(), "Q2".to_string()],
            },
        ],
    };

    let mut tree = rebuild_tree(&persisted, &live);
    let moved = delete_group(&mut tree, 1).expect("delete should succeed");
    assert_eq!(moved, 2);

    settings::save(&path, &flatten(&tree)).expect("save should succeed");
    let rebuilt = rebuild_tree(&settings::load(&path), &live);

    assert_eq!(rebuilt.groups.len(), 1);
    assert_eq!(rebuilt.groups[0].name, UNCATEGORIZED_GROUP);
    assert_eq!(rebuilt.groups[0].entries.len(), 2);

    std::fs::remove_file(&path).expect("temp file should be removed");
}

#[test]
fn activating_a_window_closed_since_last_poll_fails_without_touching_the_tree() {
    let mut provider = MockWindowProvider::with_windows(vec![
        LiveWindow::new(1, "Q1 Report.xlsx"),
        LiveWindow::new(2, "Misc.xlsx"),
    ]);
    let persisted = GroupSettings {
        groups: vec![GroupData::named(UNCATEGORIZED_GROUP)],
    };

    let mut tracker = WindowTracker::default();
    let live = provider.enumerate();
    assert!(tracker.observe(&live));
    let tree = rebuild_tree(&persisted, &live);

    // One window closes; the tick has not fired yet, so the tree still holds
    // its handle.
    provider.windows.retain(|window| window.handle != 2);
    let stale = tree.entry(0, 1).expect("entry should exist");
    let error = provider
        .activate(stale.handle)
        .expect_err("closed window should not activate");
    assert_eq!(error, ActivationError::WindowClosed);

    // The tree only changes on the next observed diff.
    assert_eq!(tree.groups[0].entries.len(), 2);
    assert!(tracker.observe(&provider.enumerate()));
}
