use std::time::{SystemTime, UNIX_EPOCH};

use sheetswitch_core::settings::{self, GroupData, GroupSettings, UNCATEGORIZED_GROUP};

fn temp_settings_path(tag: &str) -> std::path::PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be valid")
        .as_nanos();
    std::env::temp_dir().join(format!("sheetswitch-{tag}-{unique}/settings.json"))
}

#[test]
fn missing_file_loads_default_with_reserved_group() {
    let path = temp_settings_path("missing");

    let settings = settings::load(&path);

    assert_eq!(settings.groups.len(), 1);
    assert_eq!(settings.groups[0].name, UNCATEGORIZED_GROUP);
}

#[test]
fn unreadable_json_falls_back_silently() {
    let path = temp_settings_path("garbage");
    std::fs::create_dir_all(path.parent().unwrap()).expect("temp dir should be created");
    std::fs::write(&path, "{ not json").expect("temp file should be written");

    let settings = settings::load(&path);

    assert_eq!(settings.groups.len(), 1);
    assert_eq!(settings.groups[0].name, UNCATEGORIZED_GROUP);

    std::fs::remove_file(&path).expect("temp file should be removed");
}

#[test]
fn loaded_settings_gain_reserved_group_at_front() {
    let path = temp_settings_path("no-reserved");
    std::fs::create_dir_all(path.parent().unwrap()).expect("temp dir should be created");
    std::fs::write(
        &path,
        r#"{ "Groups": [ { "Name": "Reports", "Files": ["Q1"] } ] }"#,
    )
    .expect("temp file should be written");

    let settings = settings::load(&path);

    assert_eq!(settings.groups[0].name, UNCATEGORIZED_GROUP);
    assert_eq!(settings.groups[1].name, "Reports");
    assert_eq!(settings.groups[1].files, vec!["Q1".to_string()]);

    std::fs::remove_file(&path).expect("temp file should be removed");
}

#[test]
fn existing_reserved_group_keeps_its_position() {
    let path = temp_settings_path("reserved-late");
    std::fs::create_dir_all(path.parent().unwrap()).expect("temp dir should be created");
    std::fs::write(
        &path,
        r#"{ "Groups": [ { "Name": "Reports", "Files": [] }, { "Name": "Uncategorized", "Files": [] } ] }"#,
    )
    .expect("temp file should be written");

    let settings = settings::load(&path);

    assert_eq!(settings.groups.len(), 2);
    assert_eq!(settings.groups[1].name, UNCATEGORIZED_GROUP);

    std::fs::remove_file(&path).expect("temp file should be removed");
}

#[test]
fn save_then_load_round_trips_groups_in_order() {
    let path = temp_settings_path("round-trip");
    let settings = GroupSettings {
        groups: vec![
            GroupData::named(UNCATEGORIZED_GROUP),
            GroupData {
                name: "Reports".to_string(),
                files: vec!["Q1 Report.xlsx".to_string(), "Q2 Report.xlsx".to_string()],
            },
        ],
    };

    settings::save(&path, &settings).expect("save should succeed");
    let loaded = settings::load(&path);

    assert_eq!(loaded, settings);

    std::fs::remove_file(&path).expect("temp file should be removed");
}

#[test]
fn saved_json_uses_the_documented_field_names() {
    let path = temp_settings_path("contract");
    let settings = GroupSettings {
        groups: vec![GroupData {
            name: "Reports".to_string(),
            files: vec!["Q1".to_string()],
        }],
    };

    settings::save(&path, &settings).expect("save should succeed");
    let raw = std::fs::read_to_string(&path).expect("saved file should be readable");

    assert!(raw.contains("\"Groups\""));
    assert!(raw.contains("\"Name\""));
    assert!(raw.contains("\"Files\""));
    // Pretty-printed, not a single line.
    assert!(raw.contains('\n'));

    std::fs::remove_file(&path).expect("temp file should be removed");
}

#[test]
fn save_into_a_missing_directory_creates_it() {
    let path = temp_settings_path("fresh-dir");

    settings::save(&path, &GroupSettings::default()).expect("save should create parent dirs");

    assert!(path.exists());
    std::fs::remove_file(&path).expect("temp file should be removed");
}
