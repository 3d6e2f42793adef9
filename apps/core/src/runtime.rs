use crate::config::{self, Config};
use crate::logging;
#[cfg(target_os = "windows")]
use crate::model::{NodeRef, TreeModel};
#[cfg(target_os = "windows")]
use crate::reconcile;
use crate::settings;
#[cfg(target_os = "windows")]
use crate::settings::{GroupSettings, UNCATEGORIZED_GROUP};
#[cfg(target_os = "windows")]
use crate::tree_ops::{self, DropOutcome};
#[cfg(target_os = "windows")]
use crate::window_tracker::{default_window_provider, WindowTracker};
#[cfg(target_os = "windows")]
use crate::windows_tree::{NativeTreeShell, ShellEvent};

#[derive(Debug)]
pub enum RuntimeError {
    Config(String),
    Shell(String),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(error) => write!(f, "config error: {error}"),
            Self::Shell(error) => write!(f, "shell error: {error}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

pub fn run() -> Result<(), RuntimeError> {
    let config = Config::default();
    config::validate(&config).map_err(RuntimeError::Config)?;

    if let Err(error) = logging::init() {
        eprintln!("[sheetswitch-core] logging unavailable: {error}");
    }
    logging::info(&format!(
        "startup mode={} settings_path={}",
        runtime_mode(),
        config.settings_path.display(),
    ));

    let settings = settings::load(&config.settings_path);
    logging::info(&format!("settings loaded groups={}", settings.groups.len()));

    #[cfg(target_os = "windows")]
    {
        run_shell(&config, settings)
    }

    #[cfg(not(target_os = "windows"))]
    {
        let _ = settings;
        println!("[sheetswitch-core] non-windows runtime mode: native shell unavailable");
        Ok(())
    }
}

fn runtime_mode() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "windows-tree-shell"
    }

    #[cfg(not(target_os = "windows"))]
    {
        "non-windows-noop"
    }
}

#[cfg(target_os = "windows")]
fn run_shell(config: &Config, mut persisted: GroupSettings) -> Result<(), RuntimeError> {
    let _single_instance = match acquire_single_instance_guard() {
        Ok(guard) => guard,
        Err(error) => return Err(RuntimeError::Shell(error)),
    };
    if _single_instance.is_none() {
        println!("[sheetswitch-core] runtime already active; exiting duplicate process");
        return Ok(());
    }

    let provider = default_window_provider();
    let mut tracker = WindowTracker::default();

    let live = provider.enumerate();
    tracker.observe(&live);
    let mut tree = reconcile::rebuild_tree(&persisted, &live);

    let shell = NativeTreeShell::create().map_err(RuntimeError::Shell)?;
    shell.set_tree(&tree);
    shell.show();
    shell.start_refresh_timer();
    logging::info("event loop running (native tree shell)");

    shell
        .run_message_loop_with_events(|event| match event {
            ShellEvent::Tick => {
                let current = provider.enumerate();
                if tracker.observe(&current) {
                    tree = reconcile::rebuild_tree(&persisted, &current);
                    shell.set_tree(&tree);
                }
            }
            ShellEvent::Activate(node) => {
                let NodeRef::Entry { group, entry } = node else {
                    return;
                };
                let Some(entry) = tree.entry(group, entry) else {
                    return;
                };
                if let Err(error) = provider.activate(entry.handle) {
                    logging::warn(&format!(
                        "activation failed handle={} title={:?}: {error}",
                        entry.handle, entry.title
                    ));
                    shell.show_error(&error.to_string());
                }
            }
            ShellEvent::Drop { dragged, target } => {
                match tree_ops::apply_drop(&mut tree, dragged, target) {
                    DropOutcome::Ignored => {}
                    DropOutcome::GroupReordered { .. } | DropOutcome::EntryMoved { .. } => {
                        persist(&shell, config, &tree, &mut persisted);
                        shell.set_tree(&tree);
                    }
                }
            }
            ShellEvent::CreateGroupRequested => {
                let Some(input) =
                    shell.prompt_text("Create group", "Enter a group name:", "New group")
                else {
                    return;
                };
                let Ok(name) = settings::validate_group_name(&input) else {
                    return;
                };
                match tree_ops::create_group(&mut tree, &name) {
                    Ok(_) => {
                        persist(&shell, config, &tree, &mut persisted);
                        shell.set_tree(&tree);
                    }
                    Err(error) => shell.show_error(&error.to_string()),
                }
            }
            ShellEvent::RenameGroupRequested(group) => {
                let Some(current_name) = tree.groups.get(group).map(|g| g.name.clone()) else {
                    return;
                };
                if current_name == UNCATEGORIZED_GROUP {
                    shell.show_error(&format!(
                        "The \"{UNCATEGORIZED_GROUP}\" group cannot be renamed."
                    ));
                    return;
                }
                let Some(input) =
                    shell.prompt_text("Rename group", "Enter a new group name:", &current_name)
                else {
                    return;
                };
                let Ok(name) = settings::validate_group_name(&input) else {
                    return;
                };
                match tree_ops::rename_group(&mut tree, group, &name) {
                    Ok(()) => {
                        persist(&shell, config, &tree, &mut persisted);
                        shell.set_tree(&tree);
                    }
                    Err(error) => shell.show_error(&error.to_string()),
                }
            }
            ShellEvent::DeleteGroupRequested(group) => {
                let Some(name) = tree.groups.get(group).map(|g| g.name.clone()) else {
                    return;
                };
                if name == UNCATEGORIZED_GROUP {
                    shell.show_error(&format!(
                        "The \"{UNCATEGORIZED_GROUP}\" group cannot be deleted."
                    ));
                    return;
                }
                if !shell.confirm(&format!(
                    "Delete the group \"{name}\"?\n(Its files move to \"{UNCATEGORIZED_GROUP}\".)"
                )) {
                    return;
                }
                match tree_ops::delete_group(&mut tree, group) {
                    Ok(moved) => {
                        logging::info(&format!(
                            "group deleted name={name:?} moved_entries={moved}"
                        ));
                        persist(&shell, config, &tree, &mut persisted);
                        shell.set_tree(&tree);
                    }
                    Err(error) => shell.show_error(&error.to_string()),
                }
            }
        })
        .map_err(RuntimeError::Shell)?;

    // One unconditional save when the window closes.
    persisted = reconcile::flatten(&tree);
    if let Err(error) = settings::save(&config.settings_path, &persisted) {
        logging::error(&format!("final save failed: {error}"));
    } else {
        logging::info("final save complete");
    }
    Ok(())
}

/// Flattens the displayed tree into the persisted model and writes it out.
/// A failed write is reported and logged, never retried; the tree keeps the
/// mutation either way.
#[cfg(target_os = "windows")]
fn persist(
    shell: &NativeTreeShell,
    config: &Config,
    tree: &TreeModel,
    persisted: &mut GroupSettings,
) {
    *persisted = reconcile::flatten(tree);
    if let Err(error) = settings::save(&config.settings_path, persisted) {
        logging::error(&format!("save failed: {error}"));
        shell.show_error(&format!("Failed to save settings: {error}"));
    }
}

#[cfg(target_os = "windows")]
struct SingleInstanceGuard {
    handle: windows_sys::Win32::Foundation::HANDLE,
}

#[cfg(target_os = "windows")]
impl Drop for SingleInstanceGuard {
    fn drop(&mut self) {
        unsafe {
            windows_sys::Win32::Foundation::CloseHandle(self.handle);
        }
    }
}

#[cfg(target_os = "windows")]
fn acquire_single_instance_guard() -> Result<Option<SingleInstanceGuard>, String> {
    use windows_sys::Win32::Foundation::GetLastError;
    use windows_sys::Win32::System::Threading::CreateMutexW;

    let mutex_name: Vec<u16> = "Local\\SheetSwitchRuntimeSingleton"
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect();
    let handle = unsafe { CreateMutexW(std::ptr::null(), 0, mutex_name.as_ptr()) };
    if handle.is_null() {
        let error = unsafe { GetLastError() };
        return Err(format!("CreateMutexW failed with error {error}"));
    }

    // ERROR_ALREADY_EXISTS
    let error = unsafe { GetLastError() };
    if error == 183 {
        unsafe {
            windows_sys::Win32::Foundation::CloseHandle(handle);
        }
        return Ok(None);
    }

    Ok(Some(SingleInstanceGuard { handle }))
}
