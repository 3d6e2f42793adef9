use std::path::PathBuf;

pub const SETTINGS_FILE_NAME: &str = "settings.json";
const APP_FOLDER_NAME: &str = "SheetSwitch";

pub struct Config {
    pub settings_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_path: app_documents_dir().join(SETTINGS_FILE_NAME),
        }
    }
}

pub fn validate(cfg: &Config) -> Result<(), String> {
    if cfg.settings_path.as_os_str().is_empty() {
        return Err("settings_path is required".into());
    }
    if cfg.settings_path.file_name().is_none() {
        return Err("settings_path must name a file".into());
    }
    Ok(())
}

/// Per-application documents folder holding the settings file. Falls back to
/// a temp-dir location when the known-folder lookup is unavailable.
pub fn app_documents_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        known_documents_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_FOLDER_NAME)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::temp_dir().join(APP_FOLDER_NAME.to_ascii_lowercase())
    }
}

/// App-data directory for logs and other non-user-facing state.
pub fn stable_app_data_dir() -> PathBuf {
    if let Some(base) = std::env::var_os("LOCALAPPDATA") {
        return PathBuf::from(base).join(APP_FOLDER_NAME);
    }
    std::env::temp_dir().join(APP_FOLDER_NAME.to_ascii_lowercase())
}

#[cfg(target_os = "windows")]
fn known_documents_dir() -> Option<PathBuf> {
    use windows_sys::Win32::System::Com::CoTaskMemFree;
    use windows_sys::Win32::UI::Shell::{FOLDERID_Documents, SHGetKnownFolderPath};

    let mut path_ptr: *mut u16 = std::ptr::null_mut();
    let result = unsafe {
        SHGetKnownFolderPath(
            &FOLDERID_Documents,
            0,
            std::ptr::null_mut(),
            &mut path_ptr,
        )
    };
    if result != 0 || path_ptr.is_null() {
        if !path_ptr.is_null() {
            unsafe { CoTaskMemFree(path_ptr as _) };
        }
        return None;
    }

    let mut len = 0_usize;
    while unsafe { *path_ptr.add(len) } != 0 {
        len += 1;
    }
    let path = String::from_utf16_lossy(unsafe { std::slice::from_raw_parts(path_ptr, len) });
    unsafe { CoTaskMemFree(path_ptr as _) };

    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::{validate, Config};

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn default_settings_path_uses_app_folder() {
        let config = Config::default();
        let rendered = config.settings_path.to_string_lossy().to_ascii_lowercase();
        assert!(rendered.contains("sheetswitch"));
        assert!(rendered.ends_with("settings.json"));
    }
}
