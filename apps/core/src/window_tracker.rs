use std::collections::HashSet;

use crate::model::{LiveWindow, WindowHandle};

/// Window class of top-level Excel workbook windows.
pub const EXCEL_WINDOW_CLASS: &str = "XLMAIN";

/// Fixed poll cadence. No backoff, no coalescing.
pub const POLL_INTERVAL_MS: u32 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationError {
    /// The window went away since the last poll.
    WindowClosed,
    UnsupportedPlatform,
}

impl std::fmt::Display for ActivationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WindowClosed => write!(f, "The selected Excel window has already been closed."),
            Self::UnsupportedPlatform => write!(f, "window activation is not supported here"),
        }
    }
}

impl std::error::Error for ActivationError {}

/// Seam between the reconciler and the OS. The native provider talks Win32;
/// tests substitute a mock.
pub trait WindowProvider {
    /// All visible target-class windows with non-blank titles, in z-order.
    fn enumerate(&self) -> Vec<LiveWindow>;

    /// Brings a window to the foreground, restoring it first if minimized.
    fn activate(&self, handle: WindowHandle) -> Result<(), ActivationError>;
}

/// Remembers the handle set from the previous poll and answers whether the
/// current one differs. A changed set means the displayed tree needs a full
/// reconciliation rebuild.
#[derive(Debug, Default)]
pub struct WindowTracker {
    last_seen: HashSet<WindowHandle>,
}

impl WindowTracker {
    pub fn has_changed(&self, current: &[LiveWindow]) -> bool {
        if current.len() != self.last_seen.len() {
            return true;
        }
        current
            .iter()
            .any(|window| !self.last_seen.contains(&window.handle))
    }

    /// Diffs against the previous poll and remembers the new set. Returns
    /// true when the handle set changed.
    pub fn observe(&mut self, current: &[LiveWindow]) -> bool {
        let changed = self.has_changed(current);
        if changed {
            self.last_seen = current.iter().map(|window| window.handle).collect();
        }
        changed
    }
}

#[derive(Debug, Default)]
pub struct MockWindowProvider {
    pub windows: Vec<LiveWindow>,
}

impl MockWindowProvider {
    pub fn with_windows(windows: Vec<LiveWindow>) -> Self {
        Self { windows }
    }
}

impl WindowProvider for MockWindowProvider {
    fn enumerate(&self) -> Vec<LiveWindow> {
        self.windows.clone()
    }

    fn activate(&self, handle: WindowHandle) -> Result<(), ActivationError> {
        if self.windows.iter().any(|window| window.handle == handle) {
            Ok(())
        } else {
            Err(ActivationError::WindowClosed)
        }
    }
}

#[cfg(not(target_os = "windows"))]
#[derive(Debug, Default)]
pub struct NoopWindowProvider;

#[cfg(not(target_os = "windows"))]
impl WindowProvider for NoopWindowProvider {
    fn enumerate(&self) -> Vec<LiveWindow> {
        Vec::new()
    }

    fn activate(&self, _handle: WindowHandle) -> Result<(), ActivationError> {
        Err(ActivationError::UnsupportedPlatform)
    }
}

#[cfg(target_os = "windows")]
pub struct ExcelWindowProvider {
    class_name: Vec<u16>,
}

#[cfg(target_os = "windows")]
impl Default for ExcelWindowProvider {
    fn default() -> Self {
        Self {
            class_name: EXCEL_WINDOW_CLASS.encode_utf16().collect(),
        }
    }
}

#[cfg(target_os = "windows")]
struct EnumContext<'a> {
    class_name: &'a [u16],
    windows: Vec<LiveWindow>,
}

#[cfg(target_os = "windows")]
impl WindowProvider for ExcelWindowProvider {
    fn enumerate(&self) -> Vec<LiveWindow> {
        use windows_sys::Win32::UI::WindowsAndMessaging::EnumWindows;

        let mut context = EnumContext {
            class_name: &self.class_name,
            windows: Vec::new(),
        };
        unsafe {
            EnumWindows(
                Some(enum_windows_proc),
                &mut context as *mut EnumContext<'_> as isize,
            );
        }
        context.windows
    }

    fn activate(&self, handle: WindowHandle) -> Result<(), ActivationError> {
        use windows_sys::Win32::UI::WindowsAndMessaging::{
            IsIconic, IsWindow, SetForegroundWindow, ShowWindow, SW_RESTORE,
        };

        let hwnd = handle as windows_sys::Win32::Foundation::HWND;
        unsafe {
            if IsWindow(hwnd) == 0 {
                return Err(ActivationError::WindowClosed);
            }
            if IsIconic(hwnd) != 0 {
                ShowWindow(hwnd, SW_RESTORE);
            }
            SetForegroundWindow(hwnd);
        }
        Ok(())
    }
}

#[cfg(target_os = "windows")]
extern "system" fn enum_windows_proc(
    hwnd: windows_sys::Win32::Foundation::HWND,
    lparam: windows_sys::Win32::Foundation::LPARAM,
) -> windows_sys::Win32::Foundation::BOOL {
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        GetClassNameW, GetWindowTextLengthW, GetWindowTextW, IsWindowVisible,
    };

    let context = unsafe { &mut *(lparam as *mut EnumContext<'_>) };

    let mut class_buffer = [0_u16; 64];
    let class_len =
        unsafe { GetClassNameW(hwnd, class_buffer.as_mut_ptr(), class_buffer.len() as i32) };
    if class_len <= 0 || &class_buffer[..class_len as usize] != context.class_name {
        return 1;
    }

    if unsafe { IsWindowVisible(hwnd) } == 0 {
        return 1;
    }

    let title_len = unsafe { GetWindowTextLengthW(hwnd) };
    if title_len <= 0 {
        return 1;
    }
    let mut title_buffer = vec![0_u16; (title_len as usize) + 1];
    let copied =
        unsafe { GetWindowTextW(hwnd, title_buffer.as_mut_ptr(), title_buffer.len() as i32) };
    let title = String::from_utf16_lossy(&title_buffer[..copied.max(0) as usize]);
    if title.trim().is_empty() {
        return 1;
    }

    context
        .windows
        .push(LiveWindow::new(hwnd as isize, &title));
    1
}

pub fn default_window_provider() -> Box<dyn WindowProvider> {
    #[cfg(target_os = "windows")]
    {
        Box::new(ExcelWindowProvider::default())
    }

    #[cfg(not(target_os = "windows"))]
    {
        Box::new(NoopWindowProvider)
    }
}

#[cfg(test)]
mod tests {
    use super::{ActivationError, MockWindowProvider, WindowProvider, WindowTracker};
    use crate::model::LiveWindow;

    #[test]
    fn first_observation_of_windows_is_a_change() {
        let mut tracker = WindowTracker::default();
        let current = vec![LiveWindow::new(1, "Budget.xlsx")];
        assert!(tracker.observe(&current));
        assert!(!tracker.observe(&current));
    }

    #[test]
    fn same_handles_in_different_order_are_unchanged() {
        let mut tracker = WindowTracker::default();
        tracker.observe(&[LiveWindow::new(1, "A"), LiveWindow::new(2, "B")]);
        let reordered = vec![LiveWindow::new(2, "B"), LiveWindow::new(1, "A")];
        assert!(!tracker.observe(&reordered));
    }

    #[test]
    fn title_changes_alone_do_not_count() {
        let mut tracker = WindowTracker::default();
        tracker.observe(&[LiveWindow::new(1, "Book1 - Excel")]);
        assert!(!tracker.observe(&[LiveWindow::new(1, "Book1 (edited) - Excel")]));
    }

    #[test]
    fn opened_and_closed_windows_count_as_changes() {
        let mut tracker = WindowTracker::default();
        tracker.observe(&[LiveWindow::new(1, "A")]);
        assert!(tracker.observe(&[LiveWindow::new(1, "A"), LiveWindow::new(2, "B")]));
        assert!(tracker.observe(&[LiveWindow::new(2, "B")]));
    }

    #[test]
    fn mock_provider_reports_closed_windows() {
        let provider = MockWindowProvider::with_windows(vec![LiveWindow::new(7, "Open.xlsx")]);
        assert!(provider.activate(7).is_ok());
        assert_eq!(provider.activate(8), Err(ActivationError::WindowClosed));
    }
}
