#[cfg(target_os = "windows")]
mod imp {
    use std::ffi::c_void;
    use std::sync::OnceLock;

    use windows_sys::Win32::Foundation::{
        GetLastError, HWND, LPARAM, LRESULT, POINT, RECT, WPARAM,
    };
    use windows_sys::Win32::Graphics::Gdi::{
        CreateFontW, DeleteObject, ScreenToClient, SelectObject, DEFAULT_CHARSET, DEFAULT_QUALITY,
        FF_DONTCARE, FW_BOLD, FW_NORMAL, OUT_DEFAULT_PRECIS,
    };
    use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows_sys::Win32::UI::Controls::{
        InitCommonControlsEx, CDDS_ITEMPREPAINT, CDDS_PREPAINT, CDRF_DODEFAULT, CDRF_NEWFONT,
        CDRF_NOTIFYITEMDRAW, EM_SETSEL, ICC_TREEVIEW_CLASSES, INITCOMMONCONTROLSEX, NMHDR,
        NMTREEVIEWW, NMTVCUSTOMDRAW, NM_CUSTOMDRAW, NM_DBLCLK, NM_RCLICK, TVE_EXPAND, TVGN_CARET,
        TVGN_DROPHILITE, TVHITTESTINFO, TVIF_PARAM, TVIF_TEXT, TVINSERTSTRUCTW, TVINSERTSTRUCTW_0,
        TVITEMW, TVI_LAST, TVI_ROOT, TVM_DELETEITEM, TVM_EXPAND, TVM_GETITEMW, TVM_GETNEXTITEM,
        TVM_HITTEST, TVM_INSERTITEMW, TVM_SELECTITEM, TVN_BEGINDRAGW, TVS_HASBUTTONS,
        TVS_HASLINES, TVS_LINESATROOT, TVS_SHOWSELALWAYS,
    };
    use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
        EnableWindow, ReleaseCapture, SetCapture, SetFocus, VK_ESCAPE, VK_RETURN,
    };
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        AppendMenuW, CallWindowProcW, CreatePopupMenu, CreateWindowExW, DefWindowProcW,
        DestroyMenu, DestroyWindow, DispatchMessageW, GetClientRect, GetCursorPos, GetMessageW,
        GetParent, GetSystemMetrics, GetWindowLongPtrW, GetWindowRect, GetWindowTextW, KillTimer,
        LoadCursorW, MessageBoxW, MoveWindow, PostMessageW, PostQuitMessage, RegisterClassW,
        SendMessageW, SetForegroundWindow, SetTimer, SetWindowLongPtrW, SetWindowPos, ShowWindow,
        TrackPopupMenu, TranslateMessage, CREATESTRUCTW, CS_HREDRAW, CS_VREDRAW, ES_AUTOHSCROLL,
        GWLP_USERDATA, GWLP_WNDPROC, HMENU, HWND_TOP, IDC_ARROW, IDYES, MB_ICONERROR,
        MB_ICONWARNING, MB_OK, MB_YESNO, MF_SEPARATOR, MF_STRING, MSG, SM_CXSCREEN, SM_CYSCREEN,
        SWP_NOACTIVATE, SW_SHOW, TPM_LEFTALIGN, TPM_RETURNCMD, TPM_RIGHTBUTTON, WM_APP,
        WM_CAPTURECHANGED, WM_CLOSE, WM_COMMAND, WM_CREATE, WM_DESTROY, WM_KEYDOWN, WM_LBUTTONUP,
        WM_MOUSEMOVE, WM_NCCREATE, WM_NCDESTROY, WM_NOTIFY, WM_SETFONT, WM_SETREDRAW, WM_SIZE,
        WM_TIMER, WNDCLASSW, WS_BORDER, WS_CAPTION, WS_CHILD, WS_EX_TOPMOST, WS_OVERLAPPEDWINDOW,
        WS_POPUP, WS_SYSMENU, WS_TABSTOP, WS_VISIBLE,
    };

    use crate::model::{NodeRef, TreeModel};
    use crate::window_tracker::POLL_INTERVAL_MS;

    const CLASS_NAME: &str = "SheetSwitchWindowClass";
    const PROMPT_CLASS_NAME: &str = "SheetSwitchPromptClass";
    const WINDOW_TITLE: &str = "SheetSwitch";
    const DIALOG_TITLE: &str = "SheetSwitch";
    const TREE_CLASS: &str = "SysTreeView32";
    const EDIT_CLASS: &str = "EDIT";
    const BUTTON_CLASS: &str = "BUTTON";
    const STATIC_CLASS: &str = "STATIC";

    const WINDOW_WIDTH: i32 = 500;
    const WINDOW_HEIGHT: i32 = 600;

    const CONTROL_ID_TREE: usize = 1001;

    const IDM_DELETE_GROUP: usize = 101;
    const IDM_RENAME_GROUP: usize = 102;
    const IDM_CREATE_GROUP: usize = 103;

    const TIMER_REFRESH: usize = 0x5E11;

    const SHEETSWITCH_WM_ACTIVATE: u32 = WM_APP + 1;
    const SHEETSWITCH_WM_DROP: u32 = WM_APP + 2;
    const SHEETSWITCH_WM_CREATE_GROUP: u32 = WM_APP + 3;
    const SHEETSWITCH_WM_RENAME_GROUP: u32 = WM_APP + 4;
    const SHEETSWITCH_WM_DELETE_GROUP: u32 = WM_APP + 5;

    // Typography and visual tokens.
    const FONT_TREE_HEIGHT: i32 = -15;
    const DEFAULT_FONT_FAMILY: &str = "Segoe UI";
    const COLOR_GROUP_TEXT: u32 = 0x008B0000; // dark blue, 0x00BBGGRR

    const PROMPT_WIDTH: i32 = 360;
    const PROMPT_HEIGHT: i32 = 150;
    const CONTROL_ID_PROMPT_EDIT: usize = 2001;
    const CONTROL_ID_PROMPT_OK: usize = 2002;
    const CONTROL_ID_PROMPT_CANCEL: usize = 2003;
    const BS_DEFPUSHBUTTON_STYLE: u32 = 0x0000_0001; // BS_DEFPUSHBUTTON

    /// What the shell surfaces to the runtime. Node references are decoded
    /// from the per-item codes assigned at the latest render, so they are
    /// valid against the model that produced that render.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ShellEvent {
        Tick,
        Activate(NodeRef),
        Drop {
            dragged: NodeRef,
            target: Option<NodeRef>,
        },
        CreateGroupRequested,
        RenameGroupRequested(usize),
        DeleteGroupRequested(usize),
    }

    pub struct NativeTreeShell {
        hwnd: HWND,
    }

    struct TreeShellState {
        tree_hwnd: HWND,
        tree_prev_proc: isize,
        entry_font: isize,
        group_font: isize,
        drag_code: Option<isize>,
    }

    impl Default for TreeShellState {
        fn default() -> Self {
            Self {
                tree_hwnd: std::ptr::null_mut(),
                tree_prev_proc: 0,
                entry_font: 0,
                group_font: 0,
                drag_code: None,
            }
        }
    }

    impl NativeTreeShell {
        pub fn create() -> Result<Self, String> {
            let controls = INITCOMMONCONTROLSEX {
                dwSize: std::mem::size_of::<INITCOMMONCONTROLSEX>() as u32,
                dwICC: ICC_TREEVIEW_CLASSES,
            };
            unsafe {
                InitCommonControlsEx(&controls);
            }

            let instance = unsafe { GetModuleHandleW(std::ptr::null()) };
            let class_name = class_name_wide();

            let mut class: WNDCLASSW = unsafe { std::mem::zeroed() };
            class.style = CS_HREDRAW | CS_VREDRAW;
            class.lpfnWndProc = Some(tree_shell_wnd_proc);
            class.hInstance = instance;
            class.hCursor = unsafe { LoadCursorW(std::ptr::null_mut(), IDC_ARROW) };
            class.hbrBackground = std::ptr::null_mut();
            class.lpszClassName = class_name.as_ptr();

            let atom = unsafe { RegisterClassW(&class) };
            if atom == 0 {
                let error = unsafe { GetLastError() };
                if error != 1410 {
                    return Err(format!("RegisterClassW failed with error {error}"));
                }
            }

            let state = Box::new(TreeShellState::default());
            let state_ptr = Box::into_raw(state);

            let hwnd = unsafe {
                CreateWindowExW(
                    WS_EX_TOPMOST,
                    class_name.as_ptr(),
                    to_wide(WINDOW_TITLE).as_ptr(),
                    WS_OVERLAPPEDWINDOW,
                    0,
                    0,
                    WINDOW_WIDTH,
                    WINDOW_HEIGHT,
                    std::ptr::null_mut(),
                    0 as HMENU,
                    instance,
                    state_ptr as *mut c_void,
                )
            };

            if hwnd.is_null() {
                unsafe {
                    let _ = Box::from_raw(state_ptr);
                }
                let error = unsafe { GetLastError() };
                return Err(format!("CreateWindowExW failed with error {error}"));
            }

            let shell = Self { hwnd };
            shell.center_window();
            Ok(shell)
        }

        pub fn show(&self) {
            unsafe {
                ShowWindow(self.hwnd, SW_SHOW);
                SetForegroundWindow(self.hwnd);
            }
        }

        /// Starts the poll timer. It stays armed until the window is
        /// destroyed, which kills it.
        pub fn start_refresh_timer(&self) {
            unsafe {
                SetTimer(self.hwnd, TIMER_REFRESH, POLL_INTERVAL_MS, None);
            }
        }

        /// Full re-render of the tree control from the model. Every group is
        /// expanded afterwards, matching the rebuild behavior users see.
        pub fn set_tree(&self, tree: &TreeModel) {
            let Some(state) = state_for(self.hwnd) else {
                return;
            };
            let tree_hwnd = state.tree_hwnd;

            unsafe {
                SendMessageW(tree_hwnd, WM_SETREDRAW, 0, 0);
                SendMessageW(tree_hwnd, TVM_DELETEITEM, 0, TVI_ROOT as LPARAM);
            }

            for (group_index, group) in tree.groups.iter().enumerate() {
                let group_code = encode_node(NodeRef::Group(group_index));
                let group_item = insert_tree_item(tree_hwnd, TVI_ROOT as isize, &group.name, group_code);
                for (entry_index, entry) in group.entries.iter().enumerate() {
                    let entry_code = encode_node(NodeRef::Entry {
                        group: group_index,
                        entry: entry_index,
                    });
                    insert_tree_item(tree_hwnd, group_item, &entry.title, entry_code);
                }
                unsafe {
                    SendMessageW(tree_hwnd, TVM_EXPAND, TVE_EXPAND as usize, group_item);
                }
            }

            unsafe {
                SendMessageW(tree_hwnd, WM_SETREDRAW, 1, 0);
                windows_sys::Win32::Graphics::Gdi::InvalidateRect(tree_hwnd, std::ptr::null(), 1);
            }
        }

        pub fn show_error(&self, message: &str) {
            unsafe {
                MessageBoxW(
                    self.hwnd,
                    to_wide(message).as_ptr(),
                    to_wide(DIALOG_TITLE).as_ptr(),
                    MB_OK | MB_ICONERROR,
                );
            }
        }

        pub fn confirm(&self, message: &str) -> bool {
            let choice = unsafe {
                MessageBoxW(
                    self.hwnd,
                    to_wide(message).as_ptr(),
                    to_wide(DIALOG_TITLE).as_ptr(),
                    MB_YESNO | MB_ICONWARNING,
                )
            };
            choice == IDYES
        }

        /// Modal text prompt over the main window. Returns the entered text
        /// on OK, `None` on cancel or close.
        pub fn prompt_text(&self, caption: &str, label: &str, initial: &str) -> Option<String> {
            prompt_text_modal(self.hwnd, caption, label, initial)
        }

        pub fn run_message_loop_with_events<F>(&self, mut on_event: F) -> Result<(), String>
        where
            F: FnMut(ShellEvent),
        {
            let mut msg: MSG = unsafe { std::mem::zeroed() };
            loop {
                let status = unsafe { GetMessageW(&mut msg, std::ptr::null_mut(), 0, 0) };
                if status == -1 {
                    let err = unsafe { GetLastError() };
                    return Err(format!("GetMessageW failed with error {err}"));
                }
                if status == 0 {
                    return Ok(());
                }

                match msg.message {
                    WM_TIMER if msg.wParam == TIMER_REFRESH => on_event(ShellEvent::Tick),
                    SHEETSWITCH_WM_ACTIVATE => {
                        if let Some(node) = decode_node(msg.wParam as isize) {
                            on_event(ShellEvent::Activate(node));
                        }
                    }
                    SHEETSWITCH_WM_DROP => {
                        if let Some(dragged) = decode_node(msg.wParam as isize) {
                            on_event(ShellEvent::Drop {
                                dragged,
                                target: decode_node(msg.lParam),
                            });
                        }
                    }
                    SHEETSWITCH_WM_CREATE_GROUP => on_event(ShellEvent::CreateGroupRequested),
                    SHEETSWITCH_WM_RENAME_GROUP => {
                        on_event(ShellEvent::RenameGroupRequested(msg.wParam))
                    }
                    SHEETSWITCH_WM_DELETE_GROUP => {
                        on_event(ShellEvent::DeleteGroupRequested(msg.wParam))
                    }
                    _ => {}
                }

                unsafe {
                    TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            }
        }

        fn center_window(&self) {
            let screen_width = unsafe { GetSystemMetrics(SM_CXSCREEN) };
            let screen_height = unsafe { GetSystemMetrics(SM_CYSCREEN) };
            let x = (screen_width - WINDOW_WIDTH).max(0) / 2;
            let y = (screen_height - WINDOW_HEIGHT).max(0) / 2;

            unsafe {
                SetWindowPos(
                    self.hwnd,
                    HWND_TOP,
                    x,
                    y,
                    WINDOW_WIDTH,
                    WINDOW_HEIGHT,
                    SWP_NOACTIVATE,
                );
            }
        }
    }

    extern "system" fn tree_shell_wnd_proc(
        hwnd: HWND,
        message: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        match message {
            WM_NCCREATE => {
                let create = lparam as *const CREATESTRUCTW;
                if create.is_null() {
                    return 0;
                }
                let state_ptr = unsafe { (*create).lpCreateParams as *mut TreeShellState };
                unsafe {
                    SetWindowLongPtrW(hwnd, GWLP_USERDATA, state_ptr as isize);
                }
                1
            }
            WM_CREATE => {
                if let Some(state) = state_for(hwnd) {
                    state.entry_font = create_tree_font(FW_NORMAL as i32);
                    state.group_font = create_tree_font(FW_BOLD as i32);

                    let instance = unsafe { GetModuleHandleW(std::ptr::null()) };
                    state.tree_hwnd = unsafe {
                        CreateWindowExW(
                            0,
                            to_wide(TREE_CLASS).as_ptr(),
                            std::ptr::null(),
                            WS_CHILD
                                | WS_VISIBLE
                                | WS_TABSTOP
                                | TVS_HASBUTTONS as u32
                                | TVS_HASLINES as u32
                                | TVS_LINESATROOT as u32
                                | TVS_SHOWSELALWAYS as u32,
                            0,
                            0,
                            0,
                            0,
                            hwnd,
                            CONTROL_ID_TREE as HMENU,
                            instance,
                            std::ptr::null_mut(),
                        )
                    };

                    unsafe {
                        SendMessageW(state.tree_hwnd, WM_SETFONT, state.entry_font as usize, 1);
                        state.tree_prev_proc = SetWindowLongPtrW(
                            state.tree_hwnd,
                            GWLP_WNDPROC,
                            tree_subclass_proc as *const () as isize,
                        );
                        SetFocus(state.tree_hwnd);
                    }
                }
                0
            }
            WM_SIZE => {
                if let Some(state) = state_for(hwnd) {
                    let mut client: RECT = unsafe { std::mem::zeroed() };
                    unsafe {
                        GetClientRect(hwnd, &mut client);
                        MoveWindow(
                            state.tree_hwnd,
                            0,
                            0,
                            client.right - client.left,
                            client.bottom - client.top,
                            1,
                        );
                    }
                }
                0
            }
            WM_NOTIFY => {
                let hdr = lparam as *const NMHDR;
                if hdr.is_null() {
                    return 0;
                }
                let (id_from, code) = unsafe { ((*hdr).idFrom, (*hdr).code) };
                if id_from != CONTROL_ID_TREE {
                    return unsafe { DefWindowProcW(hwnd, message, wparam, lparam) };
                }
                match code {
                    NM_DBLCLK => {
                        if let Some(state) = state_for(hwnd) {
                            if let Some(node_code) = selected_item_code(state.tree_hwnd) {
                                unsafe {
                                    PostMessageW(
                                        hwnd,
                                        SHEETSWITCH_WM_ACTIVATE,
                                        node_code as usize,
                                        0,
                                    );
                                }
                            }
                        }
                        0
                    }
                    NM_RCLICK => {
                        show_context_menu(hwnd);
                        0
                    }
                    TVN_BEGINDRAGW => {
                        if let Some(state) = state_for(hwnd) {
                            let info = lparam as *const NMTREEVIEWW;
                            let node_code = unsafe { (*info).itemNew.lParam };
                            if decode_node(node_code).is_some() {
                                state.drag_code = Some(node_code);
                                unsafe {
                                    SetCapture(hwnd);
                                }
                            }
                        }
                        0
                    }
                    NM_CUSTOMDRAW => handle_custom_draw(hwnd, lparam),
                    _ => 0,
                }
            }
            WM_MOUSEMOVE => {
                if let Some(state) = state_for(hwnd) {
                    if state.drag_code.is_some() {
                        let (item, _) = hit_test_item(state.tree_hwnd);
                        unsafe {
                            SendMessageW(
                                state.tree_hwnd,
                                TVM_SELECTITEM,
                                TVGN_DROPHILITE as usize,
                                item,
                            );
                        }
                    }
                }
                0
            }
            WM_LBUTTONUP => {
                if let Some(state) = state_for(hwnd) {
                    if let Some(dragged) = state.drag_code.take() {
                        unsafe {
                            ReleaseCapture();
                            SendMessageW(
                                state.tree_hwnd,
                                TVM_SELECTITEM,
                                TVGN_DROPHILITE as usize,
                                0,
                            );
                        }
                        let (_, target_code) = hit_test_item(state.tree_hwnd);
                        unsafe {
                            PostMessageW(hwnd, SHEETSWITCH_WM_DROP, dragged as usize, target_code);
                        }
                    }
                }
                0
            }
            WM_CAPTURECHANGED => {
                if let Some(state) = state_for(hwnd) {
                    if state.drag_code.take().is_some() {
                        unsafe {
                            SendMessageW(
                                state.tree_hwnd,
                                TVM_SELECTITEM,
                                TVGN_DROPHILITE as usize,
                                0,
                            );
                        }
                    }
                }
                0
            }
            WM_DESTROY => {
                unsafe {
                    KillTimer(hwnd, TIMER_REFRESH);
                    PostQuitMessage(0);
                }
                0
            }
            WM_NCDESTROY => {
                let state_ptr =
                    unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *mut TreeShellState };
                if !state_ptr.is_null() {
                    unsafe {
                        if (*state_ptr).entry_font != 0 {
                            DeleteObject((*state_ptr).entry_font as _);
                        }
                        if (*state_ptr).group_font != 0 {
                            DeleteObject((*state_ptr).group_font as _);
                        }
                        let _ = Box::from_raw(state_ptr);
                        SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
                    }
                }
                0
            }
            SHEETSWITCH_WM_ACTIVATE
            | SHEETSWITCH_WM_DROP
            | SHEETSWITCH_WM_CREATE_GROUP
            | SHEETSWITCH_WM_RENAME_GROUP
            | SHEETSWITCH_WM_DELETE_GROUP => 0,
            _ => unsafe { DefWindowProcW(hwnd, message, wparam, lparam) },
        }
    }

    extern "system" fn tree_subclass_proc(
        hwnd: HWND,
        message: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        let parent = unsafe { GetParent(hwnd) };

        if message == WM_KEYDOWN {
            match wparam as u16 {
                VK_RETURN => {
                    if let Some(node_code) = selected_item_code(hwnd) {
                        unsafe {
                            PostMessageW(parent, SHEETSWITCH_WM_ACTIVATE, node_code as usize, 0);
                        }
                    }
                    return 0;
                }
                VK_ESCAPE => {
                    unsafe {
                        PostMessageW(parent, WM_CLOSE, 0, 0);
                    }
                    return 0;
                }
                _ => {}
            }
        }

        let Some(state) = state_for(parent) else {
            return unsafe { DefWindowProcW(hwnd, message, wparam, lparam) };
        };
        if state.tree_prev_proc == 0 {
            return unsafe { DefWindowProcW(hwnd, message, wparam, lparam) };
        }

        let prev_proc = unsafe {
            std::mem::transmute::<isize, windows_sys::Win32::UI::WindowsAndMessaging::WNDPROC>(
                state.tree_prev_proc,
            )
        };
        unsafe { CallWindowProcW(prev_proc, hwnd, message, wparam, lparam) }
    }

    fn show_context_menu(hwnd: HWND) {
        let Some(state) = state_for(hwnd) else {
            return;
        };
        let (item, node_code) = hit_test_item(state.tree_hwnd);
        if item != 0 {
            unsafe {
                SendMessageW(state.tree_hwnd, TVM_SELECTITEM, TVGN_CARET as usize, item);
            }
        }

        let clicked_group = match decode_node(node_code) {
            Some(NodeRef::Group(group)) => Some(group),
            _ => None,
        };

        let menu = unsafe { CreatePopupMenu() };
        if menu.is_null() {
            return;
        }
        unsafe {
            if clicked_group.is_some() {
                AppendMenuW(
                    menu,
                    MF_STRING,
                    IDM_DELETE_GROUP,
                    to_wide("Delete group").as_ptr(),
                );
                AppendMenuW(
                    menu,
                    MF_STRING,
                    IDM_RENAME_GROUP,
                    to_wide("Rename group").as_ptr(),
                );
                AppendMenuW(menu, MF_SEPARATOR, 0, std::ptr::null());
            }
            AppendMenuW(
                menu,
                MF_STRING,
                IDM_CREATE_GROUP,
                to_wide("Create new group").as_ptr(),
            );
        }

        let mut point = POINT { x: 0, y: 0 };
        let chosen = unsafe {
            SetForegroundWindow(hwnd);
            GetCursorPos(&mut point);
            TrackPopupMenu(
                menu,
                TPM_LEFTALIGN | TPM_RETURNCMD | TPM_RIGHTBUTTON,
                point.x,
                point.y,
                0,
                hwnd,
                std::ptr::null(),
            )
        };
        unsafe {
            DestroyMenu(menu);
        }

        match chosen as usize {
            IDM_DELETE_GROUP => {
                if let Some(group) = clicked_group {
                    unsafe {
                        PostMessageW(hwnd, SHEETSWITCH_WM_DELETE_GROUP, group, 0);
                    }
                }
            }
            IDM_RENAME_GROUP => {
                if let Some(group) = clicked_group {
                    unsafe {
                        PostMessageW(hwnd, SHEETSWITCH_WM_RENAME_GROUP, group, 0);
                    }
                }
            }
            IDM_CREATE_GROUP => unsafe {
                PostMessageW(hwnd, SHEETSWITCH_WM_CREATE_GROUP, 0, 0);
            },
            _ => {}
        }
    }

    fn handle_custom_draw(hwnd: HWND, lparam: LPARAM) -> LRESULT {
        let draw = lparam as *mut NMTVCUSTOMDRAW;
        if draw.is_null() {
            return CDRF_DODEFAULT as LRESULT;
        }
        let stage = unsafe { (*draw).nmcd.dwDrawStage };
        if stage == CDDS_PREPAINT {
            return CDRF_NOTIFYITEMDRAW as LRESULT;
        }
        if stage == CDDS_ITEMPREPAINT {
            let node_code = unsafe { (*draw).nmcd.lItemlParam };
            if matches!(decode_node(node_code), Some(NodeRef::Group(_))) {
                if let Some(state) = state_for(hwnd) {
                    unsafe {
                        (*draw).clrText = COLOR_GROUP_TEXT;
                        SelectObject((*draw).nmcd.hdc, state.group_font as _);
                    }
                    return CDRF_NEWFONT as LRESULT;
                }
            }
        }
        CDRF_DODEFAULT as LRESULT
    }

    fn insert_tree_item(tree_hwnd: HWND, parent: isize, text: &str, node_code: isize) -> isize {
        let mut wide = to_wide(text);
        let mut item: TVITEMW = unsafe { std::mem::zeroed() };
        item.mask = TVIF_TEXT | TVIF_PARAM;
        item.pszText = wide.as_mut_ptr();
        item.lParam = node_code;

        let insert = TVINSERTSTRUCTW {
            hParent: parent as _,
            hInsertAfter: TVI_LAST,
            Anonymous: TVINSERTSTRUCTW_0 { item },
        };
        unsafe {
            SendMessageW(
                tree_hwnd,
                TVM_INSERTITEMW,
                0,
                &insert as *const TVINSERTSTRUCTW as LPARAM,
            )
        }
    }

    fn selected_item_code(tree_hwnd: HWND) -> Option<isize> {
        let item =
            unsafe { SendMessageW(tree_hwnd, TVM_GETNEXTITEM, TVGN_CARET as usize, 0) };
        if item == 0 {
            return None;
        }
        Some(item_code(tree_hwnd, item))
    }

    fn item_code(tree_hwnd: HWND, item: isize) -> isize {
        let mut query: TVITEMW = unsafe { std::mem::zeroed() };
        query.mask = TVIF_PARAM;
        query.hItem = item as _;
        unsafe {
            SendMessageW(
                tree_hwnd,
                TVM_GETITEMW,
                0,
                &mut query as *mut TVITEMW as LPARAM,
            );
        }
        query.lParam
    }

    /// Tree item and node code under the cursor, or zeros when the cursor is
    /// over empty space.
    fn hit_test_item(tree_hwnd: HWND) -> (isize, isize) {
        let mut point = POINT { x: 0, y: 0 };
        unsafe {
            GetCursorPos(&mut point);
            ScreenToClient(tree_hwnd, &mut point);
        }
        let mut info: TVHITTESTINFO = unsafe { std::mem::zeroed() };
        info.pt = point;
        let item = unsafe {
            SendMessageW(
                tree_hwnd,
                TVM_HITTEST,
                0,
                &mut info as *mut TVHITTESTINFO as LPARAM,
            )
        };
        if item == 0 {
            (0, 0)
        } else {
            (item, item_code(tree_hwnd, item))
        }
    }

    fn create_tree_font(weight: i32) -> isize {
        (unsafe {
            CreateFontW(
                FONT_TREE_HEIGHT,
                0,
                0,
                0,
                weight,
                0,
                0,
                0,
                DEFAULT_CHARSET as u32,
                OUT_DEFAULT_PRECIS as u32,
                0,
                DEFAULT_QUALITY as u32,
                FF_DONTCARE as u32,
                font_family_wide().as_ptr(),
            )
        }) as isize
    }

    // Node references are packed into tree-item lParams: group index in the
    // high half, entry index + 1 in the low 16 bits, zero meaning the item is
    // the group header itself. Zero overall is "no node".
    fn encode_node(node: NodeRef) -> isize {
        match node {
            NodeRef::Group(group) => (group as isize + 1) << 16,
            NodeRef::Entry { group, entry } => {
                ((group as isize + 1) << 16) | (entry as isize + 1)
            }
        }
    }

    fn decode_node(node_code: isize) -> Option<NodeRef> {
        let group = node_code >> 16;
        if group <= 0 {
            return None;
        }
        let group = (group - 1) as usize;
        let entry = node_code & 0xFFFF;
        if entry == 0 {
            Some(NodeRef::Group(group))
        } else {
            Some(NodeRef::Entry {
                group,
                entry: (entry - 1) as usize,
            })
        }
    }

    // Modal text prompt.

    struct PromptState {
        edit_hwnd: HWND,
        edit_prev_proc: isize,
        font: isize,
        label: Vec<u16>,
        initial: Vec<u16>,
        done: bool,
        accepted: bool,
        text: String,
    }

    fn prompt_text_modal(owner: HWND, caption: &str, label: &str, initial: &str) -> Option<String> {
        let instance = unsafe { GetModuleHandleW(std::ptr::null()) };
        let class_name = prompt_class_name_wide();

        let mut class: WNDCLASSW = unsafe { std::mem::zeroed() };
        class.style = CS_HREDRAW | CS_VREDRAW;
        class.lpfnWndProc = Some(prompt_wnd_proc);
        class.hInstance = instance;
        class.hCursor = unsafe { LoadCursorW(std::ptr::null_mut(), IDC_ARROW) };
        class.hbrBackground = (5usize + 1) as _; // COLOR_WINDOW + 1
        class.lpszClassName = class_name.as_ptr();

        let atom = unsafe { RegisterClassW(&class) };
        if atom == 0 {
            let error = unsafe { GetLastError() };
            if error != 1410 {
                return None;
            }
        }

        let state = Box::new(PromptState {
            edit_hwnd: std::ptr::null_mut(),
            edit_prev_proc: 0,
            font: 0,
            label: to_wide(label),
            initial: to_wide(initial),
            done: false,
            accepted: false,
            text: String::new(),
        });
        let state_ptr = Box::into_raw(state);

        let mut owner_rect: RECT = unsafe { std::mem::zeroed() };
        unsafe {
            GetWindowRect(owner, &mut owner_rect);
        }
        let x = owner_rect.left + ((owner_rect.right - owner_rect.left) - PROMPT_WIDTH).max(0) / 2;
        let y = owner_rect.top + ((owner_rect.bottom - owner_rect.top) - PROMPT_HEIGHT).max(0) / 2;

        let hwnd = unsafe {
            CreateWindowExW(
                WS_EX_TOPMOST,
                class_name.as_ptr(),
                to_wide(caption).as_ptr(),
                WS_POPUP | WS_CAPTION | WS_SYSMENU,
                x,
                y,
                PROMPT_WIDTH,
                PROMPT_HEIGHT,
                owner,
                0 as HMENU,
                instance,
                state_ptr as *mut c_void,
            )
        };

        if hwnd.is_null() {
            unsafe {
                let _ = Box::from_raw(state_ptr);
            }
            return None;
        }

        unsafe {
            EnableWindow(owner, 0);
            ShowWindow(hwnd, SW_SHOW);
        }
        if let Some(state) = prompt_state_for(hwnd) {
            unsafe {
                SetFocus(state.edit_hwnd);
                SendMessageW(state.edit_hwnd, EM_SETSEL, 0, -1);
            }
        }

        let mut msg: MSG = unsafe { std::mem::zeroed() };
        loop {
            let status = unsafe { GetMessageW(&mut msg, std::ptr::null_mut(), 0, 0) };
            if status <= 0 {
                if status == 0 {
                    unsafe {
                        PostQuitMessage(msg.wParam as i32);
                    }
                }
                break;
            }
            unsafe {
                TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
            match prompt_state_for(hwnd) {
                Some(state) if state.done => break,
                Some(_) => {}
                None => break,
            }
        }

        let result = prompt_state_for(hwnd).and_then(|state| {
            if state.accepted {
                Some(state.text.clone())
            } else {
                None
            }
        });

        unsafe {
            EnableWindow(owner, 1);
            SetForegroundWindow(owner);
            DestroyWindow(hwnd);
        }
        result
    }

    extern "system" fn prompt_wnd_proc(
        hwnd: HWND,
        message: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        match message {
            WM_NCCREATE => {
                let create = lparam as *const CREATESTRUCTW;
                if create.is_null() {
                    return 0;
                }
                let state_ptr = unsafe { (*create).lpCreateParams as *mut PromptState };
                unsafe {
                    SetWindowLongPtrW(hwnd, GWLP_USERDATA, state_ptr as isize);
                }
                1
            }
            WM_CREATE => {
                if let Some(state) = prompt_state_for(hwnd) {
                    state.font = create_tree_font(FW_NORMAL as i32);
                    let instance = unsafe { GetModuleHandleW(std::ptr::null()) };

                    let label_hwnd = unsafe {
                        CreateWindowExW(
                            0,
                            to_wide(STATIC_CLASS).as_ptr(),
                            state.label.as_ptr(),
                            WS_CHILD | WS_VISIBLE,
                            12,
                            12,
                            320,
                            18,
                            hwnd,
                            0 as HMENU,
                            instance,
                            std::ptr::null_mut(),
                        )
                    };
                    state.edit_hwnd = unsafe {
                        CreateWindowExW(
                            0,
                            to_wide(EDIT_CLASS).as_ptr(),
                            state.initial.as_ptr(),
                            WS_CHILD | WS_VISIBLE | WS_TABSTOP | WS_BORDER | ES_AUTOHSCROLL as u32,
                            12,
                            34,
                            320,
                            24,
                            hwnd,
                            CONTROL_ID_PROMPT_EDIT as HMENU,
                            instance,
                            std::ptr::null_mut(),
                        )
                    };
                    let ok_hwnd = unsafe {
                        CreateWindowExW(
                            0,
                            to_wide(BUTTON_CLASS).as_ptr(),
                            to_wide("OK").as_ptr(),
                            WS_CHILD | WS_VISIBLE | WS_TABSTOP | BS_DEFPUSHBUTTON_STYLE,
                            176,
                            70,
                            75,
                            26,
                            hwnd,
                            CONTROL_ID_PROMPT_OK as HMENU,
                            instance,
                            std::ptr::null_mut(),
                        )
                    };
                    let cancel_hwnd = unsafe {
                        CreateWindowExW(
                            0,
                            to_wide(BUTTON_CLASS).as_ptr(),
                            to_wide("Cancel").as_ptr(),
                            WS_CHILD | WS_VISIBLE | WS_TABSTOP,
                            257,
                            70,
                            75,
                            26,
                            hwnd,
                            CONTROL_ID_PROMPT_CANCEL as HMENU,
                            instance,
                            std::ptr::null_mut(),
                        )
                    };

                    unsafe {
                        SendMessageW(label_hwnd, WM_SETFONT, state.font as usize, 1);
                        SendMessageW(state.edit_hwnd, WM_SETFONT, state.font as usize, 1);
                        SendMessageW(ok_hwnd, WM_SETFONT, state.font as usize, 1);
                        SendMessageW(cancel_hwnd, WM_SETFONT, state.font as usize, 1);
                        state.edit_prev_proc = SetWindowLongPtrW(
                            state.edit_hwnd,
                            GWLP_WNDPROC,
                            prompt_edit_subclass_proc as *const () as isize,
                        );
                    }
                }
                0
            }
            WM_COMMAND => {
                if let Some(state) = prompt_state_for(hwnd) {
                    match wparam & 0xFFFF {
                        CONTROL_ID_PROMPT_OK => {
                            state.text = window_text(state.edit_hwnd);
                            state.accepted = true;
                            state.done = true;
                        }
                        CONTROL_ID_PROMPT_CANCEL => {
                            state.done = true;
                        }
                        _ => {}
                    }
                }
                0
            }
            WM_CLOSE => {
                if let Some(state) = prompt_state_for(hwnd) {
                    state.done = true;
                }
                0
            }
            WM_NCDESTROY => {
                let state_ptr =
                    unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *mut PromptState };
                if !state_ptr.is_null() {
                    unsafe {
                        if (*state_ptr).font != 0 {
                            DeleteObject((*state_ptr).font as _);
                        }
                        let _ = Box::from_raw(state_ptr);
                        SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
                    }
                }
                0
            }
            _ => unsafe { DefWindowProcW(hwnd, message, wparam, lparam) },
        }
    }

    extern "system" fn prompt_edit_subclass_proc(
        hwnd: HWND,
        message: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        let parent = unsafe { GetParent(hwnd) };

        if message == WM_KEYDOWN {
            match wparam as u16 {
                VK_RETURN => {
                    unsafe {
                        PostMessageW(parent, WM_COMMAND, CONTROL_ID_PROMPT_OK, 0);
                    }
                    return 0;
                }
                VK_ESCAPE => {
                    unsafe {
                        PostMessageW(parent, WM_COMMAND, CONTROL_ID_PROMPT_CANCEL, 0);
                    }
                    return 0;
                }
                _ => {}
            }
        }

        let Some(state) = prompt_state_for(parent) else {
            return unsafe { DefWindowProcW(hwnd, message, wparam, lparam) };
        };
        if state.edit_prev_proc == 0 {
            return unsafe { DefWindowProcW(hwnd, message, wparam, lparam) };
        }

        let prev_proc = unsafe {
            std::mem::transmute::<isize, windows_sys::Win32::UI::WindowsAndMessaging::WNDPROC>(
                state.edit_prev_proc,
            )
        };
        unsafe { CallWindowProcW(prev_proc, hwnd, message, wparam, lparam) }
    }

    fn window_text(hwnd: HWND) -> String {
        let mut buffer = [0_u16; 256];
        let copied = unsafe { GetWindowTextW(hwnd, buffer.as_mut_ptr(), buffer.len() as i32) };
        if copied <= 0 {
            return String::new();
        }
        String::from_utf16_lossy(&buffer[..copied as usize])
    }

    fn state_for(hwnd: HWND) -> Option<&'static mut TreeShellState> {
        let state_ptr = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *mut TreeShellState };
        if state_ptr.is_null() {
            None
        } else {
            Some(unsafe { &mut *state_ptr })
        }
    }

    fn prompt_state_for(hwnd: HWND) -> Option<&'static mut PromptState> {
        let state_ptr = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *mut PromptState };
        if state_ptr.is_null() {
            None
        } else {
            Some(unsafe { &mut *state_ptr })
        }
    }

    fn class_name_wide() -> &'static [u16] {
        static CLASS_NAME_WIDE: OnceLock<Vec<u16>> = OnceLock::new();
        CLASS_NAME_WIDE.get_or_init(|| to_wide(CLASS_NAME)).as_slice()
    }

    fn prompt_class_name_wide() -> &'static [u16] {
        static PROMPT_CLASS_NAME_WIDE: OnceLock<Vec<u16>> = OnceLock::new();
        PROMPT_CLASS_NAME_WIDE
            .get_or_init(|| to_wide(PROMPT_CLASS_NAME))
            .as_slice()
    }

    fn to_wide(value: &str) -> Vec<u16> {
        value.encode_utf16().chain(std::iter::once(0)).collect()
    }

    #[cfg(test)]
    mod tests {
        use super::{decode_node, encode_node};
        use crate::model::NodeRef;

        #[test]
        fn node_codes_round_trip() {
            let nodes = [
                NodeRef::Group(0),
                NodeRef::Group(7),
                NodeRef::Entry { group: 0, entry: 0 },
                NodeRef::Entry { group: 3, entry: 12 },
            ];
            for node in nodes {
                assert_eq!(decode_node(encode_node(node)), Some(node));
            }
        }

        #[test]
        fn zero_code_is_no_node() {
            assert_eq!(decode_node(0), None);
        }
    }
}

#[cfg(target_os = "windows")]
pub use imp::{NativeTreeShell, ShellEvent};
