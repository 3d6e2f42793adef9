/// Raw OS window handle. Stored as an integer so the tree model stays free of
/// platform types; only the window tracker and the native shell interpret it.
pub type WindowHandle = isize;

/// A visible spreadsheet window observed during one poll. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveWindow {
    pub handle: WindowHandle,
    pub title: String,
}

impl LiveWindow {
    pub fn new(handle: WindowHandle, title: &str) -> Self {
        Self {
            handle,
            title: title.to_string(),
        }
    }
}

/// The displayed tree. This model is the source of truth between rebuilds;
/// the native tree control only renders it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeModel {
    pub groups: Vec<GroupNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupNode {
    pub name: String,
    pub entries: Vec<EntryNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryNode {
    pub title: String,
    pub handle: WindowHandle,
}

impl TreeModel {
    pub fn group_position(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|group| group.name == name)
    }

    pub fn entry(&self, group: usize, entry: usize) -> Option<&EntryNode> {
        self.groups.get(group).and_then(|g| g.entries.get(entry))
    }
}

/// Position of a node in the displayed tree. Group headers and window entries
/// are distinct variants rather than an optional payload on one node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Group(usize),
    Entry { group: usize, entry: usize },
}

impl NodeRef {
    /// Group index this node belongs to, for either variant.
    pub fn group_index(&self) -> usize {
        match self {
            Self::Group(group) => *group,
            Self::Entry { group, .. } => *group,
        }
    }
}
