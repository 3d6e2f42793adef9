pub mod config;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod runtime;
pub mod settings;
pub mod tree_ops;
pub mod window_tracker;
pub mod windows_tree;
