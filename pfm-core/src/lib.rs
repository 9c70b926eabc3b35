pub mod error;

pub mod config;

pub mod logging;
pub use logging::{Logger, LoggerConfig};

pub mod fs {
    pub mod mounts;
    pub use mounts::{MountRoot, MountSource, StaticMounts, SystemMounts};

    pub mod path_resolver;
    pub use path_resolver::{Location, PathResolver, ROOT_LABEL};

    pub mod object_info;
    pub use object_info::{Entry, EntryKind};

    pub mod dir_scanner;
    pub use dir_scanner::DirectoryLister;
}

pub mod model {
    pub mod selection;
    pub use selection::{ClickAction, DEFAULT_ROW_HEIGHT, SelectionState};

    pub mod notification;
    pub use notification::{Notification, NotificationLevel, NotificationQueue, NotificationSink};
}

pub mod controller {
    pub mod actions;
    pub use actions::{Action, Dispatched};

    pub mod navigation;
    pub use navigation::{NavigationController, Navigated};

    pub mod event_loop;
    pub use event_loop::{EventLoop, TaskResult};
}

pub mod operators {
    pub mod copy_traversal;
    pub use copy_traversal::{CopyTraversal, WorkList};

    pub mod copy_executor;
    pub use copy_executor::{CopyExecutor, CopyReport};
}

pub mod tasks {
    pub mod listing_task;

    pub mod file_ops_task;
}

pub mod platform {
    pub mod opener;
    pub use opener::{DefaultAppOpener, system_opener};
}

pub use config::Config;
pub use error::AppError;
