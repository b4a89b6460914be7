pub mod codec;
pub mod domain;
pub mod error;
pub mod membership;
pub mod plan;
pub mod ports;
pub mod schedule;
pub mod search;
pub mod snapshot;
pub mod sync;

pub use domain::{
    AccountDocument, AuthSession, BookmarkedCourse, Course, DocumentKind, DocumentSummary, Mode,
    Section, Switch, Switches, User, UserCredentials, UserOptions,
};
pub use error::{DecodeError, ModelError, ModelResult, SyncError};
pub use membership::{MatchBy, Membership};
pub use plan::Plan;
pub use ports::{
    AccountStore, Catalog, DatabaseService, ExportFile, Exporter, LocalStorage, PortError,
    PortResult, UrlStore,
};
pub use schedule::{Schedule, ScheduleSelection};
pub use snapshot::Snapshot;
pub use sync::{Intent, SyncCoordinator};
