#[macro_use]
mod macros;

pub mod analysis;
pub mod breaking;
pub mod channel;
pub mod config;
pub mod config_changes;
pub mod discovery;
pub mod document;
pub mod e2e;
pub mod error;
pub mod formatter;
pub mod io;
pub mod markdown;
pub mod memory;
pub mod metadata;
pub mod paths;
pub mod publish;
pub mod reconcile;
pub mod rules;
pub mod transport;
pub mod types;

pub use analysis::ReleaseAnalysis;
pub use channel::ChannelRef;
pub use config::Config;
pub use document::ReleaseEntry;
pub use error::{RelnoteError, Result, TransportError, TransportErrorKind};
pub use formatter::ChatMessage;
pub use publish::{History, HistoryStatus, PublishReport, Publisher};
pub use reconcile::{ReconcileSettings, Reconciler};
pub use transport::{ChatTransport, DocumentStore};
pub use types::{Classification, DocumentScope, ReleaseEvent};
