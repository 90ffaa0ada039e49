// Marginalia library exports

pub mod case;
pub mod command_processor;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod drafts;
pub mod editor;
pub mod emphasis;
pub mod events;
pub mod geometry;
pub mod history;
pub mod registry;
pub mod session;
pub mod status_manager;

pub use case::CaseType;
pub use command_processor::CommandProcessor;
pub use commands::ListStyleRequest;
pub use config::Config;
pub use drafts::{DraftData, DraftStore};
pub use editor::{Editor, Selection};
pub use emphasis::EmphasisState;
pub use events::{ActiveAnnotation, SessionEvent};
pub use geometry::{GridGeometry, PopoverPlacement, Rect, ScrollContainer, ViewGeometry};
pub use history::{HistoryAction, HistoryCategory, HistoryState};
pub use registry::MarkEntry;
pub use session::EditorSession;
pub use status_manager::MessageType;
