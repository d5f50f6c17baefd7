//! Book Viewer Core Library
//!
//! The page view pipeline of the book viewer: given a position in an ordered
//! page sequence, decide which pages must be visible, which to pre-decode in
//! the background, keep decoded content under the memory budget, and publish
//! a consistent view to the rest of the application without blocking the
//! interactive thread past a bounded timeout.

pub mod config;
pub mod events;
pub mod layout;
pub mod loader;
pub mod orchestrator;
pub mod page;
pub mod position;
pub mod session;
pub mod view_source;

pub use config::{BookViewConfig, PageMode, ReadOrder};
pub use events::{
    NextContentsEvent, Notifier, PageTerminatedEvent, Subscription, ViewContentsEvent,
};
pub use layout::ViewWindowBuilder;
pub use loader::PageLoadRequester;
pub use orchestrator::PageViewOrchestrator;
pub use page::{
    Page, PageKind, PageList, PageLoadError, PagePictureElement, PageSourceElement, PageState,
};
pub use position::{PagePosition, PageRange};
pub use session::{SessionHandle, ViewSession};
pub use view_source::{PagePart, ViewContentSource, ViewContentSourceCollection};
