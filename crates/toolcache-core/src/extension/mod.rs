//! Extension messaging between the popup, content scripts and the background.
//!
//! The contexts share no memory. They talk through [`Port`]s connected to a
//! background task spawned by [`spawn_background`]; persistent state lives in
//! [`LocalStorage`](crate::storage::LocalStorage), separate from the response cache.

mod background;
mod channel;
mod detect;
mod menu;
mod protocol;
mod recent;

pub use background::{Background, MessageHandler, Reply, TabOpener};
pub use channel::{spawn_background, Envelope, MessengerHandle, Port};
pub use detect::is_pdf_url;
pub use menu::ContextMenu;
pub use protocol::{ContextKind, Message, MessageResponse, MessageSender};
pub use recent::{push_recent, RecentTools};
