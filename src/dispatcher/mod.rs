//! Event Dispatcher
//!
//! Decouples transport frames from application reactions.
//!
//! ## Architecture
//!
//! - **Events**: closed set of event kinds and their payloads
//! - **Router**: maps inbound frames to events (`pong` is swallowed,
//!   unknown types fall back to `message`)
//! - **Registry**: listener registrations and synchronous delivery
//!
//! ## Example
//!
//! ```rust
//! use notifylink::dispatcher::{Event, EventDispatcher, EventKind};
//!
//! let dispatcher = EventDispatcher::new();
//! let sub = dispatcher.on(EventKind::UnreadCount, |event| {
//!     if let Event::UnreadCount(count) = event {
//!         println!("unread: {:?}", count.value());
//!     }
//! });
//!
//! // Later, on teardown
//! sub.unsubscribe();
//! ```

mod events;
mod registry;
mod router;

pub use events::{Event, EventKind};
pub use registry::{EventDispatcher, Listener, ListenerId, Subscription};
pub use router::{route, route_text, Routed};
