#![forbid(unsafe_code)]

//! Virtual tree reconciliation.
//!
//! A [`VNode`] tree describes what a container should hold; the
//! [`Renderer`] compares it with the tree rendered there last time and
//! issues the smallest set of create, move, update and remove operations it
//! can find against a [`Host`].
//!
//! - [`vnode`]: node kinds, keys, props and children.
//! - [`host`]: the operation set a platform supplies.
//! - [`renderer`]: mount, patch and unmount dispatch.
//! - `keyed`: the two-ended keyed children diff.
//! - [`events`]: listener invokers with attach-time filtering.
//!
//! # Example
//!
//! ```ignore
//! let mut renderer = Renderer::new(host);
//! renderer.render(Some(VNode::element("ul").children(items)), root)?;
//! ```

pub mod error;
pub mod events;
pub mod host;
mod keyed;
pub mod renderer;
pub mod vnode;


pub use error::{RenderError, Result};
pub use events::{Event, EventInvoker, Handler, Handlers, ListenerChange, ListenerTable};
pub use host::Host;
pub use renderer::{PatchStats, Renderer};
pub use vnode::{Children, Key, NodeId, NodeKind, PropValue, Props, VNode};
