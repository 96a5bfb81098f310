#![forbid(unsafe_code)]

//! weft public facade.
//!
//! Reactive state ([`weft_reactive`]) drives a keyed tree reconciler
//! ([`weft_render`]): [`mount`] wraps a view function in an effect, so any
//! state the view reads re-renders the container on the next flush.

mod app;

pub use app::{Mounted, mount};

pub mod prelude {
    pub use weft_core as core;
    pub use weft_reactive as reactive;
    pub use weft_render as render;

    pub use crate::{Mounted, mount};
    pub use weft_core::{Clock, LabClock, RuntimeConfig};
    pub use weft_reactive::{
        Computed, Effect, EffectOptions, Flush, ObjectRef, Observed, Reactive, Ref, Runtime,
        Scheduler, Value, WatchOptions,
    };
    pub use weft_render::{Event, Handlers, Host, NodeId, PropValue, Renderer, VNode};
}
