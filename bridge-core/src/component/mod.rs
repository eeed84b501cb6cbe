//! Component Model
//!
//! A minimal hook-based component host: mounting, hook slots, a coalescing
//! update queue and class-style components. It renders by replacing each
//! instance's output; there is no diffing.

mod class;
pub mod hooks;
mod host;
mod instance;
mod scheduler;

pub use class::{ClassComponent, ClassContext};
pub use hooks::{use_layout_effect, use_memo, use_ref, use_state, Ref, StateSetter};
pub use host::{Host, Root, Updater, WeakHost, WeakRoot};
pub use instance::{Cleanup, InstanceId, RenderContext};
pub use scheduler::UpdateQueue;
