//! Forced-Rerender Primitive

use std::fmt;

use crate::component::{use_state, RenderContext, StateSetter};

/// Requests one more render of the instance that created it.
///
/// Any number of calls before the next flush produce a single render. Calls
/// after the instance is unmounted do nothing.
#[derive(Clone)]
pub struct ForceUpdate {
    tick: StateSetter<u64>,
}

impl ForceUpdate {
    pub fn call(&self) {
        self.tick.update(|tick| tick.wrapping_add(1));
    }
}

impl fmt::Debug for ForceUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForceUpdate").finish_non_exhaustive()
    }
}

/// A [`ForceUpdate`] for the current instance.
pub fn use_force_update(cx: &mut RenderContext<'_>) -> ForceUpdate {
    let (_, tick) = use_state(cx, || 0u64);
    ForceUpdate { tick }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Host;
    use crate::dom::Node;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn mount_capturing(host: &Host) -> (crate::component::Root<()>, ForceUpdate) {
        let slot = Arc::new(Mutex::new(None));
        let captured = slot.clone();
        let root = host
            .mount(
                move |cx, _: &()| {
                    *captured.lock() = Some(use_force_update(cx));
                    Node::empty()
                },
                (),
            )
            .unwrap();
        let force = slot.lock().clone().unwrap();
        (root, force)
    }

    #[test]
    fn calls_coalesce_into_one_render() {
        let host = Host::new();
        let (root, force) = mount_capturing(&host);

        force.call();
        force.call();
        force.call();
        assert_eq!(host.flush().unwrap(), 1);
        assert_eq!(root.render_count(), 2);

        assert_eq!(host.flush().unwrap(), 0);
    }

    #[test]
    fn calls_after_unmount_are_ignored() {
        let host = Host::new();
        let (root, force) = mount_capturing(&host);
        root.unmount().unwrap();

        force.call();
        assert_eq!(host.pending_count(), 0);
        assert_eq!(host.flush().unwrap(), 0);
    }
}
