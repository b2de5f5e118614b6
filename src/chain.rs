use core::{
    hash::{Hash, Hasher},
    iter::FusedIterator,
};

use hashbrown::HashSet;
use rustc_hash::FxBuildHasher;

use crate::failure::Failure;

/// Walks a failure chain from the outermost failure to its root cause.
///
/// An absent failure produces an empty chain.
pub fn walk<'a>(outer: Option<&'a dyn Failure>) -> Chain<'a> {
    Chain {
        next: outer,
        visited: HashSet::default(),
    }
}

/// An iterator over a failure and all of its causes, outermost first.
///
/// The iterator borrows the chain and yields every node exactly once. A node
/// is identified by its address together with its concrete type, so a cause
/// stored inline at the start of its parent is still a distinct node. When a
/// cause was already yielded the chain contains a cycle; the walk ends at
/// the node that leads back and a warning is logged.
#[must_use]
pub struct Chain<'a> {
    next: Option<&'a dyn Failure>,
    visited: HashSet<NodeId<'a>, FxBuildHasher>,
}

/// Identity of a chain node: its address and its vtable.
#[derive(Clone, Copy)]
struct NodeId<'a>(&'a dyn Failure);

impl PartialEq for NodeId<'_> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.0, other.0)
    }
}

impl Eq for NodeId<'_> {}

impl Hash for NodeId<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::ptr::from_ref(self.0).hash(state);
    }
}

impl<'a> Chain<'a> {
    /// Starts a walk at `outer`.
    pub fn new(outer: &'a dyn Failure) -> Self {
        walk(Some(outer))
    }

    /// Returns `true` if the walk yields nothing more.
    pub fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a dyn Failure;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.visited.insert(NodeId(current));
        self.next = match current.cause() {
            Some(cause) if self.visited.contains(&NodeId(cause)) => {
                tracing::warn!(
                    type_name = cause.type_name(),
                    "failure chain revisits a node, stopping the walk"
                );
                None
            }
            cause => cause,
        };
        Some(current)
    }
}

impl FusedIterator for Chain<'_> {}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::Fault;

    #[test]
    fn test_walk_order() {
        let fault = Fault::new("A", "a").with_cause(Fault::new("B", "b").with_cause(Fault::new("C", "c")));
        let names: Vec<&str> = Chain::new(&fault).map(|node| node.type_name()).collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn test_walk_absent() {
        let mut chain = walk(None);
        assert!(chain.is_exhausted());
        assert!(chain.next().is_none());
    }

    #[test]
    fn test_walk_is_fused() {
        let fault = Fault::new("A", "a");
        let mut chain = Chain::new(&fault);
        assert!(chain.next().is_some());
        assert!(chain.next().is_none());
        assert!(chain.next().is_none());
    }

    struct Looping {
        name: &'static str,
        next: core::cell::Cell<Option<&'static Looping>>,
    }

    impl Failure for Looping {
        fn type_name(&self) -> &str {
            self.name
        }

        fn message(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.name))
        }

        fn cause(&self) -> Option<&dyn Failure> {
            self.next.get().map(|next| next as &dyn Failure)
        }
    }

    #[test]
    fn test_walk_stops_on_cycle() {
        let first: &'static Looping = Box::leak(Box::new(Looping {
            name: "first",
            next: core::cell::Cell::new(None),
        }));
        let second: &'static Looping = Box::leak(Box::new(Looping {
            name: "second",
            next: core::cell::Cell::new(Some(first)),
        }));
        first.next.set(Some(second));

        let mut chain = Chain::new(first);
        assert_eq!(chain.next().map(|node| node.type_name()), Some("first"));
        assert_eq!(chain.next().map(|node| node.type_name()), Some("second"));
        assert!(chain.is_exhausted());
        assert!(chain.next().is_none());
    }

    #[repr(C)]
    struct Envelope {
        payload: Payload,
        label: &'static str,
    }

    struct Payload {
        reason: &'static str,
    }

    impl Failure for Envelope {
        fn type_name(&self) -> &str {
            "Envelope"
        }

        fn message(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.label))
        }

        fn cause(&self) -> Option<&dyn Failure> {
            Some(&self.payload)
        }
    }

    impl Failure for Payload {
        fn type_name(&self) -> &str {
            "Payload"
        }

        fn message(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.reason))
        }
    }

    #[test]
    fn test_walk_inline_cause() {
        let envelope = Envelope {
            payload: Payload {
                reason: "root cause",
            },
            label: "outer",
        };
        assert_eq!(
            core::ptr::from_ref(&envelope).addr(),
            core::ptr::from_ref(&envelope.payload).addr()
        );

        let names: Vec<&str> = Chain::new(&envelope).map(|node| node.type_name()).collect();
        assert_eq!(names, ["Envelope", "Payload"]);
        assert_eq!(
            crate::aggregate_messages(walk(Some(&envelope))).unwrap(),
            "outer::root cause"
        );
    }
}
