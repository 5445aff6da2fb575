//! The readiness multiplexer: a thin, O(1)-dispatch wrapper over `mio`'s
//! epoll/kqueue abstraction (spec.md §4.3).

use std::io;
use std::time::Duration;

use mio::{Events, Interest, Poll, Registry, Token, Waker};
use smallvec::SmallVec;

/// Readiness tag handed back by [`ReadinessMultiplexer::wait`]. This is
/// exactly the value passed to `register`, so resolving a tag to its
/// originating device is a direct index/lookup on the caller's side —
/// never a scan of the device registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub usize);

impl From<Tag> for Token {
    fn from(tag: Tag) -> Self {
        Token(tag.0)
    }
}

impl From<Token> for Tag {
    fn from(token: Token) -> Self {
        Tag(token.0)
    }
}

/// Reserved tag for the hotplug watcher's wakeup channel. No device
/// registration is ever assigned this tag.
pub const HOTPLUG_TAG: Tag = Tag(usize::MAX);

const DEFAULT_EVENT_CAPACITY: usize = 64;
/// Ready-tag batches rarely exceed a handful of simultaneously-ready
/// devices; inline storage avoids a heap allocation on the hot path.
const INLINE_READY_TAGS: usize = 16;

pub type ReadyTags = SmallVec<[Tag; INLINE_READY_TAGS]>;

/// A cloneable handle to a multiplexer's registrations. `mio::Registry` is
/// `Send + Sync` and safe to use concurrently with the thread that owns the
/// `Poll` and calls `wait` — this is how callers off the acquisition-worker
/// thread (e.g. `set_filter` re-evaluation) add and remove device fds
/// without synchronizing with the worker's wait loop.
#[derive(Clone)]
pub struct RegistryHandle(Registry);

impl RegistryHandle {
    pub fn register(&self, source: &mut impl mio::event::Source, tag: Tag, interest: Interest) -> io::Result<()> {
        self.0.register(source, tag.into(), interest)
    }

    pub fn reregister(&self, source: &mut impl mio::event::Source, tag: Tag, interest: Interest) -> io::Result<()> {
        self.0.reregister(source, tag.into(), interest)
    }

    pub fn deregister(&self, source: &mut impl mio::event::Source) -> io::Result<()> {
        self.0.deregister(source)
    }

    /// Creates a `Waker` reporting `tag` when woken. Used to give the
    /// Hotplug Watcher an O(1) way to interrupt a blocked `wait` from
    /// another thread.
    pub fn waker(&self, tag: Tag) -> io::Result<Waker> {
        Waker::new(&self.0, tag.into())
    }
}

/// Wraps one `mio::Poll` instance. Device fds and the hotplug waker share a
/// single registry so a worker thread can block on all of them at once.
pub struct ReadinessMultiplexer {
    poll: Poll,
    events: Events,
}

impl ReadinessMultiplexer {
    pub fn new() -> io::Result<Self> {
        Ok(Self { poll: Poll::new()?, events: Events::with_capacity(DEFAULT_EVENT_CAPACITY) })
    }

    /// Returns a cloneable handle for registering/deregistering sources
    /// from any thread, independent of whoever is currently blocked in
    /// `wait`.
    pub fn registry_handle(&self) -> io::Result<RegistryHandle> {
        self.poll.registry().try_clone().map(RegistryHandle)
    }

    /// Blocks for at most `timeout`, returning the set of ready tags.
    /// Spurious empty wakeups are valid per spec.md §4.3 and simply
    /// surface as an empty batch rather than an error.
    pub fn wait(&mut self, timeout: Duration) -> io::Result<ReadyTags> {
        match self.poll.poll(&mut self.events, Some(timeout)) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => return Ok(ReadyTags::new()),
            Err(err) => return Err(err),
        }
        Ok(self.events.iter().map(|event| Tag::from(event.token())).collect())
    }
}
