//! # Topic Sync
//!
//! Keeps every widget of a gallery-driven page in agreement about two things:
//! which topic is selected and which season is shown. The page carries its
//! content as data attributes; picking a topic in the topic list (or a tab of
//! the gallery) updates the gallery carousel, the hero and quote images, a
//! transient banner and the `?topic=` query parameter.
//!
//! # Architecture: One Owner, Many Listeners
//!
//! ```text
//!              ┌──────────────┐  TopicChange   ┌─────────────────────────┐
//! click ─────► │ TopicSelector│ ─────────────► │ hero, quote, gallery,   │
//! ?topic= ───► │ (only writer)│    TopicBus    │ banner (reactive only)  │
//!              └──────┬───────┘                └─────────────────────────┘
//!                     │ Session { topic, season }
//!              ┌──────┴───────────┐  direct calls
//! switch ────► │ SeasonController │ ─────────────► hero, slides, quote, gallery
//!              └──────────────────┘
//! ```
//!
//! - The topic selector is the only component that publishes topic changes
//!   and the only writer of the session's topic.
//! - Reactive widgets subscribe to the bus and never publish.
//! - The season controller never publishes: a season switch re-derives the
//!   images of the topic already selected.
//!
//! The browser is replaced by explicit collaborators: an arena [`dom`]
//! document, a virtual-clock [`scheduler`], an [`image`] loader trait and a
//! [`carousel`] trait. Headless implementations of each drive the CLI and the
//! tests.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`slug`] | Canonical topic identifiers derived from display labels |
//! | [`dom`] | Arena document, tolerant HTML parser and compound selectors |
//! | [`scheduler`] | Single-threaded event loop on a virtual clock |
//! | [`content`] | Reads topics and per-season images from the page's data source |
//! | [`render`] | Stamps topic controls, gallery tabs and gallery slides from templates |
//! | [`bus`] | Typed, synchronous topic-change notifications |
//! | [`session`] | Current topic and season, shared by reference |
//! | [`topic_selector`] | Owns the topic carousel; the single selection entry point |
//! | [`gallery`] | Keeps gallery tabs and the gallery carousel on the selected topic |
//! | [`hero`] | Hero image swap with preload, fade and transition guard |
//! | [`quote`] | Quote image swap with stale-load protection |
//! | [`banner`] | Transient "now showing" banner for manual selections |
//! | [`season`] | Season switch: session, ARIA and every season-aware widget |
//! | [`url_sync`] | Mirrors the selected topic into the page URL |
//! | [`image`] | Image loading trait, headless loader and preload cache |
//! | [`carousel`] | Carousel trait, headless carousel and factory |
//! | [`system`] | Mounts everything in order and exposes a snapshot of the page |
//! | [`markup`] | Page scaffold rendered from a `content.toml` with Maud |
//! | [`config`] | `config.toml` loading, stock defaults, merging and validation |
//! | [`types`] | Shared value types (`Season`, `TopicImages`) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Mount Order Instead of Timers
//!
//! Every widget that reacts to a topic change is constructed and subscribed
//! before the initial selection runs. The initial notification therefore
//! reaches every widget exactly once, with no "wait for the buttons to
//! render" delay. See [`system::GallerySystem::mount`].
//!
//! ## Deferred Callbacks, Never Nested Borrows
//!
//! Components share the document through `Rc<RefCell<_>>`. Anything that
//! would call back into a component (image completion, carousel slide
//! change, fades, banner timeouts) is queued on the [`scheduler`] and runs on
//! a later turn, so a `RefCell` borrow is never held across a callback.
//!
//! ## Selectors Are Configuration
//!
//! Every DOM anchor is a [`dom::Selector`] in [`config::Selectors`], so a
//! page with different class names only needs a `[selectors]` table, not a
//! code change.
//!
//! ## Absence Is Not an Error
//!
//! A page without a hero, a quote image, a banner or a season switch simply
//! gets no such widget. Unknown slugs, missing seasons and failed image loads
//! are logged and leave the page as it was.

pub mod banner;
pub mod bus;
pub mod carousel;
pub mod config;
pub mod content;
pub mod dom;
pub mod gallery;
pub mod hero;
pub mod image;
pub mod markup;
pub mod output;
pub mod quote;
pub mod render;
pub mod scheduler;
pub mod season;
pub mod session;
pub mod slug;
pub mod system;
pub mod topic_selector;
pub mod types;
pub mod url_sync;

#[cfg(test)]
pub(crate) mod test_helpers;
