//! Content renderers.
//!
//! One-shot builders that stamp a page template once per topic (or per image)
//! into the template's container. Each renderer captures a detached copy of
//! its template at construction, so the container can be cleared and
//! re-rendered any number of times. A page without the template simply gets
//! nothing rendered.

use crate::config::Selectors;
use crate::content::Topic;
use crate::dom::{Document, NodeId, Selector};
use crate::types::Season;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

/// Slug carried by a topic control.
pub const TOPIC_ATTR: &str = "data-topic";
/// Slug carried by gallery tabs and gallery slides.
pub const GALLERY_ID_ATTR: &str = "data-gallery-id";
/// Slug of the topic a gallery tab or slide points at.
pub const TOPIC_TARGET_ATTR: &str = "data-topic-target";

struct Template {
    prototype: NodeId,
    container: NodeId,
}

impl Template {
    fn capture(doc: &mut Document, selector: &Selector) -> Option<Self> {
        let Some(original) = doc.query(doc.root(), selector) else {
            debug!(%selector, "template missing, nothing to render");
            return None;
        };
        let container = doc.parent(original)?;
        let prototype = doc.clone_subtree(original);
        Some(Self {
            prototype,
            container,
        })
    }

    fn stamp(&self, doc: &mut Document) -> NodeId {
        doc.clone_subtree(self.prototype)
    }
}

/// First element named `tag` at or below `scope`.
fn first_tag(doc: &Document, scope: NodeId, tag: &str) -> Option<NodeId> {
    std::iter::once(scope)
        .chain(doc.descendants(scope))
        .find(|&n| doc.tag(n) == Some(tag))
}

fn self_or_descendant(doc: &Document, node: NodeId, selector: &Selector) -> Option<NodeId> {
    if doc.matches(node, selector) {
        Some(node)
    } else {
        doc.query(node, selector)
    }
}

/// Fills the topic list: one control per topic, tagged with its slug.
pub struct TopicRenderer;

impl TopicRenderer {
    /// Returns the number of topics rendered.
    pub fn render(doc: &mut Document, topics: &[Topic], selectors: &Selectors) -> usize {
        let Some(template) = Template::capture(doc, &selectors.topic_template) else {
            return 0;
        };
        let control = Selector::attribute(TOPIC_ATTR);
        doc.clear_children(template.container);
        for topic in topics {
            let item = template.stamp(doc);
            if let Some(button) = self_or_descendant(doc, item, &control) {
                doc.set_attr(button, TOPIC_ATTR, topic.slug.as_str());
            }
            if let Some(label) = first_tag(doc, item, "p") {
                doc.set_text(label, &topic.display_name);
            }
            doc.append_child(template.container, item);
        }
        topics.len()
    }
}

/// Fills the gallery tab list with one labelled tab per topic.
pub struct GalleryTabsRenderer;

impl GalleryTabsRenderer {
    /// Returns the number of tabs rendered.
    pub fn render(doc: &mut Document, topics: &[Topic], selectors: &Selectors) -> usize {
        let Some(template) = Template::capture(doc, &selectors.gallery_tab_item) else {
            return 0;
        };
        doc.clear_children(template.container);
        for topic in topics {
            let item = template.stamp(doc);
            if let Some(label) = first_tag(doc, item, "p") {
                doc.set_text(label, topic.tab_label());
                doc.set_attr(label, GALLERY_ID_ATTR, topic.slug.as_str());
                doc.set_attr(label, TOPIC_TARGET_ATTR, topic.slug.as_str());
            }
            doc.append_child(template.container, item);
        }
        topics.len()
    }
}

/// Gallery image slides for the current season, re-rendered on season change.
pub struct GalleryImageRenderer {
    doc: Rc<RefCell<Document>>,
    topics: Rc<[Topic]>,
    template: Option<Template>,
    season: Cell<Season>,
}

impl GalleryImageRenderer {
    pub fn new(
        doc: Rc<RefCell<Document>>,
        topics: Rc<[Topic]>,
        selectors: &Selectors,
        season: Season,
    ) -> Self {
        let template = Template::capture(&mut doc.borrow_mut(), &selectors.gallery_slide);
        Self {
            doc,
            topics,
            template,
            season: Cell::new(season),
        }
    }

    pub fn season(&self) -> Season {
        self.season.get()
    }

    /// Replace every slide with the current season's images, topics in
    /// order. Returns the number of slides rendered.
    pub fn render(&self) -> usize {
        let Some(template) = &self.template else {
            return 0;
        };
        let season = self.season.get();
        let mut doc = self.doc.borrow_mut();
        doc.clear_children(template.container);

        let mut count = 0;
        for topic in self.topics.iter() {
            for url in topic.season_images(season) {
                let slide = template.stamp(&mut doc);
                doc.set_attr(slide, GALLERY_ID_ATTR, topic.slug.as_str());
                doc.set_attr(slide, TOPIC_TARGET_ATTR, topic.slug.as_str());
                if let Some(img) = first_tag(&doc, slide, "img") {
                    doc.set_attr(img, "src", url);
                    doc.set_attr(img, "alt", topic.tab_label());
                }
                doc.append_child(template.container, slide);
                count += 1;
            }
        }
        debug!(%season, slides = count, "rendered gallery slides");
        count
    }

    pub fn update_season(&self, season: Season) -> usize {
        self.season.set(season);
        self.render()
    }
}
