//! Shared test fixtures

use crate::build::{AttributeEvent, BuildEvent};
use crate::config::DtmConfig;
use crate::dom::namespace::ns;
use crate::dom::Document;

/// Route `log` output through env_logger; safe to call from every test
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn doc_from(events: Vec<BuildEvent>) -> Document {
    doc_with(DtmConfig::default(), events)
}

pub(crate) fn doc_with(config: DtmConfig, events: Vec<BuildEvent>) -> Document {
    init_logging();
    Document::from_events(config, events).unwrap()
}

/// `<a><b/><c>text</c></a>`: doc 0, a 1, b 2, c 3, text 4
pub(crate) fn scenario_a_events() -> Vec<BuildEvent> {
    vec![
        BuildEvent::StartDocument,
        BuildEvent::start("a"),
        BuildEvent::start("b"),
        BuildEvent::EndElement,
        BuildEvent::start("c"),
        BuildEvent::text("text"),
        BuildEvent::EndElement,
        BuildEvent::EndElement,
        BuildEvent::EndDocument,
    ]
}

/// `<a xmlns:p="urn:x"><p:b/></a>`: a 1, declaration 2, b 3
pub(crate) fn scenario_b_events() -> Vec<BuildEvent> {
    vec![
        BuildEvent::start_with(
            "a",
            vec![AttributeEvent::from_qname("xmlns:p", ns::XMLNS, "urn:x")],
        ),
        BuildEvent::start_ns("urn:x", "p:b"),
        BuildEvent::EndElement,
        BuildEvent::EndElement,
    ]
}

/// Complete balanced tree of elements `e`, `depth` levels below the root,
/// `fanout` children each, with a text leaf under every bottom element
pub(crate) fn balanced_tree_events(depth: u32, fanout: u32) -> Vec<BuildEvent> {
    fn level(out: &mut Vec<BuildEvent>, depth: u32, fanout: u32) {
        if depth == 0 {
            out.push(BuildEvent::text("leaf"));
            return;
        }
        for _ in 0..fanout {
            out.push(BuildEvent::start("e"));
            level(out, depth - 1, fanout);
            out.push(BuildEvent::EndElement);
        }
    }
    let mut out = vec![BuildEvent::start("root")];
    level(&mut out, depth, fanout);
    out.push(BuildEvent::EndElement);
    out
}

/// Flat document: a root with `count` empty children
pub(crate) fn wide_events(count: usize) -> Vec<BuildEvent> {
    let mut out = Vec::with_capacity(count * 2 + 2);
    out.push(BuildEvent::start("root"));
    for _ in 0..count {
        out.push(BuildEvent::start("item"));
        out.push(BuildEvent::EndElement);
    }
    out.push(BuildEvent::EndElement);
    out
}
