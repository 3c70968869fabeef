//! Debug dump of the node table. Reads raw records only and never builds.

use super::document::{Document, DocumentData};
use super::node::{kind_code, NodeId, NodeType, FIELD_NEXT, FIELD_PARENT, FIELD_TYPE, NOT_PROCESSED, NULL};
use std::fmt;

/// A link as currently recorded
enum Link {
    Node(NodeId),
    Null,
    Pending,
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Node(id) => write!(f, "{id}"),
            Link::Null => f.write_str("null"),
            Link::Pending => f.write_str("not yet processed"),
        }
    }
}

fn kind_at(data: &DocumentData, id: NodeId) -> Option<NodeType> {
    NodeType::from_code(kind_code(data.records.read_field(id, FIELD_TYPE)))
}

/// What lies past the last built record
fn unbuilt(data: &DocumentData) -> Link {
    if data.complete { Link::Null } else { Link::Pending }
}

fn first_child(data: &DocumentData, id: NodeId) -> Link {
    if !matches!(kind_at(data, id), Some(NodeType::Element | NodeType::Document)) {
        return Link::Null;
    }
    let mut k = id + 1;
    while data.is_built(k) && kind_at(data, k).is_some_and(NodeType::is_attached) {
        k += 1;
    }
    if !data.is_built(k) {
        return unbuilt(data);
    }
    if data.records.read_field(k, FIELD_PARENT) == id {
        Link::Node(k)
    } else {
        Link::Null
    }
}

fn next_sibling(data: &DocumentData, id: NodeId) -> Link {
    match kind_at(data, id) {
        Some(NodeType::Element) => match data.records.read_field(id, FIELD_NEXT) {
            NOT_PROCESSED => Link::Pending,
            NULL => Link::Null,
            next => Link::Node(next),
        },
        Some(kind) if kind.is_leaf() => {
            let next = id + 1;
            if !data.is_built(next) {
                return unbuilt(data);
            }
            let same_parent = data.records.read_field(next, FIELD_PARENT)
                == data.records.read_field(id, FIELD_PARENT);
            if same_parent && !kind_at(data, next).is_some_and(NodeType::is_attached) {
                Link::Node(next)
            } else {
                Link::Null
            }
        }
        _ => Link::Null,
    }
}

impl Document {
    /// One descriptive line for a node, or a note that it is not built
    pub fn dump_node(&self, identity: NodeId) -> String {
        let Ok(data) = self.data.try_borrow() else {
            return format!("{identity}: store busy");
        };
        if identity >= NOT_PROCESSED || !data.is_built(identity) {
            return format!("{identity}: {}", unbuilt(&data));
        }
        let record = data.raw_record(identity);
        let handle = match data.store_ids.get((identity >> data.identity_bits) as usize) {
            Some(&store) => {
                let mask = (1u32 << data.identity_bits) - 1;
                format!("{:#x}", (store << data.identity_bits) | (identity & mask))
            }
            None => "none".to_string(),
        };
        let kind = kind_at(&data, identity);
        let parent = match record[FIELD_PARENT] {
            NULL => Link::Null,
            p => Link::Node(p),
        };
        format!(
            "{identity}: handle={handle} name={:?} exptype={} kind={} first-child={} next-sibling={} parent={parent} level={}",
            data.node_name(identity, &record),
            DocumentData::exptype_of_record(&record),
            kind.map_or("unknown", NodeType::label),
            first_child(&data, identity),
            next_sibling(&data, identity),
            data.raw_level(identity),
        )
    }

    /// Write every built node, one line each
    pub fn dump<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        let (built, complete) = match self.data.try_borrow() {
            Ok(data) => (data.records.slots_used(), data.complete),
            Err(_) => return writeln!(out, "store busy"),
        };
        for id in 0..=built {
            writeln!(out, "{}", self.dump_node(id))?;
        }
        if !complete {
            writeln!(out, "construction in progress")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::build::{BuildEvent, IterSource};
    use crate::config::DtmConfig;
    use crate::testing::{doc_from, scenario_a_events};

    #[test]
    fn test_dump_complete_document() {
        let doc = doc_from(scenario_a_events());
        let mut out = String::new();
        doc.dump(&mut out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("0: handle=0x0 name=\"#document\""));
        assert!(lines[1].contains("name=\"a\""));
        assert!(lines[1].contains("first-child=2"));
        assert!(lines[1].contains("next-sibling=null"));
        assert!(lines[2].contains("next-sibling=3"));
        assert!(lines[4].contains("kind=text"));
        assert!(lines[4].contains("parent=3 level=3"));
    }

    #[test]
    fn test_dump_never_builds() {
        let events = vec![
            BuildEvent::start("a"),
            BuildEvent::start("b"),
            BuildEvent::EndElement,
            BuildEvent::EndElement,
        ];
        let doc = crate::dom::Document::incremental(DtmConfig::default(), IterSource::from(events)).unwrap();
        assert!(doc.dump_node(1).contains("not yet processed"));
        // Pulling one event builds <a>, whose links are still open
        doc.demand_more(true).unwrap();
        let line = doc.dump_node(1);
        assert!(line.contains("first-child=not yet processed"));
        assert!(line.contains("next-sibling=not yet processed"));
        assert_eq!(doc.node_count(), 2);

        let mut out = String::new();
        doc.dump(&mut out).unwrap();
        assert!(out.ends_with("construction in progress\n"));
        assert_eq!(doc.node_count(), 2);
    }
}
