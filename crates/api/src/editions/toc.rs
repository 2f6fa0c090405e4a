//! Table-of-contents tree assembly.

use std::collections::HashMap;

use sea_orm::FromQueryResult;
use serde::Serialize;
use tracing::debug;

/// One `tableofcontents` row as needed for the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromQueryResult)]
pub struct TocRow {
    pub toc_id: i64,
    pub title: Option<String>,
    pub title_level: Option<i64>,
    pub group_id: Option<i64>,
    pub link_type: Option<i64>,
    pub edition_id: Option<i64>,
    pub link_id: Option<String>,
    pub sort_order: Option<i64>,
}

/// A top-level entry of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocSection {
    pub id: i64,
    pub title: Option<String>,
    #[serde(rename = "titleLevel")]
    pub title_level: Option<i64>,
    pub items: Vec<TocNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TocNode {
    Heading {
        id: i64,
        title: Option<String>,
        items: Vec<TocNode>,
    },
    Link {
        id: i64,
        title: Option<String>,
        link: String,
        link_type: Option<i64>,
        sort_order: Option<i64>,
    },
}

/// Build the tree from rows in display order.
///
/// Rows without a group become sections. Within a group, rows without a link
/// type open a sub-heading and linked rows are attached to the most recent
/// sub-heading of their group, or to the section itself before the first one.
/// Rows pointing at a group that is not a section are dropped.
pub fn build(rows: &[TocRow]) -> Vec<TocSection> {
    let mut sections: Vec<TocSection> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for row in rows.iter().filter(|r| r.group_id.is_none()) {
        if index.contains_key(&row.toc_id) {
            continue;
        }
        index.insert(row.toc_id, sections.len());
        sections.push(TocSection {
            id: row.toc_id,
            title: row.title.clone(),
            title_level: row.title_level,
            items: Vec::new(),
        });
    }

    // Position of the latest heading inside each section's items.
    let mut current_heading: HashMap<usize, usize> = HashMap::new();

    for row in rows {
        let Some(group) = row.group_id else { continue };
        let Some(&section_idx) = index.get(&group) else {
            debug!(toc_id = row.toc_id, group, "TOC row references unknown group");
            continue;
        };
        let section = &mut sections[section_idx];

        if row.link_type.is_none() {
            current_heading.insert(section_idx, section.items.len());
            section.items.push(TocNode::Heading {
                id: row.toc_id,
                title: row.title.clone(),
                items: Vec::new(),
            });
            continue;
        }

        let link = TocNode::Link {
            id: row.toc_id,
            title: row.title.clone(),
            link: format!(
                "{}_{}",
                row.edition_id.map(|e| e.to_string()).unwrap_or_default(),
                row.link_id.as_deref().unwrap_or_default()
            ),
            link_type: row.link_type,
            sort_order: row.sort_order,
        };
        if let Some(&i) = current_heading.get(&section_idx) {
            if let Some(TocNode::Heading { items, .. }) = section.items.get_mut(i) {
                items.push(link);
                continue;
            }
        }
        section.items.push(link);
    }

    sections
}
