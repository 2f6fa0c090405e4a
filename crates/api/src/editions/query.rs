//! SQL for the digital-edition and semantic-data tables.
//!
//! Pass-through endpoints select whole rows and return them as JSON objects;
//! rows the service inspects itself are cast to fixed types.

use sea_orm::Value;

pub fn manuscripts(publication_id: &str) -> (String, Vec<Value>) {
    (
        "SELECT * FROM manuscripts WHERE m_publication_id = ? ORDER BY m_sort".into(),
        vec![publication_id.into()],
    )
}

pub fn publications(publication_id: &str) -> (String, Vec<Value>) {
    (
        "SELECT * FROM publications WHERE p_id = ? ORDER BY p_title".into(),
        vec![publication_id.into()],
    )
}

/// Editions visible at `level`, oldest launch first.
pub fn editions(level: i64) -> (String, Vec<Value>) {
    (
        "SELECT ed_id AS id, ed_title AS title, ed_filediv AS divchapters \
         FROM publications_ed WHERE ed_lansering >= ? ORDER BY ed_datumlansering"
            .into(),
        vec![level.into()],
    )
}

pub fn edition_status(edition_id: &str) -> (String, Vec<Value>) {
    (
        "SELECT CAST(ed_id AS SIGNED) AS id, CAST(ed_lansering AS SIGNED) AS lansering, \
         CAST(ed_filediv AS CHAR) AS multiple_files \
         FROM publications_ed WHERE ed_id = ? LIMIT 1"
            .into(),
        vec![edition_id.into()],
    )
}

pub fn toc_root(edition_id: &str) -> (String, Vec<Value>) {
    (
        "SELECT * FROM tableofcontents \
         WHERE toc_ed_id = ? AND toc_group_id IS NULL AND toc_groupid IS NULL \
         ORDER BY sortOrder"
            .into(),
        vec![edition_id.into()],
    )
}

pub fn toc_group(edition_id: &str, group_id: &str) -> (String, Vec<Value>) {
    (
        "SELECT * FROM tableofcontents \
         WHERE toc_ed_id = ? AND toc_groupid = ? AND toc_linkType != 6 \
         ORDER BY sortOrder"
            .into(),
        vec![edition_id.into(), group_id.into()],
    )
}

/// Rows making up the table-of-contents tree. Headings have no link type, so
/// the link-type filter must let `NULL` through.
pub fn toc_tree(edition_id: &str) -> (String, Vec<Value>) {
    (
        "SELECT CAST(toc_id AS SIGNED) AS toc_id, CAST(title AS CHAR) AS title, \
         CAST(titleLevel AS SIGNED) AS title_level, CAST(toc_groupid AS SIGNED) AS group_id, \
         CAST(toc_linkType AS SIGNED) AS link_type, CAST(toc_ed_id AS SIGNED) AS edition_id, \
         CAST(toc_linkID AS CHAR) AS link_id, CAST(sortOrder AS SIGNED) AS sort_order \
         FROM tableofcontents \
         WHERE toc_ed_id = ? AND (toc_linkType IS NULL OR toc_linkType != 6) \
         AND toc_group_id IS NULL \
         ORDER BY toc_groupid, sortOrder"
            .into(),
        vec![edition_id.into()],
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

/// The entry before or after `link_id` with the same link type. When
/// `same_group` is set the neighbour must also share the TOC group.
pub fn toc_neighbour(
    edition_id: &str,
    link_id: &str,
    same_group: bool,
    direction: Direction,
) -> (String, Vec<Value>) {
    let group = if same_group {
        "t1.toc_groupid = t2.toc_groupid AND "
    } else {
        ""
    };
    let (cmp, order) = match direction {
        Direction::Prev => ("<", "DESC"),
        Direction::Next => (">", "ASC"),
    };
    (
        format!(
            "SELECT t1.title AS title, t1.toc_ed_id AS edition_id, t1.toc_linkID AS link_id \
             FROM tableofcontents t1 LEFT JOIN tableofcontents t2 \
             ON {group}t1.toc_linkType = t2.toc_linkType AND t1.toc_ed_id = t2.toc_ed_id \
             WHERE t2.toc_ed_id = ? AND t2.toc_linkID = ? AND t1.toc_id {cmp} t2.toc_id \
             ORDER BY t1.sortOrder {order} LIMIT 1"
        ),
        vec![edition_id.into(), link_id.into()],
    )
}

pub fn toc_first(edition_id: &str) -> (String, Vec<Value>) {
    (
        "SELECT title, toc_ed_id, toc_linkID FROM tableofcontents \
         WHERE toc_ed_id = ? AND toc_linkID IS NOT NULL ORDER BY sortOrder ASC LIMIT 1"
            .into(),
        vec![edition_id.into()],
    )
}

pub fn person_tooltip(person_id: &str) -> (String, Vec<Value>) {
    (
        "SELECT c_webbnamn_1_sort AS title, ed_tooltip AS content, c_webbfornamn1, c_webbefternamn1 \
         FROM persons WHERE id_p = ? LIMIT 1"
            .into(),
        vec![person_id.into()],
    )
}

pub fn persons(data_source_id: &str) -> (String, Vec<Value>) {
    (
        "SELECT c_webbnamn_1_sort AS title, ed_tooltip AS content, c_webbfornamn1, \
         c_webbefternamn1, ed_tooltip, id_p, c_webbsok \
         FROM persons WHERE data_source_id = ? ORDER BY id_p ASC"
            .into(),
        vec![data_source_id.into()],
    )
}

pub fn place_tooltip(place_id: &str) -> (String, Vec<Value>) {
    (
        "SELECT o_ortnamn AS title, o_beskrivning AS content FROM places WHERE id = ? LIMIT 1".into(),
        vec![place_id.into()],
    )
}

pub fn places() -> (String, Vec<Value>) {
    (
        "SELECT c_webbsok, o_id AS id FROM places ORDER BY o_id ASC".into(),
        Vec::new(),
    )
}
