//! SQL for the OAI metadata tables.
//!
//! Every builder returns the statement text with `?` placeholders and the
//! values to bind. Columns are cast to `CHAR` so rows decode uniformly into
//! optional strings regardless of the underlying column type.

use sea_orm::Value;

use super::request::{OaiSet, RecordFilter};

const DATESTAMP: &str = "GREATEST(digitalObjects.date_modify, intellectualEntities.date_modify, samlingar.date_modify)";

const ITEM_JOIN: &str = "FROM digitalObjects \
     JOIN intellectualEntities ON digitalObjects.c_ienummer = intellectualEntities.nummer \
     JOIN samlingar ON intellectualEntities.c_samlingsnummer = samlingar.nummer";

const COLLECTION_JOIN: &str = "FROM samlingar \
     LEFT JOIN intellectualEntities ON intellectualEntities.c_samlingsnummer = samlingar.nummer \
     LEFT JOIN digitalObjects ON digitalObjects.c_ienummer = intellectualEntities.nummer";

const ITEM_COLUMNS: &[(&str, &str)] = &[
    ("digitalObjects.identifier", "identifier"),
    ("digitalObjects.to_europeana", "to_europeana"),
    ("digitalObjects.status", "status"),
    ("digitalObjects.DC2_type", "dc2_type"),
    ("digitalObjects.entity_label", "entity_label"),
    ("digitalObjects.duration", "duration"),
    ("digitalObjects.filetype_MIME", "filetype_mime"),
    ("digitalObjects.derivate_filepath", "derivate_filepath"),
    ("digitalObjects.ESE_type", "ese_type"),
    ("digitalObjects.europeanaRights", "europeana_rights"),
    ("samlingar.to_ndb", "to_ndb"),
    ("samlingar.arkivetsNamn", "arkivets_namn"),
    ("samlingar.c_signum", "c_signum"),
    ("intellectualEntities.dc_title", "dc_title"),
    ("intellectualEntities.dc_type2", "dc_type2"),
    ("intellectualEntities.dc_type2_eng", "dc_type2_eng"),
    ("intellectualEntities.dc_subject", "dc_subject"),
    ("intellectualEntities.dc_description", "dc_description"),
    ("intellectualEntities.dc_source", "dc_source"),
    ("intellectualEntities.dcterms_spatial", "dcterms_spatial"),
    ("intellectualEntities.dcterms_spatial2", "dcterms_spatial2"),
    ("intellectualEntities.dcterms_spatial3", "dcterms_spatial3"),
    ("intellectualEntities.dcterms_spatial4", "dcterms_spatial4"),
    ("intellectualEntities.dcterms_created_maskinlasbart", "dcterms_created"),
    ("intellectualEntities.dcterms_isReferencedBy", "dcterms_is_referenced_by"),
    ("intellectualEntities.dc_identifier", "dc_identifier"),
    ("intellectualEntities.dc_source_dimensions", "dc_source_dimensions"),
    ("intellectualEntities.dc_source2", "dc_source2"),
    ("intellectualEntities.dc_creator", "dc_creator"),
    ("intellectualEntities.dc_publisher", "dc_publisher"),
    ("intellectualEntities.dc_publisher2", "dc_publisher2"),
    ("intellectualEntities.dc_rights", "dc_rights"),
    ("intellectualEntities.DCterms_issued", "dcterms_issued"),
    ("intellectualEntities.dc_language", "dc_language"),
    ("intellectualEntities.c_isReferencedBy_URL", "referenced_by_url"),
];

const COLLECTION_COLUMNS: &[(&str, &str)] = &[
    ("samlingar.nummer", "nummer"),
    ("samlingar.c_signum", "c_signum"),
    ("samlingar.to_europeana", "to_europeana"),
    ("samlingar.to_ndb", "to_ndb"),
    ("samlingar.status", "status"),
    ("samlingar.arkivetsTyp", "arkivets_typ"),
    ("samlingar.arkivetsNamn", "arkivets_namn"),
    ("samlingar.c_tid_arkivetsInnehall", "tid_innehall"),
    ("samlingar.c_tid_arkivetsInnehall_maskin", "tid_innehall_maskin"),
    ("samlingar.c_tid_arkivetInsamlat", "tid_insamlat"),
    ("samlingar.c_tid_arkivetInsamlat_maskin", "tid_insamlat_maskin"),
    ("samlingar.c_tid_arkivetInlamnat", "tid_inlamnat"),
    ("samlingar.c_tid_arkivetInlamnat_maskin", "tid_inlamnat_maskin"),
    ("samlingar.projekt", "projekt"),
    ("samlingar.omfattning_hyllmeter", "omfattning_hyllmeter"),
    ("samlingar.omfattning_arkivenheter", "omfattning_arkivenheter"),
    ("samlingar.omfattning_sidor", "omfattning_sidor"),
    ("samlingar.omfattning_filmer", "omfattning_filmer"),
    ("samlingar.omfattning_fotografier", "omfattning_fotografier"),
    ("samlingar.omfattning_ljudband", "omfattning_ljudband"),
    ("samlingar.omfattning_skisser", "omfattning_skisser"),
    ("samlingar.omfattning_kartor", "omfattning_kartor"),
    ("samlingar.sprak", "sprak"),
    ("samlingar.slsArkiv", "sls_arkiv"),
    ("samlingar.arkivetsPlacering", "arkivets_placering"),
    ("samlingar.c_listaPersonerRoll_webb", "personer_roll"),
    ("samlingar.amnesord", "amnesord"),
    ("samlingar.c_listaPlatser", "platser"),
    ("samlingar.c_listaPlatser_fin", "platser_fin"),
    ("samlingar.c_omArkivbildaren_webb", "om_arkivbildaren"),
    ("samlingar.arkivetsInnehall", "arkivets_innehall"),
    ("samlingar.anmarkningarExterna", "anmarkningar_externa"),
    ("samlingar.anmarkningarReferens", "anmarkningar_referens"),
    ("samlingar.nyttjanderatt", "nyttjanderatt"),
];

const ENTITY_COLUMNS: &[(&str, &str)] = &[
    ("intellectualEntities.nummer", "nummer"),
    ("intellectualEntities.c_title", "c_title"),
    ("intellectualEntities.dcterms_created_maskinlasbart", "dcterms_created"),
    ("intellectualEntities.finna_unitid", "finna_unitid"),
    ("intellectualEntities.dc_source_dimensions", "dc_source_dimensions"),
    ("intellectualEntities.dc_source2", "dc_source2"),
    ("intellectualEntities.dc_language", "dc_language"),
    ("intellectualEntities.c_isReferencedBy_URL", "referenced_by_url"),
    ("intellectualEntities.dc_description", "dc_description"),
    ("intellectualEntities.dcterms_isReferencedBy", "dcterms_is_referenced_by"),
    ("intellectualEntities.dc_rights", "dc_rights"),
    ("intellectualEntities.rights_fin", "rights_fin"),
    ("intellectualEntities.rights_eng", "rights_eng"),
    ("intellectualEntities.dc_type", "dc_type"),
    ("intellectualEntities.dc_type2", "dc_type2"),
    ("intellectualEntities.dc_creator", "dc_creator"),
    ("intellectualEntities.dc_subject", "dc_subject"),
    ("intellectualEntities.dcterms_spatial_full", "dcterms_spatial_full"),
    ("intellectualEntities.dcterms_spatial_fin", "dcterms_spatial_fin"),
];

fn text_columns(columns: &[(&str, &str)]) -> String {
    columns
        .iter()
        .map(|(expr, alias)| format!("CAST({expr} AS CHAR) AS {alias}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Append the `from`/`until`/`set` conditions to a `WHERE` clause.
fn push_filter(sql: &mut String, values: &mut Vec<Value>, filter: &RecordFilter) {
    if let Some(set) = filter.set {
        sql.push_str(match set {
            OaiSet::Europeana => " AND digitalObjects.to_europeana = 'europeana'",
            OaiSet::Finna => " AND samlingar.to_ndb = 'finna'",
        });
    }
    if let Some(from) = filter.from {
        sql.push_str(&format!(" AND {DATESTAMP} >= ?"));
        values.push(from.format("%Y-%m-%d").to_string().into());
    }
    if let Some(until) = filter.until {
        sql.push_str(&format!(" AND {DATESTAMP} <= ?"));
        values.push(until.format("%Y-%m-%d").to_string().into());
    }
}

pub fn earliest_datestamp() -> (String, Vec<Value>) {
    (
        format!("SELECT CAST(DATE_FORMAT(MIN({DATESTAMP}), '%Y-%m-%d') AS CHAR) AS datestamp {ITEM_JOIN}"),
        Vec::new(),
    )
}

fn item_select() -> String {
    format!(
        "SELECT {}, CAST(DATE_FORMAT({DATESTAMP}, '%Y-%m-%d') AS CHAR) AS datestamp {ITEM_JOIN} WHERE 1 = 1",
        text_columns(ITEM_COLUMNS)
    )
}

pub fn list_items(filter: &RecordFilter) -> (String, Vec<Value>) {
    let mut sql = item_select();
    let mut values = Vec::new();
    push_filter(&mut sql, &mut values, filter);
    sql.push_str(" ORDER BY digitalObjects.nummer");
    (sql, values)
}

pub fn get_item(identifier: &str) -> (String, Vec<Value>) {
    let mut sql = item_select();
    sql.push_str(" AND digitalObjects.identifier = ?");
    (sql, vec![identifier.into()])
}

fn collection_select() -> String {
    format!(
        "SELECT {}, CAST(DATE_FORMAT(MAX({DATESTAMP}), '%Y-%m-%d') AS CHAR) AS datestamp {COLLECTION_JOIN} WHERE 1 = 1",
        text_columns(COLLECTION_COLUMNS)
    )
}

pub fn list_collections(filter: &RecordFilter) -> (String, Vec<Value>) {
    let mut sql = collection_select();
    let mut values = Vec::new();
    push_filter(&mut sql, &mut values, filter);
    sql.push_str(" GROUP BY samlingar.c_signum ORDER BY samlingar.c_signum");
    (sql, values)
}

pub fn get_collection(signum: &str) -> (String, Vec<Value>) {
    let mut sql = collection_select();
    sql.push_str(" AND samlingar.c_signum = ? GROUP BY samlingar.c_signum");
    (sql, vec![signum.into()])
}

pub fn collection_entities(collection: &str) -> (String, Vec<Value>) {
    (
        format!(
            "SELECT {} FROM intellectualEntities WHERE intellectualEntities.c_samlingsnummer = ? \
             ORDER BY intellectualEntities.nummer",
            text_columns(ENTITY_COLUMNS)
        ),
        vec![collection.into()],
    )
}

pub fn collection_urns(collection: &str) -> (String, Vec<Value>) {
    (
        "SELECT CAST(URN.id_IE AS CHAR) AS entity, CAST(URN.URN AS CHAR) AS urn FROM URN \
         JOIN intellectualEntities ON URN.id_IE = intellectualEntities.nummer \
         WHERE intellectualEntities.c_samlingsnummer = ?"
            .to_owned(),
        vec![collection.into()],
    )
}

pub fn collection_objects(collection: &str) -> (String, Vec<Value>) {
    (
        "SELECT CAST(digitalObjects.nummer AS CHAR) AS nummer, \
         CAST(digitalObjects.c_ienummer AS CHAR) AS entity, \
         CAST(digitalObjects.entity_label AS CHAR) AS entity_label FROM digitalObjects \
         JOIN intellectualEntities ON digitalObjects.c_ienummer = intellectualEntities.nummer \
         WHERE intellectualEntities.c_samlingsnummer = ? ORDER BY digitalObjects.entity_order"
            .to_owned(),
        vec![collection.into()],
    )
}

pub fn collection_derivates(collection: &str) -> (String, Vec<Value>) {
    (
        "SELECT CAST(derivateObjects.c_do AS CHAR) AS object, \
         CAST(derivateObjects.roleTitle AS CHAR) AS role_title, \
         CAST(derivateObjects.filePath AS CHAR) AS file_path FROM derivateObjects \
         JOIN digitalObjects ON derivateObjects.c_do = digitalObjects.nummer \
         JOIN intellectualEntities ON digitalObjects.c_ienummer = intellectualEntities.nummer \
         WHERE intellectualEntities.c_samlingsnummer = ? ORDER BY digitalObjects.entity_order"
            .to_owned(),
        vec![collection.into()],
    )
}
