//! OAI-PMH response documents.

use chrono::{DateTime, Utc};

use super::error::OaiError;
use super::request::{MetadataPrefix, OaiRequest, OaiSet, Verb};
use super::store::{CollectionItem, CollectionRecord, ItemRecord};
use super::xml::Element;
use crate::config::OaiConfig;

const NS_OAI: &str = "http://www.openarchives.org/OAI/2.0/";
const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
const NS_OAI_DC: &str = "http://www.openarchives.org/OAI/2.0/oai_dc/";
const NS_EAD: &str = "http://www.loc.gov/ead";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
const NS_DCTERMS: &str = "http://purl.org/dc/terms/";
const NS_EUROPEANA: &str = "http://www.europeana.eu/schemas/ese/";
const NS_XLINK: &str = "http://www.w3.org/1999/xlink";
const SCHEMA_LOCATION: &str =
    "http://www.openarchives.org/OAI/2.0/ http://www.openarchives.org/OAI/2.0/OAI-PMH.xsd";

const PROVIDER: &str = "National Formula agreement";
const DATA_PROVIDER: &str = "Svenska litteratursällskapet i Finland";
const CC_BY_4: &str = "CC BY 4.0";
const CC_BY_4_URL: &str = "https://creativecommons.org/licenses/by/4.0/";

const LANG_SV: [(&str, &str); 1] = [("xml:lang", "sv")];
const LANG_EN: [(&str, &str); 1] = [("xml:lang", "en")];
const W3CDTF: [(&str, &str); 1] = [("xsi:type", "dcterms:W3CDTF")];

/// Repository identity used by `Identify` and record rendering.
#[derive(Debug, Clone)]
pub struct Repository {
    pub name: String,
    pub admin_email: String,
    pub accessfile_base_url: String,
}

impl From<&OaiConfig> for Repository {
    fn from(cfg: &OaiConfig) -> Self {
        Self {
            name: cfg.repository_name.clone(),
            admin_email: cfg.admin_email.clone(),
            accessfile_base_url: cfg.accessfile_base_url.clone(),
        }
    }
}

/// The data a successful request resolved to.
#[derive(Debug, Clone)]
pub enum Payload {
    Identify { earliest_datestamp: Option<String> },
    ListSets,
    ListMetadataFormats,
    Items(Vec<ItemRecord>),
    Collections(Vec<(CollectionRecord, Vec<CollectionItem>)>),
}

pub struct Envelope<'a> {
    pub base_url: &'a str,
    pub response_date: DateTime<Utc>,
    pub repository: &'a Repository,
}

impl Envelope<'_> {
    fn root(&self, record_namespaces: bool) -> Element {
        let mut root = Element::new("OAI-PMH").with_attr("xmlns", NS_OAI);
        if record_namespaces {
            root.set_attr("xmlns:oai_dc", NS_OAI_DC);
            root.set_attr("xmlns:ead", NS_EAD);
            root.set_attr("xmlns:dc", NS_DC);
            root.set_attr("xmlns:xsi", NS_XSI);
            root.set_attr("xmlns:dcterms", NS_DCTERMS);
            root.set_attr("xmlns:europeana", NS_EUROPEANA);
            root.set_attr("xmlns:xlink", NS_XLINK);
        } else {
            root.set_attr("xmlns:xsi", NS_XSI);
        }
        root.set_attr("xsi:schemaLocation", SCHEMA_LOCATION);
        root.text_child(
            "responseDate",
            Some(self.response_date.format("%Y-%m-%dT%H:%M:%SZ").to_string().as_str()),
        );
        root
    }

    /// Render an error document. `verb` is echoed on the `request` element
    /// when it was recognised.
    pub fn error(&self, verb: Option<Verb>, error: &OaiError) -> Element {
        let mut root = self.root(false);
        let request = root.push(Element::new("request").with_text(self.base_url));
        if let Some(verb) = verb {
            request.set_attr("verb", verb.as_str());
        }
        root.text_child_with("error", Some(error.to_string().as_str()), &[("code", error.code())]);
        root
    }

    /// Render the response for a validated request.
    pub fn response(&self, req: &OaiRequest, payload: &Payload) -> Element {
        let mut root = self.root(req.verb.is_record_verb());

        let request = root.push(
            Element::new("request")
                .with_text(self.base_url)
                .with_attr("verb", req.verb.as_str()),
        );
        if req.verb.is_record_verb() {
            if let Some(prefix) = req.metadata_prefix {
                request.set_attr("metadataPrefix", prefix.as_str());
            }
            if let Some(from) = req.filter.from {
                request.set_attr("from", from.format("%Y-%m-%d").to_string());
            }
            if let Some(until) = req.filter.until {
                request.set_attr("until", until.format("%Y-%m-%d").to_string());
            }
            if let Some(set) = req.filter.set {
                request.set_attr("set", set.spec());
            }
        }
        if let Some(identifier) = &req.identifier {
            request.set_attr("identifier", identifier.as_str());
        }

        let container = root.child(req.verb.as_str());
        match payload {
            Payload::Identify { earliest_datestamp } => {
                self.identify(container, earliest_datestamp.as_deref())
            }
            Payload::ListSets => list_sets(container),
            Payload::ListMetadataFormats => list_metadata_formats(container),
            Payload::Items(items) => {
                let europeana = req.metadata_prefix == Some(MetadataPrefix::Europeana);
                for item in items {
                    self.item(container, item, europeana, req.verb);
                }
            }
            Payload::Collections(collections) => {
                for (collection, items) in collections {
                    collection_record(container, collection, items, req.verb);
                }
            }
        }
        root
    }

    fn identify(&self, parent: &mut Element, earliest: Option<&str>) {
        parent.text_child("repositoryName", Some(self.repository.name.as_str()));
        parent.text_child("baseURL", Some(self.base_url));
        parent.text_child("protocolVersion", Some("2.0"));
        parent.text_child("adminEmail", Some(self.repository.admin_email.as_str()));
        parent.text_child("earliestDatestamp", earliest);
        parent.text_child("deletedRecord", Some("persistent"));
        parent.text_child("granularity", Some("YYYY-MM-DD"));
    }

    fn accessfile_url(&self, path: Option<&str>) -> Option<String> {
        path.filter(|p| !p.is_empty())
            .map(|p| format!("{}{}", self.repository.accessfile_base_url, p))
    }

    fn item(&self, parent: &mut Element, rec: &ItemRecord, europeana: bool, verb: Verb) {
        let Some(record) = record_header(
            parent,
            verb,
            rec.identifier.as_deref(),
            rec.datestamp.as_deref(),
            rec.to_europeana.as_deref(),
            rec.to_ndb.as_deref(),
            rec.status.as_deref(),
        ) else {
            return;
        };

        let metadata = record.child("metadata");
        let c = metadata.child(if europeana { "europeana:record" } else { "oai_dc:dc" });

        let kind = rec.dc2_type.as_deref().map(str::to_lowercase);
        let is_sound = kind.as_deref() == Some("sound");
        let is_text = kind.as_deref() == Some("text");

        c.text_child("dc:title", rec.dc_title.as_deref());
        c.text_child_with("dc:type", rec.dc_type2.as_deref(), &LANG_SV);
        if is_sound {
            c.text_child_with("dc:type", rec.entity_label.as_deref(), &LANG_SV);
        }
        c.text_child_with("dc:type", rec.dc_type2_eng.as_deref(), &LANG_EN);
        c.split_children("dc:subject", rec.dc_subject.as_deref(), ", ", &LANG_SV);
        c.text_child_with("dc:description", rec.dc_description.as_deref(), &LANG_SV);
        if is_text {
            c.text_child_with("dc:description", rec.entity_label.as_deref(), &LANG_SV);
        }
        c.text_child("dc:source", rec.dc_source.as_deref());

        let spatial = [
            &rec.dcterms_spatial,
            &rec.dcterms_spatial2,
            &rec.dcterms_spatial3,
            &rec.dcterms_spatial4,
        ];
        let extent = rec
            .dc_source_dimensions
            .as_deref()
            .filter(|d| !d.is_empty())
            .or(rec.duration.as_deref());

        if europeana {
            c.text_child("dcterms:isPartOf", rec.arkivets_namn.as_deref());
            c.text_child("dcterms:isPartOf", rec.c_signum.as_deref());
            for s in spatial {
                c.split_children("dcterms:spatial", s.as_deref(), ", ", &LANG_SV);
            }
            c.text_child_with("dcterms:created", rec.dcterms_created.as_deref(), &W3CDTF);
            c.text_child("dcterms:isReferencedBy", rec.dcterms_is_referenced_by.as_deref());
            c.text_child("dcterms:isFormatOf", rec.dc_identifier.as_deref());
            c.text_child("dcterms:extent", extent);
            c.text_child("dcterms:medium", rec.dc_source2.as_deref());
        } else {
            c.text_child("dc:relation", rec.arkivets_namn.as_deref());
            c.text_child("dc:relation", rec.c_signum.as_deref());
            for s in spatial {
                c.split_children("dc:coverage", s.as_deref(), ", ", &LANG_SV);
            }
            c.text_child_with("dc:date", rec.dcterms_created.as_deref(), &W3CDTF);
            c.text_child("dc:relation", rec.dcterms_is_referenced_by.as_deref());
            c.text_child("dc:relation", rec.dc_identifier.as_deref());
            c.text_child("dc:format", extent);
            c.text_child("dc:format", rec.dc_source2.as_deref());
        }

        c.text_child_with(
            "dc:format",
            rec.filetype_mime.as_deref(),
            &[("xsi:type", "dcterms:IMT")],
        );
        c.text_child("dc:creator", rec.dc_creator.as_deref());
        let publisher = join_present(&[rec.dc_publisher.as_deref(), rec.dc_publisher2.as_deref()]);
        c.text_child("dc:publisher", Some(publisher.as_str()));
        c.text_child_with("dc:rights", rec.dc_rights.as_deref(), &LANG_SV);
        if europeana {
            c.text_child_with("dcterms:issued", rec.dcterms_issued.as_deref(), &W3CDTF);
        } else {
            c.text_child_with("dc:date", rec.dcterms_issued.as_deref(), &W3CDTF);
        }
        c.text_child("dc:identifier", rec.identifier.as_deref());
        c.text_child_with(
            "dc:language",
            rec.dc_language.as_deref(),
            &[("xsi:type", "dcterms:ISO639-2")],
        );

        let file_url = self.accessfile_url(rec.derivate_filepath.as_deref());
        if europeana {
            c.text_child("europeana:object", file_url.as_deref());
            c.text_child("europeana:provider", Some(PROVIDER));
            c.text_child("europeana:type", rec.ese_type.as_deref());
            c.text_child("europeana:rights", rec.europeana_rights.as_deref());
            c.text_child("europeana:dataProvider", Some(DATA_PROVIDER));
            c.text_child("europeana:isShownBy", file_url.as_deref());
            if is_sound {
                c.text_child("europeana:isShownAt", rec.referenced_by_url.as_deref());
            }
        } else {
            let uri = [("xsi:type", "dcterms:URI")];
            c.text_child_with("dc:identifier", file_url.as_deref(), &uri);
            c.text_child("dc:publisher", Some(PROVIDER));
            c.text_child_with(
                "dc:type",
                rec.ese_type.as_deref(),
                &[("xsi:type", "dcterms:DCMItype")],
            );
            c.text_child("dc:rights", rec.europeana_rights.as_deref());
            c.text_child("dc:publisher", Some(DATA_PROVIDER));
            if is_sound {
                c.text_child_with("dc:identifier", rec.referenced_by_url.as_deref(), &uri);
            }
        }
    }
}

fn join_present(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

fn list_sets(parent: &mut Element) {
    for set in OaiSet::ALL {
        let el = parent.child("set");
        el.text_child("setSpec", Some(set.spec()));
        el.text_child("setName", Some(set.name()));
    }
}

fn list_metadata_formats(parent: &mut Element) {
    let formats = [
        ("oai_dc", "http://www.openarchives.org/OAI/2.0/oai_dc.xsd", NS_OAI_DC),
        ("europeana", "http://www.europeana.eu/schemas/ese/ESE-V3.4.xsd", NS_EUROPEANA),
        ("ead", "http://www.loc.gov/ead/ead.xsd", NS_EAD),
    ];
    for (prefix, schema, namespace) in formats {
        let el = parent.child("metadataFormat");
        el.text_child("metadataPrefix", Some(prefix));
        el.text_child("schema", Some(schema));
        el.text_child("metadataNamespace", Some(namespace));
    }
}

/// Append a `header` (ListIdentifiers) or a `record` with its header.
/// Returns the record element when metadata should follow, which is never the
/// case for deleted records.
fn record_header<'a>(
    parent: &'a mut Element,
    verb: Verb,
    identifier: Option<&str>,
    datestamp: Option<&str>,
    to_europeana: Option<&str>,
    to_ndb: Option<&str>,
    status: Option<&str>,
) -> Option<&'a mut Element> {
    let mut header = Element::new("header");
    header.text_child("identifier", identifier);
    header.text_child("datestamp", datestamp);
    if to_europeana.is_some_and(|v| !v.is_empty()) {
        header.text_child("setSpec", Some(OaiSet::Europeana.spec()));
    }
    if to_ndb.is_some_and(|v| !v.is_empty()) {
        header.text_child("setSpec", Some(OaiSet::Finna.spec()));
    }
    let deleted = status == Some("deleted");
    if deleted {
        header.set_attr("status", "deleted");
    }

    if !verb.includes_metadata() {
        parent.push(header);
        return None;
    }
    let record = parent.child("record");
    record.push(header);
    (!deleted).then_some(record)
}

/// Split `"name (extra)"` into the name and the parenthesised part.
fn name_and_qualifier(entry: &str) -> (&str, Option<String>) {
    let mut parts = entry.split(" (");
    let name = parts.next().unwrap_or_default();
    let qualifier = parts.next().map(|q| q.replace(')', ""));
    (name, qualifier)
}

fn subjects(parent: &mut Element, list: &str) {
    let access = parent.child("ead:controlaccess");
    access.text_child("ead:head", Some("topic_facet"));
    for entry in list.split("; ") {
        match name_and_qualifier(entry) {
            (name, Some(href)) => {
                access.text_child_with(
                    "ead:subject",
                    Some(name),
                    &[("href", href.as_str()), ("source", "YSO"), ("lang", "swe")],
                );
            }
            (name, None) => {
                access.text_child_with("ead:subject", Some(name), &[("rules", "internal")]);
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn collection_record(parent: &mut Element, rec: &CollectionRecord, items: &[CollectionItem], verb: Verb) {
    let Some(record) = record_header(
        parent,
        verb,
        rec.c_signum.as_deref(),
        rec.datestamp.as_deref(),
        rec.to_europeana.as_deref(),
        rec.to_ndb.as_deref(),
        rec.status.as_deref(),
    ) else {
        return;
    };

    let ead = record.child("metadata").child("ead:ead");
    ead_header(ead, rec);

    let level = match rec.arkivets_typ.as_deref().map(str::to_lowercase).as_deref() {
        Some("arkiv") => "fonds",
        Some("samling") => "collection",
        _ => "",
    };
    let archdesc = ead.push(Element::new("ead:archdesc").with_attr("level", level));
    collection_did(archdesc, rec);

    if let Some(persons) = non_empty(&rec.personer_roll) {
        let access = archdesc.child("ead:controlaccess");
        access.text_child("ead:head", Some("author"));
        for entry in persons.split("; ") {
            match name_and_qualifier(entry) {
                (name, Some(role)) => {
                    access.text_child_with("ead:persname", Some(name), &[("role", role.as_str())]);
                }
                (name, None) => {
                    access.text_child("ead:persname", Some(name));
                }
            }
        }
    }
    if let Some(list) = non_empty(&rec.amnesord) {
        subjects(archdesc, list);
    }
    for places in [non_empty(&rec.platser), non_empty(&rec.platser_fin)]
        .into_iter()
        .flatten()
    {
        let access = archdesc.child("ead:controlaccess");
        access.text_child("ead:head", Some("geographic_facet"));
        access.split_children("ead:geogname", Some(places), ", ", &[]);
    }
    if let Some(bio) = non_empty(&rec.om_arkivbildaren) {
        archdesc
            .child("ead:bioghist")
            .split_children("ead:p", Some(bio), ";", &[]);
    }

    let scope = archdesc.child("ead:scopecontent");
    scope.text_child("ead:head", Some("description"));
    for text in [
        &rec.arkivets_innehall,
        &rec.anmarkningar_externa,
        &rec.anmarkningar_referens,
    ] {
        scope.text_child("ead:p", text.as_deref());
    }

    if let Some(rights) = non_empty(&rec.nyttjanderatt) {
        archdesc
            .child("ead:accessrestrict")
            .split_children("ead:p", Some(rights), ", ", &[]);
    }

    let dsc = archdesc.push(Element::new("ead:dsc").with_attr("type", "combined"));
    for item in items {
        collection_item(dsc, item);
    }
}

fn ead_header(ead: &mut Element, rec: &CollectionRecord) {
    let signum = rec.c_signum.as_deref().unwrap_or_default();
    let header = ead.push(
        Element::new("ead:eadheader")
            .with_attr("langencoding", "iso639-2b")
            .with_attr("countryencoding", "iso3166-1")
            .with_attr("dateencoding", "iso8601"),
    );
    header.text_child("ead:eadid", Some(signum));

    let filedesc = header.child("ead:filedesc");
    filedesc.child("ead:titlestmt").text_child(
        "ead:titleproper",
        Some(format!("Databaspost på huvudkatalognivå över {signum}").as_str()),
    );
    filedesc
        .child("ead:publicationstmt")
        .text_child("ead:publisher", Some(DATA_PROVIDER));

    let profile = header.child("ead:profiledesc");
    profile.text_child(
        "ead:creation",
        Some("Beskrivningen tagen ur SLS arkivs databaser, huvudkatalognivån och objektnivån i Arkiva, och exporterat till ead xml."),
    );
    profile
        .child("ead:langusage")
        .text_child_with("ead:language", Some("Svenska"), &[("langcode", "swe")]);
}

fn collection_did(archdesc: &mut Element, rec: &CollectionRecord) {
    let did = archdesc.child("ead:did");
    did.text_child("ead:head", Some("Huvudkatalog"));
    did.text_child("ead:unittitle", rec.arkivets_namn.as_deref());

    let dates = [
        (&rec.tid_innehall, &rec.tid_innehall_maskin, "gransar", "inclusive", "creation"),
        (&rec.tid_insamlat, &rec.tid_insamlat_maskin, "insamlingsar", "bulk", "accumulation"),
        (&rec.tid_inlamnat, &rec.tid_inlamnat_maskin, "inlämningsar", "bulk", "accumulation"),
    ];
    for (text, normal, label, kind, datechar) in dates {
        did.text_child_with(
            "ead:unitdate",
            text.as_deref(),
            &[
                ("normal", normal.as_deref().unwrap_or_default()),
                ("label", label),
                ("type", kind),
                ("datechar", datechar),
            ],
        );
    }

    did.text_child("ead:unitid", rec.c_signum.as_deref());
    did.text_child_with("ead:origination", rec.projekt.as_deref(), &[("ead:label", "collector")]);

    let physdesc = did.push(Element::new("ead:physdesc").with_attr("label", "Extent"));
    let extents = [
        (&rec.omfattning_hyllmeter, "hyllmeter", "running_meters"),
        (&rec.omfattning_arkivenheter, "arkivenheter", "archival_units"),
        (&rec.omfattning_sidor, "sidor", "pages"),
        (&rec.omfattning_filmer, "filmer", "films"),
        (&rec.omfattning_fotografier, "fotografier", "photographs"),
        (&rec.omfattning_ljudband, "ljudband", "audio_tapes"),
        (&rec.omfattning_skisser, "skisser", "drawings"),
        (&rec.omfattning_kartor, "kartor", "maps"),
    ];
    for (amount, noun, unit) in extents {
        if let Some(amount) = non_empty(amount) {
            physdesc.text_child_with(
                "ead:extent",
                Some(format!("{amount} {noun}").as_str()),
                &[("unit", unit)],
            );
        }
    }

    if let Some(language) = non_empty(&rec.sprak) {
        did.child("ead:langmaterial")
            .text_child_with("ead:language", Some(language), &[("langcode", "swe")]);
    }

    let archive = rec.sls_arkiv.as_deref().unwrap_or_default();
    did.push(
        Element::new("ead:repository").with_attr("label", format!("{DATA_PROVIDER}, {archive}")),
    )
    .text_child("ead:corpname", Some("SLS"));
    did.text_child("ead:physloc", rec.sls_arkiv.as_deref());
    did.text_child("ead:physloc", rec.arkivets_placering.as_deref());
}

fn daoloc_role(role_title: &str) -> Option<&'static str> {
    match role_title {
        "Kundkopia" => Some("image_full"),
        "Thumbnail" => Some("image_thumbnail"),
        "Databasbild" => Some("image_reference"),
        "sound_reference" => Some("sound_reference"),
        _ => None,
    }
}

fn collection_item(dsc: &mut Element, item: &CollectionItem) {
    let row = &item.entity;
    let c = dsc.push(Element::new("ead:c").with_attr("level", "item"));

    let did = c.child("ead:did");
    did.text_child("ead:unittitle", row.c_title.as_deref());
    if let Some(created) = non_empty(&row.dcterms_created) {
        did.text_child_with(
            "ead:unitdate",
            Some(created),
            &[("normal", created), ("type", "bulk"), ("datechar", "creation")],
        );
    }
    did.text_child_with(
        "ead:unitid",
        row.finna_unitid.as_deref(),
        &[("label", "accession_number")],
    );
    for urn in &item.urns {
        did.text_child_with("ead:unitid", Some(urn.as_str()), &[("label", "PID")]);
    }
    did.text_child("ead:dimensions", row.dc_source_dimensions.as_deref());
    did.text_child("ead:physdesc", row.dc_source2.as_deref());
    if let Some(language) = non_empty(&row.dc_language) {
        did.child("ead:langmaterial")
            .text_child("ead:language", Some(language));
    }

    for object in &item.objects {
        let group = did.child("ead:daogrp");
        if let Some(label) = non_empty(&object.label) {
            group.child("ead:daodesc").text_child("ead:p", Some(label));
        }
        for file in &object.files {
            let loc = group.empty_child("ead:daoloc", &[]);
            if let Some(title) = &file.role_title {
                loc.set_attr("xlink:label", title.as_str());
                if let Some(role) = daoloc_role(title) {
                    loc.set_attr("role", role);
                }
            }
            if let Some(path) = &file.file_path {
                loc.set_attr("xlink:href", path.as_str());
            }
        }
    }

    if let Some(url) = non_empty(&row.referenced_by_url) {
        let group = did.child("ead:daogrp");
        group.child("ead:daodesc").text_child("ead:p", Some(url));
        group.empty_child(
            "ead:daoloc",
            &[("xlink:label", "context_www"), ("role", "url"), ("xlink:href", url)],
        );
    }

    if let Some(description) = non_empty(&row.dc_description) {
        let scope = c.child("ead:scopecontent");
        scope.text_child("ead:head", Some("description"));
        scope.text_child("ead:p", Some(description));
        scope.text_child("ead:p", row.dcterms_is_referenced_by.as_deref());
    }

    if let Some(rights) = non_empty(&row.dc_rights) {
        for tag in ["ead:userestrict", "ead:accessrestrict"] {
            let restrict = c.child(tag);
            if rights == CC_BY_4 {
                if let Some(p) = restrict.text_child("ead:p", Some(rights)) {
                    p.empty_child("ead:extptr", &[("href", CC_BY_4_URL)]);
                }
            } else {
                restrict.text_child_with("ead:p", Some(rights), &[("lang", "swe")]);
                restrict.text_child_with("ead:p", row.rights_fin.as_deref(), &[("lang", "fin")]);
                restrict.text_child_with("ead:p", row.rights_eng.as_deref(), &[("lang", "eng")]);
            }
        }
    }

    if non_empty(&row.dc_type).is_some() || non_empty(&row.dc_type2).is_some() {
        let access = c.child("ead:controlaccess");
        access.text_child("ead:head", Some("format"));
        access.split_children("ead:genreform", row.dc_type.as_deref(), ", ", &[]);
    }

    if let Some(creators) = non_empty(&row.dc_creator) {
        let access = c.child("ead:controlaccess");
        access.text_child("ead:head", Some("author"));
        access.split_children("ead:persname", Some(creators), "; ", &[("role", "creator")]);
    }

    if let Some(list) = non_empty(&row.dc_subject) {
        subjects(c, list);
    }

    for (places, lang) in [
        (non_empty(&row.dcterms_spatial_full), "swe"),
        (non_empty(&row.dcterms_spatial_fin), "fin"),
    ] {
        if let Some(places) = places {
            let access = c.child("ead:controlaccess");
            access.text_child("ead:head", Some("geographic_facet"));
            access.split_children("ead:geogname", Some(places), ", ", &[("lang", lang)]);
        }
    }
}
