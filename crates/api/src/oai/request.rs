//! OAI-PMH request parsing and validation.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

use super::error::OaiError;

const ALLOWED_ARGUMENTS: [&str; 6] = ["verb", "from", "until", "identifier", "set", "metadataPrefix"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Identify,
    ListSets,
    ListMetadataFormats,
    ListIdentifiers,
    ListRecords,
    GetRecord,
}

impl Verb {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "Identify" => Self::Identify,
            "ListSets" => Self::ListSets,
            "ListMetadataFormats" => Self::ListMetadataFormats,
            "ListIdentifiers" => Self::ListIdentifiers,
            "ListRecords" => Self::ListRecords,
            "GetRecord" => Self::GetRecord,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identify => "Identify",
            Self::ListSets => "ListSets",
            Self::ListMetadataFormats => "ListMetadataFormats",
            Self::ListIdentifiers => "ListIdentifiers",
            Self::ListRecords => "ListRecords",
            Self::GetRecord => "GetRecord",
        }
    }

    /// Verbs whose responses carry record headers or records.
    pub fn is_record_verb(self) -> bool {
        matches!(
            self,
            Self::ListIdentifiers | Self::ListRecords | Self::GetRecord
        )
    }

    /// Verbs whose records include a `metadata` block.
    pub fn includes_metadata(self) -> bool {
        matches!(self, Self::ListRecords | Self::GetRecord)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataPrefix {
    OaiDc,
    Europeana,
    Ead,
}

impl MetadataPrefix {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "oai_dc" => Self::OaiDc,
            "europeana" => Self::Europeana,
            "ead" => Self::Ead,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OaiDc => "oai_dc",
            Self::Europeana => "europeana",
            Self::Ead => "ead",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OaiSet {
    Europeana,
    Finna,
}

impl OaiSet {
    pub const ALL: [OaiSet; 2] = [OaiSet::Europeana, OaiSet::Finna];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SLSeuropeana" => Some(Self::Europeana),
            "SLSfinna" => Some(Self::Finna),
            _ => None,
        }
    }

    pub fn spec(self) -> &'static str {
        match self {
            Self::Europeana => "SLSeuropeana",
            Self::Finna => "SLSfinna",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Europeana => "SLS material till Europeana",
            Self::Finna => "SLS material till Finna/NDB",
        }
    }
}

/// Date and set restrictions shared by the list verbs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub from: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub set: Option<OaiSet>,
}

/// A validated OAI-PMH request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OaiRequest {
    pub verb: Verb,
    pub metadata_prefix: Option<MetadataPrefix>,
    pub identifier: Option<String>,
    pub filter: RecordFilter,
}

/// A request that failed validation. `verb` is kept when it was recognised so
/// the error envelope can echo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub verb: Option<Verb>,
    pub error: OaiError,
}

impl OaiRequest {
    /// Validate raw query arguments. When an argument is repeated the first
    /// occurrence is used.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, Rejection> {
        let reject = |verb, error| Rejection { verb, error };

        if pairs
            .iter()
            .any(|(k, _)| !ALLOWED_ARGUMENTS.contains(&k.as_str()))
        {
            return Err(reject(None, OaiError::bad_argument("Unknown argument")));
        }

        let arg = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };

        let verb = arg("verb")
            .and_then(Verb::parse)
            .ok_or_else(|| reject(None, OaiError::BadVerb))?;
        let fail = |error| reject(Some(verb), error);

        let from = arg("from")
            .map(|v| parse_date(v).ok_or_else(|| fail(OaiError::bad_argument("From-date malformed"))))
            .transpose()?;
        let until = arg("until")
            .map(|v| {
                parse_date(v).ok_or_else(|| fail(OaiError::bad_argument("Until-date malformed")))
            })
            .transpose()?;
        let identifier = arg("identifier").map(str::to_owned);
        let set = arg("set")
            .map(|v| OaiSet::parse(v).ok_or_else(|| fail(OaiError::bad_argument("Unknown set"))))
            .transpose()?;
        let metadata_prefix = arg("metadataPrefix")
            .map(|v| MetadataPrefix::parse(v).ok_or_else(|| fail(OaiError::CannotDisseminateFormat)))
            .transpose()?;

        let has_filter = from.is_some() || until.is_some() || set.is_some();
        match verb {
            Verb::Identify | Verb::ListSets => {
                if has_filter || identifier.is_some() || metadata_prefix.is_some() {
                    return Err(fail(OaiError::bad_argument(format!(
                        "No other parameters with {verb}"
                    ))));
                }
            }
            Verb::ListMetadataFormats => {
                if has_filter || metadata_prefix.is_some() {
                    return Err(fail(OaiError::bad_argument(format!(
                        "Only identifier is a valid parameter for {verb}"
                    ))));
                }
            }
            Verb::ListIdentifiers | Verb::ListRecords => {
                if metadata_prefix.is_none() {
                    return Err(fail(OaiError::bad_argument("metadataPrefix is missing")));
                }
                if identifier.is_some() {
                    return Err(fail(OaiError::bad_argument(format!(
                        "The identifier parameter is not allowed for {verb}"
                    ))));
                }
            }
            Verb::GetRecord => {
                if metadata_prefix.is_none() || identifier.is_none() || has_filter {
                    return Err(fail(OaiError::bad_argument(
                        "metadataPrefix and identifier parameters are required, no other parameters are valid",
                    )));
                }
            }
        }

        Ok(Self {
            verb,
            metadata_prefix,
            identifier,
            filter: RecordFilter { from, until, set },
        })
    }
}

/// Accept `YYYY-MM-DD` or a full RFC 3339 timestamp, keeping only the date.
fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
}
