//! Indicator record as exported by the feed.

/// Column names written as the header of every per-type output file.
pub const HEADERS: [&str; 14] = [
    "first_seen_utc",
    "ioc_id",
    "ioc_value",
    "ioc_type",
    "threat_type",
    "fk_malware",
    "malware_alias",
    "malware_printable",
    "last_seen_utc",
    "confidence_level",
    "reference",
    "tags",
    "anonymous",
    "reporter",
];

/// Rows shorter than this cannot carry a value and a type.
pub const MIN_FIELDS: usize = 4;

pub const VALUE_INDEX: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorRecord {
    pub first_seen_utc: String,
    pub ioc_id: String,
    pub ioc_value: String,
    pub ioc_type: String,
    pub threat_type: String,
    pub fk_malware: String,
    pub malware_alias: String,
    pub malware_printable: String,
    pub last_seen_utc: String,
    pub confidence_level: String,
    pub reference: String,
    pub tags: String,
    pub anonymous: String,
    pub reporter: String,
    /// Columns past the known 14, kept in order.
    pub extra: Vec<String>,
}

impl IndicatorRecord {
    /// Builds a record from raw CSV fields.
    ///
    /// Every field loses its `"` characters. `ioc_value` and `ioc_type` are
    /// additionally trimmed and cut at their sub-classification suffix.
    /// Returns `None` when fewer than [`MIN_FIELDS`] fields are present.
    pub fn from_fields<'a, I>(fields: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut cleaned: Vec<String> = fields.into_iter().map(strip_quotes).collect();
        if cleaned.len() < MIN_FIELDS {
            return None;
        }
        let extra = if cleaned.len() > HEADERS.len() {
            cleaned.split_off(HEADERS.len())
        } else {
            cleaned.resize(HEADERS.len(), String::new());
            Vec::new()
        };
        let mut it = cleaned.into_iter();
        let mut next = || it.next().unwrap_or_default();
        Some(Self {
            first_seen_utc: next(),
            ioc_id: next(),
            ioc_value: truncate_value(next().trim()).to_string(),
            ioc_type: truncate_type(next().trim()).to_string(),
            threat_type: next(),
            fk_malware: next(),
            malware_alias: next(),
            malware_printable: next(),
            last_seen_utc: next(),
            confidence_level: next(),
            reference: next(),
            tags: next(),
            anonymous: next(),
            reporter: next(),
            extra,
        })
    }

    /// Fields in output column order.
    pub fn to_fields(&self) -> Vec<&str> {
        let mut out = vec![
            self.first_seen_utc.as_str(),
            self.ioc_id.as_str(),
            self.ioc_value.as_str(),
            self.ioc_type.as_str(),
            self.threat_type.as_str(),
            self.fk_malware.as_str(),
            self.malware_alias.as_str(),
            self.malware_printable.as_str(),
            self.last_seen_utc.as_str(),
            self.confidence_level.as_str(),
            self.reference.as_str(),
            self.tags.as_str(),
            self.anonymous.as_str(),
            self.reporter.as_str(),
        ];
        out.extend(self.extra.iter().map(String::as_str));
        out
    }
}

pub fn strip_quotes(field: &str) -> String {
    field.replace('"', "")
}

/// Cuts the type at its first `:` (`ip:port` becomes `ip`).
pub fn truncate_type(raw: &str) -> &str {
    raw.split(':').next().unwrap_or("").trim_end()
}

/// Cuts the value at its first `:` outside a URL scheme separator.
///
/// `1.2.3.4:80` becomes `1.2.3.4` and `http://evil.com:80` becomes
/// `http://evil.com`; values without a `:` are returned unchanged.
pub fn truncate_value(raw: &str) -> &str {
    let search_from = raw.find("://").map(|pos| pos + 3).unwrap_or(0);
    match raw[search_from..].find(':') {
        Some(offset) => raw[..search_from + offset].trim_end(),
        None => raw,
    }
}
