//! The backend URL scheme.
//!
//! Resources live at `<prefix>/<table>/<id>/`, listings at
//! `<prefix>/<table>/?limit=..&offset=..&<field>=<value>`. Table names are
//! lower-cased in both.

use url::{form_urlencoded, Url};

pub const DEFAULT_PREFIX: &str = "/api/specify";

/// A resource URL parsed back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUri {
    /// Lower-cased table name
    pub table: String,

    /// Absent for collection URLs
    pub id: Option<i64>,
}

pub fn resource_url(prefix: &str, table: &str, id: i64) -> String {
    format!(
        "{}/{}/{}/",
        prefix.trim_end_matches('/'),
        table.to_ascii_lowercase(),
        id
    )
}

pub fn collection_url<K, V>(prefix: &str, table: &str, query: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut url = format!(
        "{}/{}/",
        prefix.trim_end_matches('/'),
        table.to_ascii_lowercase()
    );

    if !query.is_empty() {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in query {
            serializer.append_pair(key.as_ref(), value.as_ref());
        }
        url.push('?');
        url.push_str(&serializer.finish());
    }

    url
}

/// Parses an absolute or root-relative URL. Returns `None` if the path does
/// not start with `prefix` followed by a table segment.
pub fn parse_resource_url(prefix: &str, url: &str) -> Option<ResourceUri> {
    let base = Url::parse("http://localhost/").ok()?;
    let parsed = base.join(url).ok()?;

    let mut segments = parsed.path_segments()?.filter(|segment| !segment.is_empty());
    for expected in prefix.split('/').filter(|segment| !segment.is_empty()) {
        if segments.next()? != expected {
            return None;
        }
    }

    let table = segments.next()?.to_ascii_lowercase();
    let id = match segments.next() {
        Some(id) => Some(id.parse().ok()?),
        None => None,
    };

    if segments.next().is_some() {
        return None;
    }

    Some(ResourceUri { table, id })
}

/// The numeric id at the end of a resource URL.
pub fn id_from_url(prefix: &str, url: &str) -> Option<i64> {
    parse_resource_url(prefix, url)?.id
}
