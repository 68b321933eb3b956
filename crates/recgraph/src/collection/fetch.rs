use super::{Collection, Kind};
use crate::in_flight::{self, Turn};
use crate::transport::Request;
use crate::uri::collection_url;
use crate::{Error, Event, Resource, Result};

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Body of a list response.
#[derive(Debug, Deserialize)]
struct Page {
    objects: Vec<Map<String, Value>>,
    meta: Meta,
}

#[derive(Debug, Deserialize)]
struct Meta {
    total_count: usize,
}

impl Collection {
    /// Fetches the next page using the session's page size.
    ///
    /// Does nothing for dependent or complete collections. At most one
    /// request is outstanding per collection; concurrent callers share it.
    pub async fn fetch(&self) -> Result<()> {
        let limit = self.session().config().page_size;
        self.fetch_page(limit).await
    }

    /// Fetches the next `limit` records.
    pub async fn fetch_page(&self, limit: usize) -> Result<()> {
        let Kind::Lazy { filters } = &self.inner.kind else {
            return Ok(());
        };
        if self.is_complete() {
            return Ok(());
        }

        match self.inner.fetch.turn() {
            Turn::Follower(rx) => in_flight::follow(rx).await,
            Turn::Leader(leader) => {
                let result = self.request_page(filters, limit).await;
                leader.finish(result)
            }
        }
    }

    /// Fetches pages until the collection is complete.
    pub async fn fetch_all(&self) -> Result<()> {
        while !self.is_complete() {
            let before = self.len();
            self.fetch().await?;
            if self.len() == before && !self.is_complete() {
                warn!(
                    table = %self.table().name,
                    len = before,
                    total_count = ?self.total_count(),
                    "backend returned no new records before reaching the total count"
                );
                break;
            }
        }
        Ok(())
    }

    /// Discards fetched records and fetches the first page again.
    pub async fn refetch(&self) -> Result<()> {
        if self.is_dependent() {
            return Ok(());
        }
        {
            let mut st = self.state();
            st.models.clear();
            st.total_count = None;
        }
        self.fetch().await
    }

    /// True while a page request is outstanding.
    pub fn is_fetching(&self) -> bool {
        self.inner.fetch.is_pending()
    }

    async fn request_page(&self, filters: &[(String, String)], limit: usize) -> Result<()> {
        let session = self.session().clone();
        let table = self.table().clone();
        let offset = self.len();

        let mut query = filters.to_vec();
        query.push(("limit".to_string(), limit.to_string()));
        query.push(("offset".to_string(), offset.to_string()));
        let url = collection_url(&session.config().api_prefix, &table.name, &query);

        debug!(table = %table.name, offset, limit, "fetching collection page");
        let response = session.transport().request(Request::get(&url)).await?;
        if !response.is_success() {
            return Err(Error::transport_status(response.status, &url));
        }

        let page: Page = serde_json::from_value(response.data)
            .map_err(|err| Error::from(err).context(format!("decoding list response from {url}")))?;

        let serializer = session.serializer();
        let mut incoming = Vec::with_capacity(page.objects.len());
        for record in &page.objects {
            let canonical = serializer.serialize(record, Some(&table.name))?;
            incoming.push(Resource::from_canonical(&session, table.clone(), &canonical)?);
        }

        self.merge(incoming, page.meta.total_count);
        self.inner.events.emit(&Event::Loaded);
        Ok(())
    }

    /// Appends fetched records, skipping ids already present, and trims the
    /// collection to the reported total.
    ///
    /// A shrinking total keeps the leading entries, which may include records
    /// the backend has since deleted. `refetch` rebuilds the list.
    fn merge(&self, incoming: Vec<Resource>, total_count: usize) {
        let mut seen: HashSet<i64> = self.models().iter().filter_map(Resource::id).collect();
        let incoming: Vec<(Option<i64>, Resource)> = incoming
            .into_iter()
            .map(|resource| (resource.id(), resource))
            .collect();

        let mut st = self.state();
        for (id, resource) in incoming {
            if let Some(id) = id {
                if !seen.insert(id) {
                    continue;
                }
            }
            st.models.push(resource);
        }

        st.total_count = Some(total_count);
        st.models.truncate(total_count);
    }
}
