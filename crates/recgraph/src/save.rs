use crate::resource::Load;
use crate::transport::Request;
use crate::uri::collection_url;
use crate::{bail, Error, Event, Resource, Result, Session};

use serde_json::{Map, Value};
use tracing::debug;

impl Session {
    /// Persists `resource` and its dependent subgraph.
    ///
    /// Refuses without contacting the backend while the resource or any
    /// dependent descendant has blockers. New records are POSTed to the
    /// collection URL, existing ones PUT to their own URL. On success the
    /// response is canonicalized and replaces the resource's state: every
    /// field is overwritten, embedded dependents are rebuilt and the dirty
    /// set is cleared. Returns the canonical response.
    pub async fn save(&self, resource: &Resource) -> Result<Map<String, Value>> {
        let table = resource.table().clone();

        let blocked = resource.deep_blockers();
        if !blocked.is_empty() {
            let mut fields: Vec<String> = vec![];
            for (owner, blocker) in &blocked {
                let field = if owner.ptr_eq(resource) {
                    blocker.field.clone()
                } else {
                    format!("{}.{}", owner.table().name, blocker.field)
                };
                if !fields.contains(&field) {
                    fields.push(field);
                }
            }
            debug!(table = %table.name, ?fields, "save refused by blockers");
            return Err(Error::save_blocked(&table.name, fields));
        }

        let body = Value::Object(resource.to_json());
        let request = match resource.id() {
            Some(id) => Request::put(self.resource_url(&table.name, id), body),
            None => Request::post(
                collection_url::<&str, &str>(&self.config().api_prefix, &table.name, &[]),
                body,
            ),
        };
        let url = request.url.clone();

        debug!(table = %table.name, method = %request.method, %url, "saving resource");
        let response = self.transport().request(request).await?;
        if !response.is_success() {
            return Err(Error::transport_status(response.status, &url));
        }

        let record = match response.data {
            Value::Object(record) => record,
            other => bail!("expected the saved record from {url}, got {other}"),
        };

        let canonical = self.serializer().serialize(&record, Some(&table.name))?;
        resource.apply(&canonical, Load::Save)?;
        debug!(table = %table.name, id = ?resource.id(), "resource saved");
        resource.emit(&Event::Saved);

        Ok(canonical)
    }
}

impl Resource {
    /// Saves through the owning session. See [`Session::save`].
    pub async fn save(&self) -> Result<Map<String, Value>> {
        let session = self.session().clone();
        session.save(self).await
    }
}
