use super::{Dependent, Resource};

use serde_json::{Map, Value};
use tracing::warn;

impl Resource {
    /// Renders the resource in the form the backend accepts.
    ///
    /// Keys are lower-cased, dependents are embedded inline and independent
    /// references are URLs. The in-memory `_tableName` tag is not included.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut visiting = vec![];
        self.render(&mut visiting)
    }

    fn render(&self, visiting: &mut Vec<usize>) -> Map<String, Value> {
        visiting.push(self.addr());

        let (id, values, extras, independent, dependent) = {
            let st = self.state();
            (
                st.id,
                st.values.clone(),
                st.extras.clone(),
                st.independent.clone(),
                st.dependent.clone(),
            )
        };

        let mut out = Map::new();
        if let Some(id) = id {
            out.insert("id".to_string(), Value::from(id));
            let uri = self.session().resource_url(&self.table().name, id);
            out.insert("resource_uri".to_string(), Value::String(uri));
        }

        for (key, value) in values {
            let value = match independent.get(&key).and_then(Resource::url) {
                Some(url) => Value::String(url),
                None => value,
            };
            out.insert(key, value);
        }

        for (key, embedded) in dependent {
            let value = match embedded {
                Dependent::One(child) => child.render_nested(visiting),
                Dependent::Many(collection) => Value::Array(
                    collection
                        .models()
                        .iter()
                        .map(|member| member.render_nested(visiting))
                        .collect(),
                ),
            };
            out.insert(key, value);
        }

        for (key, value) in extras {
            out.entry(key).or_insert(value);
        }

        visiting.pop();
        out
    }

    fn render_nested(&self, visiting: &mut Vec<usize>) -> Value {
        if visiting.contains(&self.addr()) {
            warn!(
                table = %self.table().name,
                "dependent cycle while rendering; emitting the URL instead"
            );
            return self.url().map_or(Value::Null, Value::String);
        }
        Value::Object(self.render(visiting))
    }
}
