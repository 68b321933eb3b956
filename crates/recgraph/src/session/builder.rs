use super::{Config, Session, Shared};
use crate::rules::{BusinessRules, FieldRule, UniquenessRules};
use crate::{bail, Error, Result, Schema, Transport};

use std::sync::Arc;

/// Configures a [`Session`].
pub struct Builder {
    schema: Option<Arc<Schema>>,
    transport: Option<Arc<dyn Transport>>,
    config: Config,
    uniqueness: UniquenessRules,
    rules: Vec<(String, Arc<dyn FieldRule>)>,
    default_rules: bool,
}

impl Default for Builder {
    fn default() -> Builder {
        Builder {
            schema: None,
            transport: None,
            config: Config::default(),
            uniqueness: UniquenessRules::default(),
            rules: vec![],
            default_rules: true,
        }
    }
}

impl Builder {
    pub fn schema(&mut self, schema: impl Into<Arc<Schema>>) -> &mut Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn transport(&mut self, transport: impl Transport) -> &mut Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(&mut self, transport: Arc<dyn Transport>) -> &mut Self {
        self.transport = Some(transport);
        self
    }

    /// Path prefix of resource URLs. Defaults to `/api/specify`.
    pub fn api_prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.config.api_prefix = prefix.into();
        self
    }

    /// Records per page for lazy collections. Defaults to 20.
    pub fn page_size(&mut self, page_size: usize) -> &mut Self {
        self.config.page_size = page_size;
        self
    }

    pub fn uniqueness_rules(&mut self, rules: UniquenessRules) -> &mut Self {
        self.uniqueness = rules;
        self
    }

    /// Registers a rule that runs when a field of `table` changes.
    pub fn rule(&mut self, table: impl Into<String>, rule: impl FieldRule) -> &mut Self {
        self.rules.push((table.into(), Arc::new(rule)));
        self
    }

    /// Whether the built-in table rules are installed. Defaults to true.
    pub fn default_rules(&mut self, enabled: bool) -> &mut Self {
        self.default_rules = enabled;
        self
    }

    pub fn build(&self) -> Result<Session> {
        let Some(schema) = self.schema.clone() else {
            return Err(Error::schema_not_loaded(
                "call `Builder::schema` with the loaded datamodel before `build`",
            ));
        };
        let Some(transport) = self.transport.clone() else {
            bail!("no transport configured; call `Builder::transport` before `build`");
        };
        if self.config.page_size == 0 {
            bail!("page size must be at least 1");
        }

        for (table, _) in &self.rules {
            schema.expect_table(table)?;
        }
        self.uniqueness.verify(&schema)?;

        let rules = BusinessRules::new(
            self.uniqueness.clone(),
            self.rules.clone(),
            self.default_rules,
        );

        Ok(Session {
            shared: Arc::new(Shared {
                schema,
                transport,
                config: self.config.clone(),
                rules,
            }),
        })
    }
}
