use serde::{Deserialize, Serialize};

use crate::error::{DatastoreError, DatastoreResult};

pub const DEFAULT_HOST: &str = "http://localhost:8080";

pub const ENV_DATASET: &str = "DATASTORE_DATASET";
pub const ENV_HOST: &str = "DATASTORE_HOST";
pub const ENV_NAMESPACE: &str = "DATASTORE_NAMESPACE";

/// Connection settings for a [`DatastoreService`](crate::DatastoreService).
///
/// Construct through [`DatastoreServiceOptions::builder`] or one of the
/// loaders; every path validates before handing out a value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastoreServiceOptions {
    /// Dataset every key handled by the service must belong to.
    dataset: String,
    /// Endpoint of the remote datastore.
    #[serde(default = "default_host")]
    host: String,
    /// Namespace applied to keys created through the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

impl DatastoreServiceOptions {
    pub fn builder(dataset: impl Into<String>) -> DatastoreServiceOptionsBuilder {
        DatastoreServiceOptionsBuilder::new(dataset)
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// A builder pre-populated with these options.
    pub fn to_builder(&self) -> DatastoreServiceOptionsBuilder {
        DatastoreServiceOptionsBuilder {
            dataset: self.dataset.clone(),
            host: self.host.clone(),
            namespace: self.namespace.clone(),
        }
    }

    /// Parse options from a TOML document.
    ///
    /// ```toml
    /// dataset = "my-dataset"
    /// host = "http://localhost:8080"   # optional
    /// namespace = "tenant-a"           # optional
    /// ```
    pub fn from_toml_str(input: &str) -> DatastoreResult<Self> {
        let parsed: Self =
            toml::from_str(input).map_err(|e| DatastoreError::Config(e.to_string()))?;
        parsed.to_builder().build()
    }

    /// Read options from `DATASTORE_DATASET`, `DATASTORE_HOST` and
    /// `DATASTORE_NAMESPACE`. Only the dataset is required.
    pub fn from_env() -> DatastoreResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DatastoreResult<Self> {
        let dataset = lookup(ENV_DATASET)
            .ok_or_else(|| DatastoreError::Config(format!("{ENV_DATASET} is not set")))?;
        let mut builder = Self::builder(dataset);
        if let Some(host) = lookup(ENV_HOST) {
            builder = builder.with_host(host);
        }
        if let Some(namespace) = lookup(ENV_NAMESPACE) {
            builder = builder.with_namespace(namespace);
        }
        builder.build()
    }
}

#[derive(Clone, Debug)]
pub struct DatastoreServiceOptionsBuilder {
    dataset: String,
    host: String,
    namespace: Option<String>,
}

impl DatastoreServiceOptionsBuilder {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            host: default_host(),
            namespace: None,
        }
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// An empty namespace selects the default one.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    pub fn build(self) -> DatastoreResult<DatastoreServiceOptions> {
        if self.dataset.is_empty() {
            return Err(DatastoreError::Config("dataset must not be empty".into()));
        }
        if self.host.is_empty() {
            return Err(DatastoreError::Config("host must not be empty".into()));
        }
        Ok(DatastoreServiceOptions {
            dataset: self.dataset,
            host: self.host,
            namespace: self.namespace.filter(|ns| !ns.is_empty()),
        })
    }
}
