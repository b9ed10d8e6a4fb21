use serde::Deserialize;

/// Cross-origin access for browser callers
///
/// Absent by default; when the section is present with no origins the layer
/// is not installed.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Origins allowed to call the gateway
    #[serde(default = "CorsList::none")]
    pub origins: CorsList,
    /// Methods allowed on preflight
    #[serde(default = "default_methods")]
    pub methods: CorsList,
    /// Request headers allowed on preflight
    #[serde(default = "default_headers")]
    pub headers: CorsList,
    /// Preflight cache lifetime, e.g. `"10m"`
    pub max_age: Option<String>,
}

impl CorsConfig {
    /// Whether any origin is allowed at all
    pub fn is_active(&self) -> bool {
        !matches!(&self.origins, CorsList::Only(origins) if origins.is_empty())
    }

    /// Parsed preflight cache lifetime
    ///
    /// # Errors
    ///
    /// Returns an error if `max_age` is not a valid duration string
    pub fn max_age(&self) -> anyhow::Result<Option<std::time::Duration>> {
        self.max_age
            .as_deref()
            .map(|raw| crate::parse_duration("server.cors.max_age", raw))
            .transpose()
    }
}

/// `"*"` or an explicit list of values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsList {
    /// Any value is allowed
    Any,
    /// Only the listed values are allowed
    Only(Vec<String>),
}

impl CorsList {
    const fn none() -> Self {
        Self::Only(Vec::new())
    }

    fn from_values(values: Vec<String>) -> Self {
        if values.iter().any(|v| v == "*") {
            Self::Any
        } else {
            Self::Only(values)
        }
    }
}

fn default_methods() -> CorsList {
    CorsList::Only(["GET", "POST", "OPTIONS"].map(str::to_owned).to_vec())
}

fn default_headers() -> CorsList {
    CorsList::Only(
        ["content-type", "key", "tollgate-trace-customer-id", "tollgate-session-id"]
            .map(str::to_owned)
            .to_vec(),
    )
}

impl<'de> Deserialize<'de> for CorsList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::One(value) => Self::from_values(vec![value]),
            Raw::Many(values) => Self::from_values(values),
        })
    }
}
