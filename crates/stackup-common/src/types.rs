//! Domain primitive types used across the stackup workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a service's image comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    /// Built locally from the source tree.
    Build,
    /// Pulled from a registry.
    Pull,
}

/// The part a service plays in the stack.
///
/// Roles decide which service the readiness probe targets and which one
/// receives provisioning commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceRole {
    /// The application server. Provisioning commands run here.
    App,
    /// The relational database. The readiness probe runs here.
    Database,
    /// The cache.
    Cache,
    /// The reverse proxy.
    Proxy,
    /// Anything else declared in the manifest.
    Other,
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::App => write!(f, "app"),
            Self::Database => write!(f, "database"),
            Self::Cache => write!(f, "cache"),
            Self::Proxy => write!(f, "proxy"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// One named service of the stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Service name as declared in the compose manifest.
    pub name: String,
    /// Image origin.
    pub source: ImageSource,
    /// Role within the stack.
    pub role: ServiceRole,
}

impl ServiceSpec {
    /// Creates a service specification.
    #[must_use]
    pub fn new(name: impl Into<String>, source: ImageSource, role: ServiceRole) -> Self {
        Self {
            name: name.into(),
            source,
            role,
        }
    }
}

/// The set of services launched by one run.
///
/// Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackDescriptor {
    /// Declared services, in manifest order.
    pub services: Vec<ServiceSpec>,
}

impl StackDescriptor {
    /// Returns the first service with the given role.
    #[must_use]
    pub fn by_role(&self, role: ServiceRole) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| s.role == role)
    }

    /// Names of every declared service.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }

    /// Names of services whose image is built locally.
    #[must_use]
    pub fn buildable(&self) -> Vec<String> {
        self.services
            .iter()
            .filter(|s| s.source == ImageSource::Build)
            .map(|s| s.name.clone())
            .collect()
    }
}

impl Default for StackDescriptor {
    fn default() -> Self {
        Self {
            services: vec![
                ServiceSpec::new("web", ImageSource::Build, ServiceRole::App),
                ServiceSpec::new("db", ImageSource::Pull, ServiceRole::Database),
                ServiceSpec::new("cache", ImageSource::Pull, ServiceRole::Cache),
                ServiceSpec::new("proxy", ImageSource::Pull, ServiceRole::Proxy),
            ],
        }
    }
}

/// Bootstrap administrative account.
///
/// The built-in default is for local and demo bring-up only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credential {
    /// Account name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Login secret.
    pub secret: String,
}

impl Default for Credential {
    fn default() -> Self {
        Self {
            name: crate::constants::DEV_ADMIN_NAME.into(),
            email: crate::constants::DEV_ADMIN_EMAIL.into(),
            secret: crate::constants::DEV_ADMIN_SECRET.into(),
        }
    }
}

impl Credential {
    /// Whether this is still the development-only default.
    #[must_use]
    pub fn is_development_default(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Ordered, opaque fixture payloads loaded into the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedDataSet(Vec<String>);

impl SeedDataSet {
    /// Creates a seed set from fixture names, preserving order.
    #[must_use]
    pub fn new<I, S>(fixtures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fixtures.into_iter().map(Into::into).collect())
    }

    /// Iterates the fixtures in load order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Provisioning sub-stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProvisionStep {
    /// Generate and apply schema migrations.
    Migrate,
    /// Create the bootstrap account if absent.
    Account,
    /// Load fixtures.
    Seed,
    /// Publish static assets.
    Static,
}

impl ProvisionStep {
    /// All sub-stages in execution order.
    pub const ORDER: [Self; 4] = [Self::Migrate, Self::Account, Self::Seed, Self::Static];
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Migrate => write!(f, "schema migration"),
            Self::Account => write!(f, "account creation"),
            Self::Seed => write!(f, "seed data loading"),
            Self::Static => write!(f, "static asset publication"),
        }
    }
}

/// A labelled access point shown in the final summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Short description, e.g. "Admin Panel".
    pub label: String,
    /// Address shown to the operator.
    pub url: String,
}

impl Endpoint {
    /// Creates an endpoint entry.
    #[must_use]
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_descriptor_declares_four_services() {
        let stack = StackDescriptor::default();
        assert_eq!(stack.names(), vec!["web", "db", "cache", "proxy"]);
        assert_eq!(stack.buildable(), vec!["web"]);
        assert_eq!(
            stack.by_role(ServiceRole::Database).map(|s| s.name.as_str()),
            Some("db")
        );
    }

    #[test]
    fn credential_debug_redacts_secret() {
        let cred = Credential {
            name: "ops".into(),
            email: "ops@example.com".into(),
            secret: "hunter2".into(),
        };
        let rendered = format!("{cred:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
        assert!(!cred.is_development_default());
        assert!(Credential::default().is_development_default());
    }

    #[test]
    fn seed_set_preserves_order() {
        let seeds = SeedDataSet::new(["b.json", "a.json"]);
        assert_eq!(seeds.iter().collect::<Vec<_>>(), vec!["b.json", "a.json"]);
        assert_eq!(seeds.iter().count(), 2);
    }

    #[test]
    fn provision_order_is_fixed() {
        let mut sorted = ProvisionStep::ORDER;
        sorted.sort();
        assert_eq!(sorted, ProvisionStep::ORDER);
    }

    #[test]
    fn image_source_uses_lowercase_yaml_names() {
        let spec: ServiceSpec =
            serde_yaml::from_str("name: web\nsource: build\nrole: app\n").expect("parse");
        assert_eq!(spec.source, ImageSource::Build);
        assert_eq!(spec.role, ServiceRole::App);
    }
}
