//! Authenticated identity carried by tickets, and the target service type.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Multi-valued attribute map released with a principal or authentication.
pub type Attributes = BTreeMap<String, Vec<String>>;

/// An authenticated identity plus the attributes released for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct Principal {
    /// Principal identifier, e.g. a username.
    #[builder(into)]
    pub id: String,

    /// Released attributes.
    #[builder(default)]
    #[serde(default)]
    pub attributes: Attributes,
}

impl Principal {
    /// Creates a principal with no attributes.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), attributes: Attributes::new() }
    }
}

/// The outcome of a successful primary authentication.
///
/// # Examples
///
/// ```
/// use casticket::{Authentication, Principal};
///
/// let auth = Authentication::builder()
///     .principal(Principal::new("alice"))
///     .successful_handlers(vec!["LdapAuthenticationHandler".to_owned()])
///     .credential_types(vec!["UsernamePasswordCredential".to_owned()])
///     .build();
///
/// assert_eq!(auth.principal.id, "alice");
/// assert!(!auth.is_remember_me());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct Authentication {
    /// The authenticated principal.
    pub principal: Principal,

    /// When the authentication happened.
    #[builder(default = Utc::now())]
    pub authentication_date: DateTime<Utc>,

    /// Names of the handlers that accepted the credentials.
    #[builder(default)]
    #[serde(default)]
    pub successful_handlers: Vec<String>,

    /// Type names of the credentials that were presented.
    #[builder(default)]
    #[serde(default)]
    pub credential_types: Vec<String>,

    /// Authentication metadata, e.g. `rememberMe`.
    #[builder(default)]
    #[serde(default)]
    pub attributes: Attributes,
}

impl Authentication {
    /// Attribute set when the user asked to be remembered.
    pub const REMEMBER_ME_ATTRIBUTE: &'static str = "rememberMe";

    /// Returns `true` when the `rememberMe` attribute holds `"true"`.
    #[must_use]
    pub fn is_remember_me(&self) -> bool {
        self.attributes
            .get(Self::REMEMBER_ME_ATTRIBUTE)
            .is_some_and(|values| values.iter().any(|v| v.eq_ignore_ascii_case("true")))
    }
}

/// A service a ticket may be issued for, identified by its URL.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Service {
    id: String,
}

impl Service {
    /// Creates a service from its identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The service identifier as supplied.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The identifier without query string, fragment or `;jsessionid`.
    #[must_use]
    pub fn normalized_id(&self) -> &str {
        let end = self.id.find(['?', '#']).unwrap_or(self.id.len());
        let base = &self.id[..end];
        match base.find(";jsessionid") {
            Some(idx) => &base[..idx],
            None => base,
        }
    }

    /// Returns `true` when both services point at the same resource.
    #[must_use]
    pub fn matches(&self, other: &Service) -> bool {
        self.normalized_id() == other.normalized_id()
    }
}

impl From<&str> for Service {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Service {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}
