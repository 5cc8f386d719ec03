//! Compact string form of OAuth tokens.
//!
//! A compacted token is six fields joined with `,`:
//!
//! ```text
//! service , client_id , scope|scope|... , response_type , grant_type , principal:handler;...:credential;...
//! ```
//!
//! `response_type` and `grant_type` are ordinals. Every text atom is
//! percent-escaped for `%`, `,`, `|`, `:` and `;`, so values containing the
//! delimiters never change the field count.
//!
//! Expanding restores the service, client id, scopes, response and grant
//! types, principal id, handler names and credential types. Everything else
//! is not carried and is rebuilt on expansion:
//!
//! - the id is freshly generated (see [`OAuthTokenCompactor::expand_with_id`]);
//! - timestamps start at the clock's current time with no uses;
//! - the expiration policy is the one registered for the token kind;
//! - attributes, the session reference and PKCE fields are empty;
//! - empty scopes, handler names and credential types are dropped.

use std::{collections::BTreeSet, fmt::Write as _, sync::Arc};

use crate::{
    authentication::{Authentication, Principal},
    error::{TicketError, TicketResult},
    factory::{OAuthTokenRequest, TicketFactory, TicketRequest},
    ticket::{GrantType, OAuthToken, OAuthTokenFields, ResponseType, Ticket, TicketCore, TicketKind, TicketState},
};

const FIELD_SEPARATOR: char = ',';
const SCOPE_SEPARATOR: char = '|';
const SUMMARY_SEPARATOR: char = ':';
const LIST_SEPARATOR: char = ';';
const FIELD_COUNT: usize = 6;

/// Converts tickets to and from a compact string.
pub trait TicketCompactor: Send + Sync {
    /// Encodes `ticket`.
    ///
    /// # Errors
    ///
    /// [`TicketError::UnsupportedTicketKind`] if this compactor does not handle
    /// the ticket's kind.
    fn compact(&self, ticket: &Ticket) -> TicketResult<String>;

    /// Decodes a compacted ticket.
    ///
    /// # Errors
    ///
    /// [`TicketError::MalformedTicket`] if the input is not a valid encoding.
    fn expand(&self, compact: &str) -> TicketResult<Ticket>;
}

/// Compactor for one OAuth token kind.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use casticket::{
///     Authentication, OAuthTokenRequest, Principal, SystemClock, TicketConfig, TicketFactory,
///     TicketRequest, TicketState,
///     compactor::{OAuthTokenCompactor, TicketCompactor},
/// };
///
/// let factory = Arc::new(TicketFactory::from_config(&TicketConfig::default(), Arc::new(SystemClock)));
/// let token = factory
///     .create(TicketRequest::AccessToken(
///         OAuthTokenRequest::builder()
///             .authentication(Authentication::builder().principal(Principal::new("alice")).build())
///             .service("https://app.example.org/cb")
///             .client_id("app")
///             .build(),
///     ))
///     .unwrap();
///
/// let compactor = OAuthTokenCompactor::access_tokens(factory);
/// let compact = compactor.compact(&token).unwrap();
/// assert_eq!(compact, "https%3A//app.example.org/cb,app,,5,5,alice::");
///
/// let expanded = compactor.expand(&compact).unwrap();
/// assert_eq!(expanded.authentication().principal.id, "alice");
/// assert_ne!(expanded.id(), token.id());
/// ```
#[derive(Debug, Clone)]
pub struct OAuthTokenCompactor {
    factory: Arc<TicketFactory>,
    kind: TicketKind,
}

impl OAuthTokenCompactor {
    /// Compactor for access tokens.
    #[must_use]
    pub fn access_tokens(factory: Arc<TicketFactory>) -> Self {
        Self { factory, kind: TicketKind::AccessToken }
    }

    /// Compactor for refresh tokens.
    #[must_use]
    pub fn refresh_tokens(factory: Arc<TicketFactory>) -> Self {
        Self { factory, kind: TicketKind::RefreshToken }
    }

    /// The token kind this compactor handles.
    #[must_use]
    pub fn kind(&self) -> TicketKind {
        self.kind
    }

    /// Like [`expand`](TicketCompactor::expand), but keeps a known token id.
    ///
    /// # Errors
    ///
    /// - [`TicketError::MalformedTicket`] if the input is not a valid encoding.
    /// - [`TicketError::UnsupportedTicketKind`] if the factory has no policy for
    ///   this token kind.
    pub fn expand_with_id(&self, id: &str, compact: &str) -> TicketResult<Ticket> {
        let request = parse(compact)?;
        let policy = self
            .factory
            .policy(self.kind)
            .ok_or_else(|| TicketError::unsupported_kind(self.kind))?
            .clone();

        let OAuthTokenRequest {
            authentication,
            service,
            client_id,
            scopes,
            response_type,
            grant_type,
            ..
        } = request;
        let core = TicketCore::new(id.to_owned(), authentication, policy, self.factory.clock().now());
        let token = OAuthToken::new(core, OAuthTokenFields {
            service,
            client_id,
            scopes,
            ticket_granting_ticket: None,
            response_type,
            grant_type,
            code_challenge: None,
            code_challenge_method: None,
        });
        Ok(self.wrap(token))
    }

    fn wrap(&self, token: OAuthToken) -> Ticket {
        match self.kind {
            TicketKind::RefreshToken => Ticket::RefreshToken(token),
            _ => Ticket::AccessToken(token),
        }
    }
}

impl TicketCompactor for OAuthTokenCompactor {
    fn compact(&self, ticket: &Ticket) -> TicketResult<String> {
        let token = ticket
            .as_oauth_token()
            .filter(|_| ticket.kind() == self.kind)
            .ok_or_else(|| TicketError::unsupported_kind(ticket.kind()))?;
        let authentication = ticket.authentication();

        let scopes: Vec<String> = token.scopes().iter().map(|scope| escape(scope)).collect();
        let mut compact = String::new();
        compact.push_str(&escape(token.service().id()));
        compact.push(FIELD_SEPARATOR);
        compact.push_str(&escape(token.client_id()));
        compact.push(FIELD_SEPARATOR);
        compact.push_str(&scopes.join(&SCOPE_SEPARATOR.to_string()));
        let _ = write!(
            compact,
            "{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}{SUMMARY_SEPARATOR}{}{SUMMARY_SEPARATOR}{}",
            token.response_type().ordinal(),
            token.grant_type().ordinal(),
            escape(&authentication.principal.id),
            escape_list(&authentication.successful_handlers),
            escape_list(&authentication.credential_types),
        );
        Ok(compact)
    }

    fn expand(&self, compact: &str) -> TicketResult<Ticket> {
        let request = parse(compact)?;
        match self.kind {
            TicketKind::RefreshToken => self.factory.create(TicketRequest::RefreshToken(request)),
            _ => self.factory.create(TicketRequest::AccessToken(request)),
        }
    }
}

fn parse(compact: &str) -> TicketResult<OAuthTokenRequest> {
    let fields: Vec<&str> = compact.split(FIELD_SEPARATOR).collect();
    let &[service, client_id, scopes, response_type, grant_type, summary] = fields.as_slice() else {
        return Err(TicketError::malformed(format!(
            "expected {FIELD_COUNT} fields, found {}",
            fields.len()
        )));
    };

    let scopes = scopes
        .split(SCOPE_SEPARATOR)
        .filter(|scope| !scope.is_empty())
        .map(unescape)
        .collect::<TicketResult<BTreeSet<_>>>()?;

    let response_type = parse_ordinal(response_type, "response type").and_then(|ordinal| {
        ResponseType::from_ordinal(ordinal)
            .ok_or_else(|| TicketError::malformed(format!("unknown response type {ordinal}")))
    })?;
    let grant_type = parse_ordinal(grant_type, "grant type").and_then(|ordinal| {
        GrantType::from_ordinal(ordinal).ok_or_else(|| TicketError::malformed(format!("unknown grant type {ordinal}")))
    })?;

    let parts: Vec<&str> = summary.split(SUMMARY_SEPARATOR).collect();
    let &[principal, handlers, credential_types] = parts.as_slice() else {
        return Err(TicketError::malformed("authentication summary must have 3 parts"));
    };
    let principal = unescape(principal)?;
    if principal.is_empty() {
        return Err(TicketError::malformed("principal id is empty"));
    }

    let authentication = Authentication::builder()
        .principal(Principal::new(principal))
        .successful_handlers(unescape_list(handlers)?)
        .credential_types(unescape_list(credential_types)?)
        .build();

    Ok(OAuthTokenRequest::builder()
        .authentication(authentication)
        .service(unescape(service)?)
        .client_id(unescape(client_id)?)
        .scopes(scopes)
        .response_type(response_type)
        .grant_type(grant_type)
        .build())
}

fn parse_ordinal(field: &str, name: &str) -> TicketResult<u8> {
    field.parse().map_err(|_| TicketError::malformed(format!("invalid {name} ordinal: {field:?}")))
}

fn escape(atom: &str) -> String {
    let mut escaped = String::with_capacity(atom.len());
    for c in atom.chars() {
        match c {
            '%' | ',' | '|' | ':' | ';' => {
                let _ = write!(escaped, "%{:02X}", c as u32);
            },
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_list(values: &[String]) -> String {
    values
        .iter()
        .filter(|value| !value.is_empty())
        .map(|value| escape(value))
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string())
}

fn unescape(atom: &str) -> TicketResult<String> {
    let bytes = atom.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| TicketError::malformed(format!("invalid escape in {atom:?}")))?;
            decoded.push(hex);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).map_err(|_| TicketError::malformed(format!("escape is not UTF-8 in {atom:?}")))
}

fn unescape_list(list: &str) -> TicketResult<Vec<String>> {
    list.split(LIST_SEPARATOR).filter(|value| !value.is_empty()).map(unescape).collect()
}
