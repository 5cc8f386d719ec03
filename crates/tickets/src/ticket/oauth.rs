//! OAuth access and refresh tokens.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{TicketCore, ticket_state_via_core};
use crate::authentication::Service;

/// OAuth `response_type` of the request that minted a token.
///
/// The ordinal is part of the compact token format and must stay stable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// `code`
    Code,
    /// `token`
    Token,
    /// `device_code`
    DeviceCode,
    /// `id_token`
    IdToken,
    /// `id_token token`
    IdTokenToken,
    /// No response type (e.g. client credentials).
    #[default]
    None,
}

impl ResponseType {
    const VALUES: [ResponseType; 6] = [
        Self::Code,
        Self::Token,
        Self::DeviceCode,
        Self::IdToken,
        Self::IdTokenToken,
        Self::None,
    ];

    /// Stable numeric position.
    #[must_use]
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Inverse of [`ordinal`](Self::ordinal).
    #[must_use]
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::VALUES.get(usize::from(ordinal)).copied()
    }
}

/// OAuth `grant_type` of the request that minted a token.
///
/// The ordinal is part of the compact token format and must stay stable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// `authorization_code`
    AuthorizationCode,
    /// `password`
    Password,
    /// `client_credentials`
    ClientCredentials,
    /// `refresh_token`
    RefreshToken,
    /// `urn:ietf:params:oauth:grant-type:device_code`
    DeviceCode,
    /// No grant type recorded.
    #[default]
    None,
}

impl GrantType {
    const VALUES: [GrantType; 6] = [
        Self::AuthorizationCode,
        Self::Password,
        Self::ClientCredentials,
        Self::RefreshToken,
        Self::DeviceCode,
        Self::None,
    ];

    /// Stable numeric position.
    #[must_use]
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Inverse of [`ordinal`](Self::ordinal).
    #[must_use]
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::VALUES.get(usize::from(ordinal)).copied()
    }
}

/// An OAuth access or refresh token.
///
/// The token may reference the session that minted it. Whether that
/// session's expiration also ends the token depends on the token's
/// policy: [`Dependent`](crate::ExpirationPolicy::Dependent) tokens follow
/// the session, [`Sovereign`](crate::ExpirationPolicy::Sovereign) tokens do not.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OAuthToken {
    core: TicketCore,
    service: Service,
    client_id: String,
    scopes: BTreeSet<String>,
    ticket_granting_ticket: Option<String>,
    response_type: ResponseType,
    grant_type: GrantType,
    code_challenge: Option<String>,
    code_challenge_method: Option<String>,
}

ticket_state_via_core!(OAuthToken);

/// Token fields beyond the shared ticket state.
pub(crate) struct OAuthTokenFields {
    pub(crate) service: Service,
    pub(crate) client_id: String,
    pub(crate) scopes: BTreeSet<String>,
    pub(crate) ticket_granting_ticket: Option<String>,
    pub(crate) response_type: ResponseType,
    pub(crate) grant_type: GrantType,
    pub(crate) code_challenge: Option<String>,
    pub(crate) code_challenge_method: Option<String>,
}

impl OAuthToken {
    pub(crate) fn new(core: TicketCore, fields: OAuthTokenFields) -> Self {
        let OAuthTokenFields {
            service,
            client_id,
            scopes,
            ticket_granting_ticket,
            response_type,
            grant_type,
            code_challenge,
            code_challenge_method,
        } = fields;
        Self {
            core,
            service,
            client_id,
            scopes,
            ticket_granting_ticket,
            response_type,
            grant_type,
            code_challenge,
            code_challenge_method,
        }
    }

    pub(crate) fn core(&self) -> &TicketCore {
        &self.core
    }

    pub(crate) fn core_mut(&mut self) -> &mut TicketCore {
        &mut self.core
    }

    /// The service (redirect URI) the token was issued for.
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// The registered OAuth client.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Granted scopes.
    #[must_use]
    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    /// Id of the session that minted the token, if any.
    #[must_use]
    pub fn ticket_granting_ticket(&self) -> Option<&str> {
        self.ticket_granting_ticket.as_deref()
    }

    /// Response type of the originating request.
    #[must_use]
    pub fn response_type(&self) -> ResponseType {
        self.response_type
    }

    /// Grant type of the originating request.
    #[must_use]
    pub fn grant_type(&self) -> GrantType {
        self.grant_type
    }

    /// PKCE code challenge.
    #[must_use]
    pub fn code_challenge(&self) -> Option<&str> {
        self.code_challenge.as_deref()
    }

    /// PKCE code challenge method, e.g. `S256`.
    #[must_use]
    pub fn code_challenge_method(&self) -> Option<&str> {
        self.code_challenge_method.as_deref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_stable() {
        assert_eq!(ResponseType::Code.ordinal(), 0);
        assert_eq!(ResponseType::None.ordinal(), 5);
        assert_eq!(GrantType::AuthorizationCode.ordinal(), 0);
        assert_eq!(GrantType::RefreshToken.ordinal(), 3);
    }

    #[test]
    fn from_ordinal_inverts_ordinal() {
        for value in ResponseType::VALUES {
            assert_eq!(ResponseType::from_ordinal(value.ordinal()), Some(value));
        }
        for value in GrantType::VALUES {
            assert_eq!(GrantType::from_ordinal(value.ordinal()), Some(value));
        }
        assert_eq!(ResponseType::from_ordinal(6), None);
        assert_eq!(GrantType::from_ordinal(u8::MAX), None);
    }
}
