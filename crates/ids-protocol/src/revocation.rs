//! Token revocation (RFC 7009).

use std::sync::Arc;

use ids_core::event::{Event, EventLogger, EventType};
use ids_store::TokenStore;

use crate::client_auth::{AuthenticationInstruction, ClientAuthenticator};
use crate::error::{OAuthError, OAuthResult};
use crate::request::RevocationRequest;

/// Revokes issued tokens on behalf of their owning client.
pub struct RevocationService {
    authenticator: Arc<ClientAuthenticator>,
    tokens: Arc<dyn TokenStore>,
    events: Arc<dyn EventLogger>,
}

impl RevocationService {
    /// Creates a new service.
    pub fn new(
        authenticator: Arc<ClientAuthenticator>,
        tokens: Arc<dyn TokenStore>,
        events: Arc<dyn EventLogger>,
    ) -> Self {
        Self {
            authenticator,
            tokens,
            events,
        }
    }

    /// Revokes the presented token.
    ///
    /// Per RFC 7009 an unknown token is a success: the caller cannot
    /// probe which token values exist. A token owned by a *different*
    /// client is treated the same as unknown, for the same reason.
    ///
    /// # Errors
    ///
    /// Returns `invalid_client` when caller authentication fails or
    /// `invalid_request` when the token parameter is missing.
    pub async fn revoke(
        &self,
        request: &RevocationRequest,
        instruction: &AuthenticationInstruction,
    ) -> OAuthResult<()> {
        if request.token.is_empty() {
            return Err(OAuthError::InvalidRequest("token is required".to_string()));
        }
        let caller = self.authenticator.authenticate(instruction).await?;

        let found = match self.tokens.get_by_access_token(&request.token).await? {
            Some(token) => Some(token),
            None => self.tokens.get_by_refresh_token(&request.token).await?,
        };

        if let Some(token) = found
            && token.client_id == caller.client_id
        {
            self.tokens.remove(&token.access_token).await?;
            self.events
                .log(
                    Event::builder(EventType::TokenRevoked)
                        .client(caller.client_id)
                        .build(),
                )
                .await;
        }

        Ok(())
    }
}
