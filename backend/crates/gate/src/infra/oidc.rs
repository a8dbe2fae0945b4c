//! OIDC Provider
//!
//! Discovery-based client for the configured identity provider. The
//! gateway runs a plain authorization-code flow with `openid email`
//! scopes; the caller's CSRF `state` lives on the session, so the
//! provider seam only builds URLs and exchanges codes.

use openidconnect::core::{CoreClient, CoreProviderMetadata, CoreResponseType};
use openidconnect::reqwest::async_http_client;
use openidconnect::{
    AuthenticationFlow, AuthorizationCode, ClientId, ClientSecret, CsrfToken, IssuerUrl, Nonce,
    RedirectUrl, Scope, TokenResponse,
};

use crate::application::config::OidcConfig;
use crate::domain::upstream::{IdentityProvider, OidcIdentity};
use crate::error::{GateError, GateResult};

pub struct OidcProvider {
    client: CoreClient,
    name: String,
}

impl OidcProvider {
    /// Run discovery against the issuer and build the client. Fails when
    /// the issuer is unreachable; the caller decides whether that is
    /// fatal.
    pub async fn discover(config: &OidcConfig) -> GateResult<Self> {
        let issuer = IssuerUrl::new(config.issuer_url.clone())
            .map_err(|e| GateError::Internal(format!("issuer url: {e}")))?;
        let metadata = CoreProviderMetadata::discover_async(issuer, async_http_client)
            .await
            .map_err(|e| GateError::upstream("oidc", format!("discovery failed: {e}")))?;

        let redirect = RedirectUrl::new(config.redirect_uri.clone())
            .map_err(|e| GateError::Internal(format!("redirect uri: {e}")))?;
        let client = CoreClient::from_provider_metadata(
            metadata,
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
        )
        .set_redirect_uri(redirect);

        tracing::info!(issuer = %config.issuer_url, provider = %config.provider_name, "OIDC provider discovered");
        Ok(Self {
            client,
            name: config.provider_name.clone(),
        })
    }
}

impl IdentityProvider for OidcProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn authorize_url(&self, state: &str) -> String {
        let state = CsrfToken::new(state.to_string());
        let (url, _, _) = self
            .client
            .authorize_url(
                AuthenticationFlow::<CoreResponseType>::AuthorizationCode,
                move || state,
                Nonce::new_random,
            )
            .add_scope(Scope::new("email".to_string()))
            .url();
        url.to_string()
    }

    async fn exchange(&self, code: &str) -> GateResult<OidcIdentity> {
        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| GateError::BadInput(format!("token exchange failed: {e}")))?;

        let id_token = token_response
            .id_token()
            .ok_or_else(|| GateError::BadInput("provider returned no id token".to_string()))?;

        // The state on the session already binds the callback to this
        // flow; the nonce is not round-tripped.
        let verifier = self.client.id_token_verifier();
        let claims = id_token
            .claims(&verifier, |_: Option<&Nonce>| Ok(()))
            .map_err(|e| GateError::BadInput(format!("id token verification failed: {e}")))?;

        Ok(OidcIdentity {
            subject: claims.subject().to_string(),
            email: claims.email().map(|email| email.to_string()),
        })
    }
}
