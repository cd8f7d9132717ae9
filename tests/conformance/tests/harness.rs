//! Test harness wiring the full engine with in-memory stores.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use ids_core::event::InMemoryEventLogger;
use ids_core::Config;
use ids_jose::{JsonWebKey, KeyStore, KeyUse};
use ids_model::{Client, GrantType, ResourceOwner, Scope};
use ids_protocol::{
    password, AuthenticationInstruction, ClaimsGenerator, ClientAuthenticator,
    IntrospectionService, RevocationService, TokenIssuer, TokenRequest,
};
use ids_store::{
    InMemoryAuthorizationCodeStore, InMemoryClientStore, InMemoryConfirmationCodeStore,
    InMemoryJtiReplayCache, InMemoryResourceOwnerStore, InMemoryScopeStore, InMemoryTokenStore,
};
use ids_uma::{InMemoryPolicyStore, InMemoryResourceSetStore, InMemoryTicketStore, TicketEngine};

pub const TEST_CLIENT_ID: &str = "WebSite";
pub const TEST_CLIENT_SECRET: &str = "s3cr3t";
pub const TEST_USERNAME: &str = "administrator";
pub const TEST_PASSWORD: &str = "password";

/// The whole engine, assembled over in-memory stores.
pub struct TestHarness {
    pub config: Arc<Config>,
    pub clients: Arc<InMemoryClientStore>,
    pub auth_codes: Arc<InMemoryAuthorizationCodeStore>,
    pub tokens: Arc<InMemoryTokenStore>,
    pub keystore: Arc<KeyStore>,
    pub issuer: TokenIssuer,
    pub introspection: IntrospectionService,
    pub revocation: RevocationService,
    pub resource_sets: Arc<InMemoryResourceSetStore>,
    pub tickets: Arc<InMemoryTicketStore>,
    pub policies: Arc<InMemoryPolicyStore>,
    pub ticket_engine: TicketEngine,
}

impl TestHarness {
    /// Builds the engine with the standard test fixtures: the
    /// `WebSite` client (secret `s3cr3t`, scopes `openid profile`),
    /// one resource owner, the standard scopes, and a signing plus an
    /// encryption key.
    pub async fn new() -> Self {
        let config = Arc::new(Config::default());

        let clients = Arc::new(InMemoryClientStore::new());
        clients.insert(website_client());

        let owners = Arc::new(InMemoryResourceOwnerStore::new());
        let hash = password::hash_password(TEST_PASSWORD).unwrap();
        let mut owner = ResourceOwner::new("sub-administrator", TEST_USERNAME, hash);
        owner
            .claims
            .insert("role".to_string(), "administrator".into());
        owners.insert(owner);

        let scopes = Arc::new(InMemoryScopeStore::with_standard_scopes());
        scopes.insert(Scope::new("read"));
        scopes.insert(Scope::new("write"));

        let keystore = Arc::new(KeyStore::new());
        keystore.insert(JsonWebKey::generate_rsa("1", KeyUse::Sig, "RS256", 2048).unwrap());
        keystore
            .insert(JsonWebKey::generate_rsa("2", KeyUse::Enc, "RSA-OAEP-256", 2048).unwrap());

        let auth_codes = Arc::new(InMemoryAuthorizationCodeStore::new());
        let confirmation_codes = Arc::new(InMemoryConfirmationCodeStore::new());
        let tokens = Arc::new(InMemoryTokenStore::new());
        let jti_cache = Arc::new(InMemoryJtiReplayCache::new());
        let events = Arc::new(InMemoryEventLogger::new());

        let authenticator = Arc::new(ClientAuthenticator::new(
            clients.clone(),
            jti_cache,
            config.issuer.name.clone(),
            events.clone(),
        ));
        let claims = Arc::new(ClaimsGenerator::new(config.clone(), clients.clone()));

        let issuer = TokenIssuer::new(
            config.clone(),
            authenticator.clone(),
            claims.clone(),
            keystore.clone(),
            auth_codes.clone(),
            confirmation_codes,
            tokens.clone(),
            owners.clone(),
            events.clone(),
        );

        let introspection = IntrospectionService::new(
            authenticator.clone(),
            tokens.clone(),
            config.issuer.name.clone(),
            events.clone(),
        );
        let revocation =
            RevocationService::new(authenticator.clone(), tokens.clone(), events.clone());

        let resource_sets = Arc::new(InMemoryResourceSetStore::new());
        let tickets = Arc::new(InMemoryTicketStore::new());
        let policies = Arc::new(InMemoryPolicyStore::new());

        let ticket_engine = TicketEngine::new(
            config.clone(),
            authenticator,
            claims,
            keystore.clone(),
            resource_sets.clone(),
            tickets.clone(),
            policies.clone(),
            tokens.clone(),
            events.clone(),
        );

        Self {
            config,
            clients,
            auth_codes,
            tokens,
            keystore,
            issuer,
            introspection,
            revocation,
            resource_sets,
            tickets,
            policies,
            ticket_engine,
        }
    }

    /// Basic Authorization header for the standard test client.
    pub fn basic_auth(&self) -> String {
        basic_auth(TEST_CLIENT_ID, TEST_CLIENT_SECRET)
    }

    /// Instruction for the standard test client.
    pub fn client_instruction(&self) -> AuthenticationInstruction {
        let header = self.basic_auth();
        AuthenticationInstruction::from_parts(Some(&header), &TokenRequest::default()).unwrap()
    }
}

/// Basic Authorization header for arbitrary credentials.
pub fn basic_auth(client_id: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{client_id}:{secret}")))
}

/// The standard test client registration.
pub fn website_client() -> Client {
    let mut client = Client::confidential(TEST_CLIENT_ID, TEST_CLIENT_SECRET);
    client.grant_types = vec![
        GrantType::AuthorizationCode,
        GrantType::ClientCredentials,
        GrantType::Password,
        GrantType::RefreshToken,
        GrantType::UmaTicket,
    ];
    client.allowed_scopes = vec![
        "openid".to_string(),
        "profile".to_string(),
        "read".to_string(),
    ];
    client.redirect_uris = vec!["https://website.example/callback".to_string()];
    client
}
