#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use vault_challenge_auth::{
	auth::{AccessToken, ClientId, ScopeSet, TenantId},
	credential::{
		ClientSecretCredential, ClientSecretCredentialOptions, TokenCredential,
		TokenRequestContext,
	},
	error::{CredentialError, Error, Result},
	http::ReqwestHttpClient,
	reqwest,
};

// httpmock serves a self-signed certificate.
fn test_transport() -> ReqwestHttpClient {
	let client = reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.redirect(reqwest::redirect::Policy::none())
		.build()
		.expect("Failed to build insecure reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

fn credential(server: &MockServer) -> ClientSecretCredential {
	ClientSecretCredential::new(
		TenantId::new("home-tenant").expect("Tenant fixture should be valid."),
		ClientId::new("vault-reader").expect("Client fixture should be valid."),
		"vault-secret",
	)
	.expect("Credential should build.")
	.with_options(ClientSecretCredentialOptions::default().with_authority_host(server.base_url()))
	.with_http_client(test_transport())
}

fn vault_scope() -> ScopeSet {
	ScopeSet::for_resource("https://vault.azure.net").expect("Vault scope should be valid.")
}

fn token_body(token: &str, expires_in: u32) -> String {
	format!("{{\"access_token\":\"{token}\",\"token_type\":\"bearer\",\"expires_in\":{expires_in}}}")
}

#[tokio::test]
async fn tokens_are_cached_per_tenant() {
	let server = MockServer::start_async().await;
	let home = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/home-tenant/oauth2/v2.0/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("home-token", 3600));
		})
		.await;
	let guest = server
		.mock_async(|when, then| {
			when.method(POST).path("/guest-tenant/oauth2/v2.0/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("guest-token", 3600));
		})
		.await;
	let credential = credential(&server);
	let home_request = TokenRequestContext::new(vault_scope());
	let guest_request = TokenRequestContext::new(vault_scope())
		.with_tenant(TenantId::new("guest-tenant").expect("Tenant fixture should be valid."));
	let first = credential.get_token(&home_request).await.expect("Home token should be issued.");
	let second = credential.get_token(&home_request).await.expect("Home token should be cached.");
	let third = credential.get_token(&guest_request).await.expect("Guest token should be issued.");

	assert_eq!(first.token.expose(), "home-token");
	assert_eq!(second, first);
	assert_eq!(third.token.expose(), "guest-token");

	home.assert_calls_async(1).await;
	guest.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_requests_share_one_exchange() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/home-tenant/oauth2/v2.0/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("guard-token", 900));
		})
		.await;
	let credential = credential(&server);
	let request = TokenRequestContext::new(vault_scope());
	let (first, second): (Result<AccessToken>, Result<AccessToken>) =
		tokio::join!(credential.get_token(&request), credential.get_token(&request));

	assert_eq!(first.expect("First call should succeed.").token.expose(), "guard-token");
	assert_eq!(second.expect("Second call should succeed.").token.expose(), "guard-token");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn tokens_inside_the_preemptive_window_are_refreshed() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/home-tenant/oauth2/v2.0/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("short-lived", 60));
		})
		.await;
	let credential = credential(&server);
	let request = TokenRequestContext::new(vault_scope());

	credential.get_token(&request).await.expect("First call should succeed.");
	credential.get_token(&request).await.expect("Second call should succeed.");

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn missing_expires_in_is_rejected() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/home-tenant/oauth2/v2.0/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"forever\",\"token_type\":\"bearer\"}");
		})
		.await;
	let err = credential(&server)
		.get_token(&TokenRequestContext::new(vault_scope()))
		.await
		.expect_err("Tokens without a lifetime cannot be cached.");

	assert!(matches!(err, Error::Credential(CredentialError::MissingExpiresIn)));

	mock.assert_async().await;
}
