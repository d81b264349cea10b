//! Reads a secret from a mocked vault: the first request is challenged, the policy discovers the
//! tenant and scope, fetches a client-credentials token, and retries once. A second policy then
//! authenticates on its first send thanks to the shared challenge cache.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use vault_challenge_auth::{
	auth::{ClientId, TenantId},
	challenge::ChallengeCache,
	credential::{ClientSecretCredential, ClientSecretCredentialOptions},
	http::{ReqwestHttpClient, Request},
	policy::{ChallengeAuthPolicy, ChallengePolicyOptions},
	reqwest::{Client, redirect::Policy},
};

// httpmock serves a self-signed certificate, so the demo transport skips verification.
fn demo_transport() -> Result<ReqwestHttpClient> {
	let client =
		Client::builder().danger_accept_invalid_certs(true).redirect(Policy::none()).build()?;

	Ok(ReqwestHttpClient::with_client(client))
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let challenge = format!(
		"Bearer authorization=\"{}\", resource=\"https://vault.azure.net\"",
		server.url("/tenant-acme")
	);
	let secret_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/secrets/db-password")
				.header("authorization", "Bearer demo-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"value\":\"correct-horse-battery-staple\"}");
		})
		.await;
	let probe_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/secrets/db-password").header_missing("authorization");
			then.status(401).header("www-authenticate", challenge.as_str());
		})
		.await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/tenant-acme/oauth2/v2.0/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let credential = ClientSecretCredential::new(
		TenantId::new("common")?,
		ClientId::new("demo-client")?,
		"super-secret",
	)?
	.with_options(ClientSecretCredentialOptions::default().with_authority_host(server.base_url()))
	.with_http_client(demo_transport()?);
	// The mock listens on 127.0.0.1, which is not inside vault.azure.net.
	let options = ChallengePolicyOptions::default()
		.with_cache(ChallengeCache::default())
		.disable_challenge_resource_verification();
	let transport = demo_transport()?;
	let policy = ChallengeAuthPolicy::with_options(credential.clone(), options.clone());

	for attempt in 1..=2 {
		let request = Request::builder()
			.method("GET")
			.uri(server.url("/secrets/db-password"))
			.body(Vec::new())?;
		let response = policy.send(request, &transport).await?;

		println!(
			"Attempt {attempt}: {} {}.",
			response.status(),
			String::from_utf8_lossy(response.body())
		);
	}

	let sibling = ChallengeAuthPolicy::with_options(credential, options);
	let request =
		Request::builder().method("GET").uri(server.url("/secrets/db-password")).body(Vec::new())?;
	let response = sibling.send(request, &transport).await?;

	println!("Sibling policy: {} without a probe.", response.status());

	probe_mock.assert_calls_async(1).await;
	secret_mock.assert_calls_async(3).await;
	token_mock.assert_async().await;

	Ok(())
}
