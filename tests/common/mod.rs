//! Shared helpers for the HTTP integration tests: an app on the memory
//! backend, a cookie-carrying request helper, and a software authenticator
//! that answers ceremonies the way a browser + platform authenticator would.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};
use ciborium::value::Value as Cbor;
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use serde_json::{json, Value};
use sha2::{Digest, Sha256, Sha512};
use tower::ServiceExt;

use stateless_passkey::db::{CredentialStore, MemoryBackend};
use stateless_passkey::webauthn::types::RelyingParty;
use stateless_passkey::webauthn::Es256Verifier;
use stateless_passkey::{create_router, AppState};

pub const RP_ID: &str = "localhost";
pub const HOST: &str = "localhost:8080";
pub const ORIGIN: &str = "http://localhost:8080";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let store = CredentialStore::load(Arc::new(MemoryBackend::new()))
            .await
            .unwrap();
        let state = AppState::with_parts(
            store,
            Arc::new(Es256Verifier::new(RP_ID)),
            RelyingParty {
                id: RP_ID.to_string(),
                name: "Passkey Test".to_string(),
            },
        );
        Self {
            router: create_router(state.clone()),
            state,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.send("GET", uri, cookie, None).await
    }

    pub async fn post(&self, uri: &str, cookie: Option<&str>, body: Value) -> TestResponse {
        self.send("POST", uri, cookie, Some(body)).await
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, HOST);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, format!("SESSION={cookie}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        TestResponse::read(self.router.clone().oneshot(request).await.unwrap()).await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookie: Option<String>,
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    async fn read(response: Response<Body>) -> Self {
        let status = response.status();
        let header_text = |name: header::HeaderName| {
            response
                .headers()
                .get(name)
                .map(|v| v.to_str().unwrap().to_string())
        };
        let set_cookie = header_text(header::SET_COOKIE);
        let location = header_text(header::LOCATION);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        Self {
            status,
            set_cookie,
            location,
            body,
        }
    }

    /// Value of the `SESSION` cookie set by this response
    pub fn cookie(&self) -> String {
        let header = self.set_cookie.as_deref().expect("response sets a cookie");
        let pair = header.split(';').next().unwrap();
        let (name, value) = pair.split_once('=').unwrap();
        assert_eq!(name, "SESSION");
        value.to_string()
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// What a browser computes for the `user` field of `POST /register`
pub fn user_handle(username: &str) -> Vec<u8> {
    Sha512::digest(format!("{username}@{RP_ID}").as_bytes()).to_vec()
}

pub fn b64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// A single-credential ES256 platform authenticator.
pub struct SoftAuthenticator {
    key: SigningKey,
    credential_id: Vec<u8>,
    rp_id_hash: [u8; 32],
}

impl SoftAuthenticator {
    pub fn new() -> Self {
        let key = SigningKey::random(&mut rand::rngs::OsRng);
        let credential_id = Sha256::digest(key.verifying_key().to_sec1_bytes()).to_vec();
        Self {
            key,
            credential_id,
            rp_id_hash: Sha256::digest(RP_ID.as_bytes()).into(),
        }
    }

    fn challenge_of(options: &Value) -> Vec<u8> {
        STANDARD
            .decode(options["challenge"].as_str().expect("options carry a challenge"))
            .unwrap()
    }

    fn client_data(kind: &str, challenge: &[u8]) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "type": kind,
            "challenge": URL_SAFE_NO_PAD.encode(challenge),
            "origin": ORIGIN,
            "crossOrigin": false
        }))
        .unwrap()
    }

    fn cose_key(&self) -> Vec<u8> {
        let point = self.key.verifying_key().to_encoded_point(false);
        let key = Cbor::Map(vec![
            (Cbor::Integer(1i64.into()), Cbor::Integer(2i64.into())),
            (Cbor::Integer(3i64.into()), Cbor::Integer((-7i64).into())),
            (Cbor::Integer((-1i64).into()), Cbor::Integer(1i64.into())),
            (Cbor::Integer((-2i64).into()), Cbor::Bytes(point.x().unwrap().to_vec())),
            (Cbor::Integer((-3i64).into()), Cbor::Bytes(point.y().unwrap().to_vec())),
        ]);
        let mut buf = Vec::new();
        ciborium::into_writer(&key, &mut buf).unwrap();
        buf
    }

    /// Answer `navigator.credentials.create()` with a "none" attestation.
    pub fn attestation(&self, options: &Value, counter: u32) -> Value {
        let challenge = Self::challenge_of(options);

        let mut auth_data = self.rp_id_hash.to_vec();
        auth_data.push(0x45); // UP | UV | AT
        auth_data.extend_from_slice(&counter.to_be_bytes());
        auth_data.extend_from_slice(&[0u8; 16]);
        auth_data.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
        auth_data.extend_from_slice(&self.credential_id);
        auth_data.extend_from_slice(&self.cose_key());

        let object = Cbor::Map(vec![
            (Cbor::Text("fmt".into()), Cbor::Text("none".into())),
            (Cbor::Text("attStmt".into()), Cbor::Map(vec![])),
            (Cbor::Text("authData".into()), Cbor::Bytes(auth_data)),
        ]);
        let mut attestation_object = Vec::new();
        ciborium::into_writer(&object, &mut attestation_object).unwrap();

        json!({
            "id": URL_SAFE_NO_PAD.encode(&self.credential_id),
            "rawId": b64(&self.credential_id),
            "type": "public-key",
            "response": {
                "clientDataJSON": b64(&Self::client_data("webauthn.create", &challenge)),
                "attestationObject": b64(&attestation_object),
                "transports": ["internal"]
            }
        })
    }

    /// Answer `navigator.credentials.get()` for the credential of `handle`.
    pub fn assertion(&self, options: &Value, handle: &[u8], counter: u32) -> Value {
        let challenge = Self::challenge_of(options);

        let mut authenticator_data = self.rp_id_hash.to_vec();
        authenticator_data.push(0x05); // UP | UV
        authenticator_data.extend_from_slice(&counter.to_be_bytes());

        let client_data_json = Self::client_data("webauthn.get", &challenge);
        let mut message = authenticator_data.clone();
        message.extend_from_slice(&Sha256::digest(&client_data_json));
        let signature: Signature = self.key.sign(&message);

        json!({
            "id": URL_SAFE_NO_PAD.encode(&self.credential_id),
            "rawId": b64(&self.credential_id),
            "type": "public-key",
            "authenticatorAttachment": "platform",
            "response": {
                "clientDataJSON": b64(&client_data_json),
                "authenticatorData": b64(&authenticator_data),
                "signature": b64(signature.to_der().as_bytes()),
                "userHandle": b64(handle)
            }
        })
    }
}
