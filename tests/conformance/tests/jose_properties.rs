//! JOSE round-trip, tamper, and rotation properties.
//!
//! Reference: RFC 7515, RFC 7516, RFC 7518.

use ids_jose::claims::names;
use ids_jose::{
    ContentEncryptionAlgorithm, JsonWebKey, JweEngine, JwsEngine, JwsPayload,
    KeyManagementAlgorithm, KeyStore, KeyUse, SignatureAlgorithm,
};

fn payload() -> JwsPayload {
    JwsPayload::new()
        .with(names::ISS, "https://issuer.example")
        .with(names::SUB, "sub-1")
        .with(names::EXP, 2_000_000_000i64)
}

fn signing_key(alg: SignatureAlgorithm) -> JsonWebKey {
    let kid = format!("k-{}", alg.jwa_name());
    if alg.is_hmac() {
        let len = match alg {
            SignatureAlgorithm::Hs256 => 32,
            SignatureAlgorithm::Hs384 => 48,
            _ => 64,
        };
        JsonWebKey::generate_oct(kid, KeyUse::Sig, alg.jwa_name(), len)
    } else if alg.is_rsa() {
        JsonWebKey::generate_rsa(kid, KeyUse::Sig, alg.jwa_name(), 2048).unwrap()
    } else {
        JsonWebKey::generate_ec(kid, KeyUse::Sig, alg).unwrap()
    }
}

/// jose: every signature algorithm round-trips sign → parse.
#[test]
fn jws_round_trip_across_the_algorithm_grid() {
    let engine = JwsEngine::new();
    for alg in [
        SignatureAlgorithm::Hs256,
        SignatureAlgorithm::Hs384,
        SignatureAlgorithm::Hs512,
        SignatureAlgorithm::Rs256,
        SignatureAlgorithm::Rs384,
        SignatureAlgorithm::Rs512,
        SignatureAlgorithm::Ps256,
        SignatureAlgorithm::Ps384,
        SignatureAlgorithm::Ps512,
        SignatureAlgorithm::Es256,
        SignatureAlgorithm::Es384,
        SignatureAlgorithm::Es512,
    ] {
        let key = signing_key(alg);
        let token = engine.sign(&payload(), &key).unwrap();
        assert_eq!(
            engine.parse(&token, &key),
            Some(payload()),
            "{}",
            alg.jwa_name()
        );
    }
}

/// jose: flipping any byte of the payload segment makes parse return
/// `None`, never panic or error.
#[test]
fn jws_tamper_detection_is_total() {
    let engine = JwsEngine::new();
    let key = signing_key(SignatureAlgorithm::Rs256);
    let token = engine.sign(&payload(), &key).unwrap();

    let parts: Vec<&str> = token.split('.').collect();
    for position in 0..parts[1].len() {
        let mut chars: Vec<char> = parts[1].chars().collect();
        chars[position] = if chars[position] == 'A' { 'B' } else { 'A' };
        let tampered_payload: String = chars.into_iter().collect();
        let tampered = format!("{}.{}.{}", parts[0], tampered_payload, parts[2]);
        assert!(engine.parse(&tampered, &key).is_none(), "byte {position}");
    }
}

/// jose: JWE round-trips across key-management and content-encryption
/// combinations, including the password-based variant.
#[test]
fn jwe_round_trip_matrix() {
    let engine = JweEngine::new();
    let plaintext = r#"{"sub":"sub-1"}"#;

    let rsa = JsonWebKey::generate_rsa("enc-rsa", KeyUse::Enc, "RSA-OAEP-256", 2048).unwrap();
    let kw = JsonWebKey::generate_oct("enc-kw", KeyUse::Enc, "A256KW", 32);
    let dir = JsonWebKey::generate_oct("enc-dir", KeyUse::Enc, "dir", 32);

    let cases: Vec<(&JsonWebKey, KeyManagementAlgorithm)> = vec![
        (&rsa, KeyManagementAlgorithm::Rsa1_5),
        (&rsa, KeyManagementAlgorithm::RsaOaep),
        (&rsa, KeyManagementAlgorithm::RsaOaep256),
        (&kw, KeyManagementAlgorithm::A256Kw),
        (&dir, KeyManagementAlgorithm::Dir),
    ];
    for (key, alg) in cases {
        for enc in [
            ContentEncryptionAlgorithm::A128CbcHs256,
            ContentEncryptionAlgorithm::A256Gcm,
        ] {
            // `dir` binds the key length to the enc algorithm.
            if alg == KeyManagementAlgorithm::Dir
                && enc == ContentEncryptionAlgorithm::A128CbcHs256
            {
                continue;
            }
            let token = engine.encrypt(plaintext, key, alg, enc).unwrap();
            assert_eq!(
                engine.parse(&token, key).as_deref(),
                Some(plaintext),
                "{} / {}",
                alg.jwa_name(),
                enc.jwa_name()
            );
        }
    }

    let password_token = engine
        .encrypt_with_password(
            plaintext,
            KeyManagementAlgorithm::Pbes2Hs512A256Kw,
            ContentEncryptionAlgorithm::A256CbcHs512,
            "client-1",
            "correct horse",
        )
        .unwrap();
    assert_eq!(
        engine
            .parse_with_password(&password_token, "correct horse")
            .as_deref(),
        Some(plaintext)
    );
    assert!(engine
        .parse_with_password(&password_token, "battery staple")
        .is_none());
}

/// jose: tampering with a JWE ciphertext or tag fails closed.
#[test]
fn jwe_tamper_detection() {
    let engine = JweEngine::new();
    let key = JsonWebKey::generate_oct("enc-1", KeyUse::Enc, "A128KW", 16);
    let token = engine
        .encrypt(
            r#"{"sub":"sub-1"}"#,
            &key,
            KeyManagementAlgorithm::A128Kw,
            ContentEncryptionAlgorithm::A128CbcHs256,
        )
        .unwrap();

    for segment in 3..=4 {
        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        let mut chars: Vec<char> = parts[segment].chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        parts[segment] = chars.into_iter().collect();
        assert!(
            engine.parse(&parts.join("."), &key).is_none(),
            "segment {segment}"
        );
    }
}

/// jose: rotation keeps old tokens verifiable through the version
/// fallback while new tokens use the fresh material.
#[test]
fn rotation_grace_window() {
    let store = KeyStore::new();
    store.insert(JsonWebKey::generate_rsa("sig-1", KeyUse::Sig, "RS256", 2048).unwrap());
    let engine = JwsEngine::new();

    let before = engine
        .sign(&payload(), &store.get_by_kid("sig-1").unwrap().key.clone())
        .unwrap();

    assert!(store.rotate().unwrap());

    let after = engine
        .sign(&payload(), &store.get_by_kid("sig-1").unwrap().key.clone())
        .unwrap();

    assert_eq!(store.parse_with_fallback(&engine, &before), Some(payload()));
    assert_eq!(store.parse_with_fallback(&engine, &after), Some(payload()));

    // Pruning to one version ends the grace window.
    store.prune(1);
    assert!(store.parse_with_fallback(&engine, &before).is_none());
    assert_eq!(store.parse_with_fallback(&engine, &after), Some(payload()));
}

/// jose: the public JWKS never contains private material and only
/// `sig`/`verify` keys.
#[test]
fn public_jwks_hygiene() {
    let store = KeyStore::new();
    store.insert(JsonWebKey::generate_rsa("sig-1", KeyUse::Sig, "RS256", 2048).unwrap());
    store.insert(JsonWebKey::generate_rsa("enc-1", KeyUse::Enc, "RSA-OAEP-256", 2048).unwrap());
    store.insert(JsonWebKey::generate_oct("hmac-1", KeyUse::Sig, "HS256", 32));

    let jwks = store.public_jwks();
    assert_eq!(jwks.keys.len(), 1);
    assert_eq!(jwks.keys[0].kid.as_deref(), Some("sig-1"));

    let json = serde_json::to_string(&jwks).unwrap();
    assert!(json.contains("\"n\":"));
    for private_member in ["\"d\":", "\"p\":", "\"q\":", "\"k\":"] {
        assert!(!json.contains(private_member), "{private_member}");
    }
}
