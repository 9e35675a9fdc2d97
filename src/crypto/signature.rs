//! Payload signatures
//!
//! Signs structured payloads on behalf of an identity so a third party
//! (a federation server, for instance) can check who produced them. The
//! payload is serialized canonically: JSON with object keys sorted at every
//! depth, so field declaration order never changes the signed bytes.

use crate::crypto::keys::{Keypair, PublicId, Seed};
use crate::errors::{SeedKeepError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use serde_json::{Map, Value};

/// Canonical byte form of a serializable payload
pub fn canonical_bytes<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<u8>> {
    let value = canonicalize(serde_json::to_value(payload)?);
    Ok(serde_json::to_vec(&value)?)
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Sign a payload with the identity derived from `secret_seed`
///
/// Returns the base64 Ed25519 signature. Ed25519 is deterministic, so the
/// same payload and seed always produce the same signature.
pub fn sign<T: Serialize + ?Sized>(payload: &T, secret_seed: &Seed) -> Result<String> {
    let bytes = canonical_bytes(payload)?;
    let keypair = Keypair::from_seed(secret_seed);
    Ok(STANDARD.encode(keypair.sign(&bytes)))
}

/// Verify a payload signature
///
/// Never returns `Ok(false)`: a missing payload or signature is
/// `BadParameters`, anything that does not verify is `Unauthorized`.
/// Null, `""`, `{}` and `[]` all count as a missing payload.
pub fn verify<T: Serialize + ?Sized>(
    payload: &T,
    public_id: &PublicId,
    signature: &str,
) -> Result<bool> {
    let value = serde_json::to_value(payload)?;
    if is_missing(&value) || signature.trim().is_empty() {
        return Err(SeedKeepError::BadParameters(
            "need data and signature".to_string(),
        ));
    }

    let bytes = serde_json::to_vec(&canonicalize(value))?;
    let signature = STANDARD.decode(signature.trim()).map_err(|_| {
        SeedKeepError::Unauthorized(format!("Invalid signature for {}", public_id))
    })?;

    public_id.verify(&bytes, &signature)?;
    Ok(true)
}

fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VECTOR_SEED: &str = "c6a3a702f5636854cde9fc39c450fb90d2798090470ac42bbf917d0abda75950";
    const VECTOR_ACCOUNT: &str = "GAUZC6DCLZFZJ4PJWFGWTVVPOH6UCSCFM76IICWNEC7FUAEVKF2BZTMO";
    const VECTOR_SIGNATURE: &str =
        "8A5nLhJ4P5S4tgwgOhUlShbD5R8KjIVrQYmtLZM0JA+S4qTBkHyKjQnrxoeWoWpGW/cQMAwR+6J0Xn8jdTArCQ==";

    #[derive(Serialize)]
    struct Registration<'a> {
        stellar_address: &'a str,
        account_id: &'a str,
    }

    #[test]
    fn test_fixed_vector() {
        let seed = Seed::from_hex(VECTOR_SEED).unwrap();
        let payload = Registration {
            stellar_address: "roberto*ngfar.io",
            account_id: VECTOR_ACCOUNT,
        };

        let signature = sign(&payload, &seed).unwrap();
        assert_eq!(signature, VECTOR_SIGNATURE);

        let public_id = Keypair::from_seed(&seed).public_id();
        assert!(verify(&payload, &public_id, &signature).unwrap());
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let seed = Seed::from_bytes([3u8; 32]);
        let a = json!({"a": 1, "b": {"y": true, "x": [ {"k": 1, "j": 2} ]}});
        let b = json!({"b": {"x": [ {"j": 2, "k": 1} ], "y": true}, "a": 1});

        assert_eq!(canonical_bytes(&a).unwrap(), canonical_bytes(&b).unwrap());
        assert_eq!(sign(&a, &seed).unwrap(), sign(&b, &seed).unwrap());
    }

    #[test]
    fn test_wrong_signer_is_unauthorized() {
        let payload = json!({"account_id": "abc"});
        let signature = sign(&payload, &Seed::from_bytes([1u8; 32])).unwrap();
        let other = Keypair::from_seed(&Seed::from_bytes([2u8; 32])).public_id();

        assert!(matches!(
            verify(&payload, &other, &signature),
            Err(SeedKeepError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_mutated_payload_is_unauthorized() {
        let seed = Seed::from_bytes([1u8; 32]);
        let public_id = Keypair::from_seed(&seed).public_id();
        let signature = sign(&json!({"amount": "10"}), &seed).unwrap();

        assert!(matches!(
            verify(&json!({"amount": "11"}), &public_id, &signature),
            Err(SeedKeepError::Unauthorized(_))
        ));
        assert!(matches!(
            verify(&json!({"amount": "10"}), &public_id, "bm90IGEgc2lnbmF0dXJl"),
            Err(SeedKeepError::Unauthorized(_))
        ));
        assert!(matches!(
            verify(&json!({"amount": "10"}), &public_id, "%%%"),
            Err(SeedKeepError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_missing_parts_are_bad_parameters() {
        let seed = Seed::from_bytes([1u8; 32]);
        let public_id = Keypair::from_seed(&seed).public_id();
        let signature = sign(&json!({"a": 1}), &seed).unwrap();

        let missing: Option<Value> = None;
        assert!(matches!(
            verify(&missing, &public_id, &signature),
            Err(SeedKeepError::BadParameters(_))
        ));
        assert!(matches!(
            verify(&json!({"a": 1}), &public_id, ""),
            Err(SeedKeepError::BadParameters(_))
        ));
    }

    #[test]
    fn test_empty_payloads_are_bad_parameters() {
        let seed = Seed::from_bytes([1u8; 32]);
        let public_id = Keypair::from_seed(&seed).public_id();

        for payload in [json!(""), json!({}), json!([])] {
            let signature = sign(&payload, &seed).unwrap();
            assert!(
                matches!(
                    verify(&payload, &public_id, &signature),
                    Err(SeedKeepError::BadParameters(_))
                ),
                "payload {} should be rejected",
                payload
            );
        }

        let zero = json!(0);
        let signature = sign(&zero, &seed).unwrap();
        assert!(verify(&zero, &public_id, &signature).unwrap());
    }
}
