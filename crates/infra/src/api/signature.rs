//! Request signing
//!
//! Every call carries `api_sig`, the lowercase hex MD5 of
//! `secret + "api_key" + api_key + k1 + v1 + k2 + v2 ...` with the
//! parameters in ascending key order. [`Params`] is a `BTreeMap`, so the
//! ordering is a property of the type rather than of how the map was built.

use std::collections::BTreeMap;
use std::fmt;

use md5::{Digest, Md5};
use url::Url;

/// Request parameters in canonical (sorted) order
pub type Params = BTreeMap<String, String>;

/// Build a [`Params`] map from string pairs.
pub fn params<I, K, V>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs.into_iter().map(|(key, value)| (key.into(), value.into())).collect()
}

/// Compute the request signature.
///
/// Pure function of its inputs. Every entry of `params` is signed as given;
/// callers do not put `api_key` in the map.
pub fn sign(api_key: &str, api_secret_key: &str, params: &Params) -> String {
    let mut hasher = Md5::new();
    hasher.update(api_secret_key.as_bytes());
    hasher.update(b"api_key");
    hasher.update(api_key.as_bytes());
    for (key, value) in params {
        hasher.update(key.as_bytes());
        hasher.update(value.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Signs requests for one API key pair
#[derive(Clone)]
pub struct Signer {
    api_key: String,
    api_secret_key: String,
}

impl Signer {
    pub fn new(api_key: impl Into<String>, api_secret_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), api_secret_key: api_secret_key.into() }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn sign(&self, params: &Params) -> String {
        sign(&self.api_key, &self.api_secret_key, params)
    }

    /// `base` with `api_key`, the sorted parameters and `api_sig` appended
    /// as query parameters.
    pub fn signed_url(&self, base: &Url, params: &Params) -> Url {
        let signature = self.sign(params);
        let mut url = base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api_key", &self.api_key);
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("api_sig", &signature);
        }
        url
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("api_key", &self.api_key)
            .field("api_secret_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_signature() {
        let p = params([("method", "ccc"), ("format", "bbb"), ("auth_token", "aaa")]);
        assert_eq!(sign("abc123", "BANANAS", &p), "0c2d0d76ef1087bcc7216e6f482213e0");
    }

    #[test]
    fn test_get_frob_signature() {
        let p = params([("format", "json"), ("method", "rtm.auth.getFrob")]);
        assert_eq!(sign("abc123", "BANANAS", &p), "5c220749da97b71ee02e45e2ed990c04");
    }

    #[test]
    fn test_auth_url_signature() {
        let p = params([("frob", "f00"), ("perms", "delete")]);
        assert_eq!(sign("abc123", "BANANAS", &p), "1ce0bcc795200cea52f62501acc028a7");
    }

    #[test]
    fn test_every_entry_is_signed() {
        let p = params([("api_key", "abc123"), ("format", "json")]);
        assert_eq!(sign("abc123", "BANANAS", &p), "94803eddbb1c0a64e4b128af0349e2a7");

        let without = params([("format", "json")]);
        assert_ne!(sign("abc123", "BANANAS", &p), sign("abc123", "BANANAS", &without));
    }

    #[test]
    fn test_signature_is_deterministic() {
        let p = params([("method", "rtm.tasks.getList"), ("format", "json")]);
        let first = sign("key", "secret", &p);

        assert_eq!(first, sign("key", "secret", &p));
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let forward = params([("method", "ccc"), ("format", "bbb"), ("auth_token", "aaa")]);
        let mut backward = Params::new();
        backward.insert("auth_token".into(), "aaa".into());
        backward.insert("format".into(), "bbb".into());
        backward.insert("method".into(), "ccc".into());

        assert_eq!(sign("k", "s", &forward), sign("k", "s", &backward));
    }

    #[test]
    fn test_any_value_change_changes_signature() {
        let base = params([("method", "ccc"), ("format", "bbb"), ("auth_token", "aaa")]);
        let reference = sign("k", "s", &base);

        for key in ["method", "format", "auth_token"] {
            let mut changed = base.clone();
            changed.insert(key.to_string(), "zzz".into());
            assert_ne!(sign("k", "s", &changed), reference, "changing {key} must change the digest");
        }
        assert_ne!(sign("k2", "s", &base), reference);
        assert_ne!(sign("k", "s2", &base), reference);
    }

    #[test]
    fn test_signed_url_query_layout() {
        let signer = Signer::new("abc123", "BANANAS");
        let base = Url::parse("https://api.rememberthemilk.com/services/rest/").unwrap();
        let url = signer.signed_url(&base, &params([("method", "ccc"), ("format", "bbb"), ("auth_token", "aaa")]));

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["api_key", "auth_token", "format", "method", "api_sig"]);
        assert_eq!(pairs[4].1, "0c2d0d76ef1087bcc7216e6f482213e0");
    }

    #[test]
    fn test_signed_url_encodes_values() {
        let signer = Signer::new("k", "s");
        let base = Url::parse("https://example.test/rest/").unwrap();
        let url = signer.signed_url(&base, &params([("name", "buy milk & eggs")]));

        let name = url.query_pairs().find(|(k, _)| k == "name").map(|(_, v)| v.into_owned());
        assert_eq!(name.as_deref(), Some("buy milk & eggs"));
        assert!(!url.as_str().contains("milk & eggs"));
    }

    #[test]
    fn test_debug_hides_secret() {
        let signer = Signer::new("abc123", "BANANAS");
        assert!(!format!("{signer:?}").contains("BANANAS"));
    }
}
