//! Analysis results keyed by a hash of the analyzed text, one key space per rule kind.

use std::sync::Arc;

use crate::schema::Validate;
use crate::store::{self, Store};
use crate::{Rule, RuleKind};

/// 32-bit rolling hash (`h * 31 + unit` over UTF-16 code units), absolute
/// value in base 36. Fast and deterministic; not collision resistant.
pub fn content_hash(text: &str) -> String {
    let hash = text
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    to_base36(i64::from(hash).unsigned_abs())
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

pub fn cache_prefix(kind: RuleKind) -> String {
    format!("cache-{}-", kind.as_str())
}

pub fn cache_key(kind: RuleKind, text: &str) -> String {
    format!("{}{}", cache_prefix(kind), content_hash(text))
}

#[derive(Clone)]
pub struct AnalysisCache {
    store: Arc<dyn Store>,
}

impl AnalysisCache {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Store `result` for `text`. Invalid results are refused and any
    /// previous entry is left as it was.
    pub fn save<R: Rule>(&self, text: &str, result: &R::Outcome) {
        let key = cache_key(R::KIND, text);
        if let Err(e) = result.validate() {
            tracing::error!(key, error = %e, "refusing to cache invalid analysis result");
            return;
        }
        store::put(self.store.as_ref(), &key, result);
    }

    pub fn load<R: Rule>(&self, text: &str) -> Option<R::Outcome> {
        store::validated_get::<R::Outcome>(self.store.as_ref(), &cache_key(R::KIND, text))
    }

    /// Remove every cached result of `kind`. Other kinds and state keys are untouched.
    pub fn clear(&self, kind: RuleKind) {
        let prefix = cache_prefix(kind);
        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!(error = %e, "failed to list cache entries");
                return;
            }
        };
        let mut removed = 0usize;
        for key in keys.iter().filter(|k| k.starts_with(&prefix)) {
            store::discard(self.store.as_ref(), key);
            removed += 1;
        }
        tracing::debug!(%kind, removed, "cleared analysis cache");
    }
}
