//! Appcast checkpoints.
//!
//! A checkpoint is the SHA-256 of the feed body after every
//! `<pubDate>...</pubDate>` element has been removed, so a feed that only
//! re-stamps its dates keeps the same checkpoint.

use std::borrow::Cow;
use std::sync::LazyLock;

use cask_schema::Sha256Digest;
use regex::bytes::Regex;
use sha2::{Digest, Sha256};

static PUB_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<pubDate>[^<]*</pubDate>").expect("static regex"));

/// Strip the volatile parts of a feed body.
pub fn canonicalize(content: &[u8]) -> Cow<'_, [u8]> {
    PUB_DATE.replace_all(content, &b""[..])
}

/// Fingerprint a feed body.
pub fn fingerprint(content: &[u8]) -> Sha256Digest {
    let digest: [u8; 32] = Sha256::digest(canonicalize(content)).into();
    Sha256Digest::from_bytes(&digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body() {
        assert_eq!(
            fingerprint(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn pub_dates_are_ignored() {
        let a = b"<rss><item><title>1.0</title><pubDate>Mon, 01 Jan 2018 10:00:00 +0000</pubDate></item></rss>";
        let b = b"<rss><item><title>1.0</title><pubDate>Tue, 02 Jan 2018 11:00:00 +0000</pubDate></item></rss>";
        assert_eq!(fingerprint(a), fingerprint(b));
        assert_eq!(
            canonicalize(a).as_ref(),
            b"<rss><item><title>1.0</title></item></rss>"
        );
    }

    #[test]
    fn any_other_byte_changes_the_checkpoint() {
        let a = b"<rss><item><title>1.0</title></item></rss>";
        let b = b"<rss><item><title>1.1</title></item></rss>";
        assert_ne!(fingerprint(a), fingerprint(b));
    }
}
