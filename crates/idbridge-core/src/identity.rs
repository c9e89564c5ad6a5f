//! Local user-identifier policies.
//!
//! A resolver maps (provider name, provider-scoped user id) onto the single
//! stable identifier embedded in minted tokens. Both policies are pure
//! functions: no I/O, no failure path, identical inputs always produce
//! identical output.

use sha2::{Digest, Sha256};

/// Maps a provider-scoped identity onto a stable local user identifier.
pub trait IdentityResolver: Send + Sync {
    /// Resolves the local user id for `provider_user_id` at `provider`.
    fn resolve(&self, provider: &str, provider_user_id: &str) -> String;
}

/// Reversible policy: percent-encodes both parts and joins them with a
/// literal `:` separator, e.g. `google:1234`.
///
/// Useful while debugging because the provider identity can be read straight
/// out of a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainIdentityResolver;

impl IdentityResolver for PlainIdentityResolver {
    fn resolve(&self, provider: &str, provider_user_id: &str) -> String {
        format!(
            "{}:{}",
            query_escape(provider),
            query_escape(provider_user_id)
        )
    }
}

/// Non-reversible policy: lowercase-hex SHA-256 of `provider:providerUserID`.
///
/// Produces fixed-length identifiers that don't leak which provider a user
/// came from.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashedIdentityResolver;

impl IdentityResolver for HashedIdentityResolver {
    fn resolve(&self, provider: &str, provider_user_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(provider.as_bytes());
        hasher.update(b":");
        hasher.update(provider_user_id.as_bytes());
        hex::encode(hasher.finalize())
    }
}

fn query_escape(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_resolver_joins_with_separator() {
        let resolver = PlainIdentityResolver;
        assert_eq!(
            resolver.resolve("someProvider", "someProviderUserId"),
            "someProvider:someProviderUserId"
        );
    }

    #[test]
    fn test_plain_resolver_escapes_colon_inside_parts() {
        let resolver = PlainIdentityResolver;
        assert_eq!(
            resolver.resolve("somePro:vider", "someProviderUserId"),
            "somePro%3Avider:someProviderUserId"
        );
    }

    #[test]
    fn test_hashed_resolver_known_digest() {
        let resolver = HashedIdentityResolver;
        assert_eq!(
            resolver.resolve("someProvider", "someProviderUserId"),
            "29e4c1b25d94c0379dab71eb2138f2a3c5171bd0fbfbc9f1ab2d94afe26afc95"
        );
    }

    #[test]
    fn test_hashed_resolver_is_lowercase_hex() {
        let resolver = HashedIdentityResolver;
        let id = resolver.resolve("github", "8675309");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_resolvers_are_deterministic() {
        let plain = PlainIdentityResolver;
        let hashed = HashedIdentityResolver;
        assert_eq!(
            plain.resolve("google", "user-1"),
            plain.resolve("google", "user-1")
        );
        assert_eq!(
            hashed.resolve("google", "user-1"),
            hashed.resolve("google", "user-1")
        );
    }

    #[test]
    fn test_resolvers_usable_as_trait_objects() {
        let resolvers: Vec<Box<dyn IdentityResolver>> = vec![
            Box::new(PlainIdentityResolver),
            Box::new(HashedIdentityResolver),
        ];
        for resolver in &resolvers {
            assert!(!resolver.resolve("google", "user-1").is_empty());
        }
    }
}
