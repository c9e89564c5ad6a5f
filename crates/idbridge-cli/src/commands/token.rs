use anyhow::Context;
use colored::Colorize;
use idbridge_config::{IdentityPolicy, Settings};
use idbridge_core::{
    Claims, FederatedIdentity, HashedIdentityResolver, IdentityResolver, PlainIdentityResolver,
    ProviderToken, SignedToken, TokenSigner,
};

use crate::cli::MintArgs;
use crate::output::print_success;

pub fn mint(args: &MintArgs) -> anyhow::Result<()> {
    let settings = idbridge_config::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    let algorithm = settings.token.algorithm;

    let (signed, claims) = mint_token(settings, &args.provider, &args.user)?;

    print_success(&format!("Minted a {algorithm} token"));
    println!();
    println!("{}", "Token:".cyan());
    println!("{}", signed.as_str());
    println!();
    println!("{}", "Claims:".cyan());
    println!("{}", serde_json::to_string_pretty(&claims)?);

    Ok(())
}

/// Builds the configured signer and mints a token for a synthetic identity,
/// exercising the same policy and key material the server would use.
fn mint_token(
    settings: Settings,
    provider: &str,
    user: &str,
) -> anyhow::Result<(SignedToken, Claims)> {
    let signer = TokenSigner::new(settings.token.algorithm, settings.token.key_material)
        .context("Failed to construct the token signer")?;

    let resolver: Box<dyn IdentityResolver> = match settings.identity_policy {
        IdentityPolicy::Plain => Box::new(PlainIdentityResolver),
        IdentityPolicy::Hashed => Box::new(HashedIdentityResolver),
    };

    let identity = FederatedIdentity {
        provider: provider.to_string(),
        user_id: resolver.resolve(provider, user),
        token: ProviderToken {
            access_token: "smoke-test".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expires_at: None,
        },
    };

    let claims = settings.token.policy.claims_for(&identity);
    let signed = signer.sign(&claims).context("Failed to sign the token")?;

    Ok((signed, claims))
}
