use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "idbridge")]
#[command(about = "idbridge CLI — manage signing keys and smoke-test token minting")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage signing keys
    Keys(KeysArgs),
    /// Mint and inspect tokens
    Token(TokenArgs),
}

#[derive(clap::Args)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub command: KeysCommands,
}

#[derive(Subcommand)]
pub enum KeysCommands {
    /// Generate an RSA key pair as PEM files
    Generate(GenerateArgs),
}

#[derive(clap::Args)]
pub struct GenerateArgs {
    /// RSA modulus size in bits
    #[arg(long, default_value_t = idbridge_core::token::DEFAULT_RSA_BITS)]
    pub bits: usize,
    /// Where to write the private key (PKCS#8)
    #[arg(long, default_value = "private.pem")]
    pub private: PathBuf,
    /// Where to write the public key (SPKI)
    #[arg(long, default_value = "public.pem")]
    pub public: PathBuf,
    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommands,
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Mint a token for a synthetic identity using the configured key material
    Mint(MintArgs),
}

#[derive(clap::Args)]
pub struct MintArgs {
    /// Configuration file
    #[arg(long, env = "IDBRIDGE_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,
    /// Provider name recorded in the claims
    #[arg(long, default_value = "google")]
    pub provider: String,
    /// Provider user id the identity policy is applied to
    #[arg(long, default_value = "smoke-test-user")]
    pub user: String,
}
