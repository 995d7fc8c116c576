//! CLI argument definitions using clap

use crate::config::{LeafSelection, PfxEncryption};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bundle-toolkit")]
#[command(author = "Russ McKendrick")]
#[command(version)]
#[command(about = "Convert between PKCS#12, PKCS#7 and PEM certificate bundles", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (defaults to config/default.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Unpack a PKCS#12 (.pfx/.p12) bundle into key, certificate and CA chain
    ExtractPfx(ExtractPfxArgs),

    /// Unpack a PKCS#7 (.p7b/.p7c) bundle into certificate and CA chain
    ExtractP7b(ExtractP7bArgs),

    /// Check that a certificate and a private key belong together
    Verify(VerifyArgs),

    /// Build a PKCS#12 bundle from PEM files
    CreatePfx(CreatePfxArgs),

    /// Build a PKCS#7 bundle from PEM files
    CreateP7b(CreateP7bArgs),

    /// Report the format of a certificate or bundle file
    Detect(DetectArgs),
}

#[derive(Args)]
pub struct ExtractPfxArgs {
    /// PKCS#12 file
    #[arg(required = true)]
    pub input: PathBuf,

    /// Password protecting the bundle
    #[arg(short, long)]
    pub password: Option<String>,

    /// Re-encrypt the extracted private key with this password
    #[arg(long)]
    pub key_password: Option<String>,

    /// Write <stem>.key, <stem>.crt and <stem>-ca.crt into this directory
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// How to pick the leaf certificate
    #[arg(long, value_enum)]
    pub leaf_selection: Option<LeafSelection>,

    /// Print components as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ExtractP7bArgs {
    /// PKCS#7 file, DER or PEM
    #[arg(required = true)]
    pub input: PathBuf,

    /// Write <stem>.crt and <stem>-ca.crt into this directory
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Print components as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Certificate (PEM)
    #[arg(long, required = true)]
    pub cert: PathBuf,

    /// Private key (PEM)
    #[arg(long, required = true)]
    pub key: PathBuf,

    /// Password for an encrypted private key
    #[arg(short, long)]
    pub password: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CreatePfxArgs {
    /// Private key (PEM)
    #[arg(long, required = true)]
    pub key: PathBuf,

    /// Leaf certificate (PEM)
    #[arg(long, required = true)]
    pub cert: PathBuf,

    /// CA bundle (concatenated PEM)
    #[arg(long)]
    pub ca: Option<PathBuf>,

    /// Password for the new bundle
    #[arg(short, long)]
    pub password: Option<String>,

    /// Friendly name stored with the key and leaf certificate
    #[arg(long)]
    pub name: Option<String>,

    /// Output file (defaults to <cert stem>.pfx)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Reject CA bundles containing unparsable blocks
    #[arg(long)]
    pub strict_ca: bool,

    /// Cipher family for the bundle
    #[arg(long, value_enum)]
    pub encryption: Option<PfxEncryption>,
}

#[derive(Args)]
pub struct CreateP7bArgs {
    /// Leaf certificate (PEM)
    #[arg(long, required = true)]
    pub cert: PathBuf,

    /// CA bundle (concatenated PEM)
    #[arg(long)]
    pub ca: Option<PathBuf>,

    /// Output file (defaults to <cert stem>.p7b)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Reject CA bundles containing unparsable blocks
    #[arg(long)]
    pub strict_ca: bool,
}

#[derive(Args)]
pub struct DetectArgs {
    /// File to inspect
    #[arg(required = true)]
    pub input: PathBuf,
}
