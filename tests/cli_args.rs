use bundle_toolkit::cli::{Cli, Commands};
use bundle_toolkit::config::{LeafSelection, PfxEncryption};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_extract_pfx_args() {
    let cli = Cli::try_parse_from([
        "bundle-toolkit",
        "extract-pfx",
        "site.pfx",
        "-p",
        "secret",
        "--key-password",
        "other",
        "--leaf-selection",
        "local-key-id",
        "--json",
    ])
    .unwrap();

    let Commands::ExtractPfx(args) = cli.command else {
        panic!("expected extract-pfx");
    };
    assert_eq!(args.input, PathBuf::from("site.pfx"));
    assert_eq!(args.password.as_deref(), Some("secret"));
    assert_eq!(args.key_password.as_deref(), Some("other"));
    assert_eq!(args.leaf_selection, Some(LeafSelection::LocalKeyId));
    assert!(args.json);
    assert!(args.out_dir.is_none());
}

#[test]
fn test_create_pfx_args() {
    let cli = Cli::try_parse_from([
        "bundle-toolkit",
        "create-pfx",
        "--key",
        "site.key",
        "--cert",
        "site.crt",
        "--ca",
        "chain.pem",
        "--name",
        "My Site",
        "--strict-ca",
        "--encryption",
        "aes-256",
        "-o",
        "out.pfx",
    ])
    .unwrap();

    let Commands::CreatePfx(args) = cli.command else {
        panic!("expected create-pfx");
    };
    assert_eq!(args.ca, Some(PathBuf::from("chain.pem")));
    assert_eq!(args.name.as_deref(), Some("My Site"));
    assert!(args.strict_ca);
    assert_eq!(args.encryption, Some(PfxEncryption::Aes256));
    assert_eq!(args.output, Some(PathBuf::from("out.pfx")));
    assert!(args.password.is_none());
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "bundle-toolkit",
        "detect",
        "file.bin",
        "--no-color",
        "-v",
        "--config",
        "custom.toml",
    ])
    .unwrap();
    assert!(cli.no_color);
    assert!(cli.verbose);
    assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
}

#[test]
fn test_verify_requires_cert_and_key() {
    assert!(Cli::try_parse_from(["bundle-toolkit", "verify", "--cert", "a.crt"]).is_err());
    assert!(Cli::try_parse_from(["bundle-toolkit", "verify", "--cert", "a.crt", "--key", "a.key"]).is_ok());
}

#[test]
fn test_unknown_encryption_rejected() {
    assert!(Cli::try_parse_from([
        "bundle-toolkit",
        "create-pfx",
        "--key",
        "k",
        "--cert",
        "c",
        "--encryption",
        "rc4"
    ])
    .is_err());
}

#[test]
fn test_subcommand_required() {
    assert!(Cli::try_parse_from(["bundle-toolkit"]).is_err());
}
