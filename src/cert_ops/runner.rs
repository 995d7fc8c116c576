//! Runners for the bundle subcommands
//!
//! Perform the file I/O around the codec, resolve passwords, and print
//! results as styled text or JSON.

use crate::cert_ops::convert::BundleCodec;
use crate::cert_ops::reader;
use crate::cli::{
    CreateP7bArgs, CreatePfxArgs, DetectArgs, ExtractP7bArgs, ExtractPfxArgs, VerifyArgs,
};
use crate::config::{CaBundlePolicy, Settings};
use crate::models::ParsedComponents;
use crate::utils::{BundleError, ToolkitError};
use console::style;
use std::path::{Path, PathBuf};

fn read_bytes(path: &Path) -> Result<Vec<u8>, ToolkitError> {
    std::fs::read(path).map_err(|e| ToolkitError::FileRead {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn read_text(path: &Path) -> Result<String, ToolkitError> {
    std::fs::read_to_string(path).map_err(|e| ToolkitError::FileRead {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn read_optional_text(path: Option<&PathBuf>) -> Result<Option<String>, ToolkitError> {
    path.map(|p| read_text(p)).transpose()
}

fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), ToolkitError> {
    std::fs::write(path, contents)?;
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "bundle".to_string())
}

/// Generate a default output path by changing the extension
pub fn default_output_path(input: &Path, extension: &str) -> PathBuf {
    input.with_file_name(format!("{}.{}", file_stem(input), extension))
}

/// Decode a PKCS#12 bundle, prompting for its password if needed.
///
/// If no password was supplied, the empty password is tried first; when that
/// is rejected the user is prompted on an interactive terminal.
fn extract_with_password_prompt(
    codec: &BundleCodec,
    path: &Path,
    data: &[u8],
    password: Option<&str>,
    key_password: Option<&str>,
) -> Result<ParsedComponents, anyhow::Error> {
    if let Some(pwd) = password {
        return Ok(codec.extract_from_pfx(data, pwd, key_password)?);
    }

    match codec.extract_from_pfx(data, "", key_password) {
        Ok(parsed) => Ok(parsed),
        Err(BundleError::BadCredentials) => {
            if console::Term::stderr().is_term() {
                let pwd = dialoguer::Password::new()
                    .with_prompt(format!("Password for {}", file_name(path)))
                    .allow_empty_password(true)
                    .interact()?;
                Ok(codec.extract_from_pfx(data, &pwd, key_password)?)
            } else {
                anyhow::bail!(
                    "PKCS#12 file {} requires a password (use --password)",
                    path.display()
                );
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Password for a new bundle: the flag, else a confirmed prompt.
fn resolve_new_password(password: Option<&str>) -> Result<String, anyhow::Error> {
    if let Some(pwd) = password {
        return Ok(pwd.to_string());
    }

    if console::Term::stderr().is_term() {
        let pwd = dialoguer::Password::new()
            .with_prompt("Password for the new bundle")
            .with_confirmation("Confirm password", "Passwords do not match")
            .allow_empty_password(true)
            .interact()?;
        Ok(pwd)
    } else {
        anyhow::bail!("A password for the new bundle is required (use --password)");
    }
}

/// Print or write extracted components
fn emit_components(
    parsed: &ParsedComponents,
    input: &Path,
    out_dir: Option<&Path>,
    json: bool,
) -> Result<(), anyhow::Error> {
    if let Some(dir) = out_dir {
        std::fs::create_dir_all(dir)?;
        let stem = file_stem(input);
        let outputs = [
            (&parsed.key, format!("{}.key", stem), "Private key"),
            (&parsed.cert, format!("{}.crt", stem), "Certificate"),
            (&parsed.ca, format!("{}-ca.crt", stem), "CA chain"),
        ];
        for (contents, name, label) in outputs {
            if let Some(contents) = contents {
                let path = dir.join(name);
                write_file(&path, contents)?;
                if !json {
                    println!("  {} {}: {}", style("✓").green(), label, path.display());
                }
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(parsed)?);
    } else if out_dir.is_none() {
        for contents in [&parsed.key, &parsed.cert, &parsed.ca].into_iter().flatten() {
            print!("{}", contents);
        }
    }

    Ok(())
}

/// Run the `extract-pfx` command
pub fn run_extract_pfx(args: &ExtractPfxArgs, settings: &Settings) -> Result<(), anyhow::Error> {
    let mut settings = settings.clone();
    if let Some(selection) = args.leaf_selection {
        settings.pfx.leaf_selection = selection;
    }
    let codec = BundleCodec::new(settings);

    let data = read_bytes(&args.input)?;
    let parsed = extract_with_password_prompt(
        &codec,
        &args.input,
        &data,
        args.password.as_deref(),
        args.key_password.as_deref(),
    )?;

    if !args.json {
        println!(
            "  {} Extracted {} (key: {}, CA certificates: {})",
            style("✓").green(),
            file_name(&args.input),
            if parsed.key.is_some() { "yes" } else { "no" },
            parsed.ca_count()
        );
    }

    emit_components(&parsed, &args.input, args.out_dir.as_deref(), args.json)
}

/// Run the `extract-p7b` command
pub fn run_extract_p7b(args: &ExtractP7bArgs, settings: &Settings) -> Result<(), anyhow::Error> {
    let codec = BundleCodec::new(settings.clone());
    let data = read_bytes(&args.input)?;
    let parsed = codec.extract_from_p7b(&data)?;

    if !args.json {
        println!(
            "  {} Extracted {} (CA certificates: {})",
            style("✓").green(),
            file_name(&args.input),
            parsed.ca_count()
        );
    }

    emit_components(&parsed, &args.input, args.out_dir.as_deref(), args.json)
}

/// Run the `verify` command. Returns whether the pair matched.
pub fn run_verify(args: &VerifyArgs, settings: &Settings) -> Result<bool, anyhow::Error> {
    let codec = BundleCodec::new(settings.clone());
    let cert_pem = read_text(&args.cert)?;
    let key_pem = read_text(&args.key)?;

    let matched = codec.verify_cert_key_match(&cert_pem, &key_pem, args.password.as_deref())?;

    if args.json {
        let result = serde_json::json!({
            "cert": args.cert.display().to_string(),
            "key": args.key.display().to_string(),
            "match": matched,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if matched {
        println!(
            "  {} Certificate and private key match",
            style("✓").green()
        );
    } else {
        println!(
            "  {} Certificate and private key do not match",
            style("✗").red()
        );
    }

    Ok(matched)
}

/// Run the `create-pfx` command
pub fn run_create_pfx(args: &CreatePfxArgs, settings: &Settings) -> Result<(), anyhow::Error> {
    let mut settings = settings.clone();
    if args.strict_ca {
        settings.ca_bundle.policy = CaBundlePolicy::Strict;
    }
    if let Some(encryption) = args.encryption {
        settings.pfx.encryption = encryption;
    }
    let codec = BundleCodec::new(settings);

    let key_pem = read_text(&args.key)?;
    let cert_pem = read_text(&args.cert)?;
    let ca_pem = read_optional_text(args.ca.as_ref())?;
    let password = resolve_new_password(args.password.as_deref())?;

    let pfx = codec.create_pfx(
        &key_pem,
        &cert_pem,
        ca_pem.as_deref(),
        &password,
        args.name.as_deref(),
    )?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.cert, "pfx"));
    write_file(&output, &pfx)?;

    println!(
        "  {} Created PKCS#12: {}",
        style("✓").green(),
        output.display()
    );
    Ok(())
}

/// Run the `create-p7b` command
pub fn run_create_p7b(args: &CreateP7bArgs, settings: &Settings) -> Result<(), anyhow::Error> {
    let mut settings = settings.clone();
    if args.strict_ca {
        settings.ca_bundle.policy = CaBundlePolicy::Strict;
    }
    let codec = BundleCodec::new(settings);

    let cert_pem = read_text(&args.cert)?;
    let ca_pem = read_optional_text(args.ca.as_ref())?;

    let p7b = codec.create_p7b(&cert_pem, ca_pem.as_deref())?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.cert, "p7b"));
    write_file(&output, p7b)?;

    println!(
        "  {} Created PKCS#7: {}",
        style("✓").green(),
        output.display()
    );
    Ok(())
}

/// Run the `detect` command
pub fn run_detect(args: &DetectArgs) -> Result<(), anyhow::Error> {
    let data = read_bytes(&args.input)?;
    match reader::detect_format_from_bytes(&data) {
        Some(format) => {
            println!("{}: {}", args.input.display(), style(format).cyan());
            Ok(())
        }
        None => anyhow::bail!(
            "{}: unknown format (could not detect PEM, DER, PKCS#7, or PKCS#12)",
            args.input.display()
        ),
    }
}
