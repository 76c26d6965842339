// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{anyhow, Context as _};
use appx_signature::origin::describe_extensions;
use appx_signature::{
    DigestMap, SignatureValidator, SignedContainer, TrustAnchorConfig, ValidationOptions,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn usage() -> &'static str {
    concat!(
        "appx-signature-demo\n\n",
        "USAGE:\n",
        "  appx-signature-demo validate --p7x <path> --trusted-roots <pem>\n",
        "      [--allow-unknown-origin] [--skip-signature] [--dump-extensions]\n\n",
        "NOTES:\n",
        "  --trusted-roots is a file of concatenated PEM certificates.\n",
        "  Set RUST_LOG=appx_signature=trace to see path construction diagnostics.\n",
    )
}

fn read_all(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read: {}", path.display()))
}

fn dump_extensions(p7x: &[u8]) -> anyhow::Result<()> {
    let container = SignedContainer::read_from(&mut Cursor::new(p7x))
        .context("failed to parse p7x container")?;
    let chain = container
        .signer_certificates()
        .context("failed to decode signer certificates")?;

    for (index, cert) in chain.iter().enumerate() {
        println!("certificate #{index}: {}", cert.subject());
        for ext in describe_extensions(cert)? {
            let critical = if ext.critical { " (critical)" } else { "" };
            println!("  {}{critical}: {}", ext.name, ext.value);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut args = std::env::args().skip(1);

    let Some(cmd) = args.next() else {
        return Err(anyhow!(usage()));
    };

    if cmd != "validate" {
        return Err(anyhow!(usage()));
    }

    let mut p7x_path: Option<PathBuf> = None;
    let mut roots_path: Option<PathBuf> = None;
    let mut options = ValidationOptions::default();
    let mut dump = false;

    while let Some(a) = args.next() {
        match a.as_str() {
            "--p7x" => {
                let p = args.next().ok_or_else(|| anyhow!("--p7x requires a path"))?;
                p7x_path = Some(PathBuf::from(p));
            }
            "--trusted-roots" => {
                let p = args
                    .next()
                    .ok_or_else(|| anyhow!("--trusted-roots requires a path"))?;
                roots_path = Some(PathBuf::from(p));
            }
            "--allow-unknown-origin" => options.allow_unknown_origin = true,
            "--skip-signature" => options.skip_signature = true,
            "--dump-extensions" => dump = true,
            "--help" | "-h" => {
                return Err(anyhow!(usage()));
            }
            other => {
                return Err(anyhow!(format!("Unknown arg: {other}\n\n{}", usage())));
            }
        }
    }

    let p7x_path = p7x_path.ok_or_else(|| anyhow!("--p7x is required\n\n{}", usage()))?;
    let roots_path =
        roots_path.ok_or_else(|| anyhow!("--trusted-roots is required\n\n{}", usage()))?;

    let p7x = read_all(&p7x_path)?;
    let bundle = String::from_utf8(read_all(&roots_path)?)
        .with_context(|| format!("trusted roots are not UTF-8: {}", roots_path.display()))?;
    let roots = TrustAnchorConfig::from_pem_bundle(&bundle);
    tracing::debug!(roots = roots.len(), "loaded trusted roots");

    if dump {
        dump_extensions(&p7x)?;
    }

    let validator = SignatureValidator::new(roots);
    let mut digests = DigestMap::new();
    let outcome = validator
        .validate(&options, &mut Cursor::new(p7x), &mut digests)
        .context("validation failed")?;

    println!("validated: {}", outcome.validated);
    println!("origin: {}", outcome.origin);

    Ok(())
}
