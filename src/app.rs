//! Application orchestrator.
//! Loads config, applies CLI overrides, initializes logging, installs the Ctrl-C handler,
//! resolves the share link, writes the audit row and publishes the quicklink.

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

use cloud_quicklink::cli::Args;
use cloud_quicklink::config::{LoadResult, locate_config, load_or_init};
use cloud_quicklink::http::ReqwestTransport;
use cloud_quicklink::output as out;
use cloud_quicklink::share::nextcloud::NextcloudStore;
use cloud_quicklink::{
    CONFIG_ENV, Config, Credentials, LinkError, ShareResolver, StoredCredential, relative_file_path,
};

use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config and --encrypt before logging init
    if args.print_config {
        return print_config(&args);
    }
    if let (Some(plaintext), Some(iv)) = (&args.encrypt, &args.iv) {
        let sealed = StoredCredential::seal(plaintext, iv)?;
        out::print_user(&sealed.to_token());
        return Ok(());
    }

    let mut cfg = match load_or_init(args.config_file.as_deref())? {
        LoadResult::Loaded(cfg, _) => *cfg,
        LoadResult::CreatedTemplate(path) => {
            out::print_success(&format!(
                "A template cloud_quicklink config was written to: {}",
                path.display()
            ));
            out::print_info("Edit the file to set `url` and the `<users>` entries, then re-run this command.");
            out::print_info(&format!(
                "To use a different location pass --config-file or set {CONFIG_ENV}."
            ));
            return Ok(());
        }
    };
    args.apply_overrides(&mut cfg);

    // Initialize logging and capture the guard so we can drop it on signal
    let guard_opt = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {e}"));
        e
    })?;

    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            out::print_warn("Received interrupt; shutting down...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take(); // flush tracing_appender before exit
            }
            std::process::exit(130);
        })
        .context("install Ctrl-C handler")?;
    }

    info!("App started");
    debug!(?args, "Arguments processed");

    let result = run_link(&args, &cfg);
    if let Err(e) = &result {
        log_failure(e);
    }

    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    result
}

fn print_config(args: &Args) -> Result<()> {
    let location = locate_config(args.config_file.as_deref())?;
    let origin = if args.config_file.is_some() {
        "--config-file"
    } else if location.is_default() {
        "platform default"
    } else {
        CONFIG_ENV
    };
    out::print_info(&format!(
        "cloud_quicklink config path ({origin}):\n  {}\n",
        location.path().display()
    ));
    if location.path().exists() {
        out::print_info("A config file already exists at that location.");
    } else if location.is_default() {
        out::print_info("No config file exists there yet. Run without --print-config to create a template.");
    } else {
        out::print_warn("No config file exists at that location.");
    }
    Ok(())
}

/// Resolve, audit and publish for one file.
fn run_link(args: &Args, cfg: &Config) -> Result<()> {
    cfg.validate()?;

    let file = args.file.as_deref().unwrap_or_default();
    let owner = args.owner.as_deref().unwrap_or_default();
    let password = cfg.owner_password(owner)?;
    let credentials = Credentials::new(cfg.url.as_str(), owner, password)?;

    let transport = ReqwestTransport::new(cfg.accept_invalid_certs, cfg.timeout)
        .context("build HTTP client")?;
    let store = NextcloudStore::new(&credentials, &transport)?;
    let mut resolver = ShareResolver::connect(store, credentials, args.resolver_options())?;

    let path = relative_file_path(cfg.data_root.as_deref(), owner, file);
    resolver.set_file_path(&path)?;
    let resolution = resolver.resolve()?;
    info!(
        path = %path,
        owner,
        url = %resolution.share_url,
        source = ?resolution.source,
        "Share link resolved"
    );

    if let Some(dest) = &cfg.data_log {
        resolver.append_audit_record(dest)?;
    }
    if let Some(endpoint) = cfg.quicklink_endpoint()? {
        resolver.publish_quicklink(&endpoint, &transport)?;
    }

    if resolver.messages().is_empty() {
        out::print_user("No messages logged");
    } else {
        for m in resolver.messages() {
            out::print_user(m);
        }
    }
    Ok(())
}

fn log_failure(e: &anyhow::Error) {
    let Some(le) = e.downcast_ref::<LinkError>() else {
        error!(error = %format!("{e:#}"), "Run failed");
        return;
    };
    let code = le.code();
    let kind = le.kind();
    match le {
        LinkError::ConnectionFailure { url, owner, .. } => {
            error!(code, kind, url = %url, owner = %owner, "Could not connect to the file service")
        }
        LinkError::ResourceNotFound { path, owner, .. } => {
            error!(code, kind, path = %path, owner = %owner, "File not found on the server")
        }
        LinkError::ShareCreationFailed { path, owner, .. } => {
            error!(code, kind, path = %path, owner = %owner, "Public share could not be created")
        }
        LinkError::RemoteApiFailure {
            path,
            owner,
            code: api_code,
            message,
        } => {
            error!(code, kind, path = %path, owner = %owner, api_code = %api_code, message = %message, "Remote API call failed")
        }
        LinkError::AuditWriteFailed { path, .. } => {
            error!(code, kind, path = %path.display(), "Audit row not written")
        }
        _ => error!(code, kind, error = %le, "Run failed"),
    }
}
