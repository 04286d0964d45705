//! Fetch command - send one request through the active worker

use super::Host;
use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::net::Request;
use crate::ui;
use crate::worker::FetchOutcome;
use std::io::Write;
use url::Url;

/// Execute the fetch command.
///
/// The response source and status go to stderr; the body goes to stdout or
/// `--output`.
pub async fn execute(args: FetchArgs, config: &Config, ephemeral: bool) -> ShellcacheResult<()> {
    let host = Host::open(config, ephemeral).await?;
    if host.registration.active().is_none() {
        return Err(ShellcacheError::NoActiveWorker);
    }

    let scope = host.registration.scope().clone();
    let url = resolve(&scope, &args.url)?;
    let client_url = match &args.client_url {
        Some(page) => resolve(&scope, page)?,
        None => scope.clone(),
    };

    let mut request = Request::new(args.method, url.clone());
    if let Some(data) = &args.data {
        request = request.with_body(data.as_bytes());
    }

    let client = host.registration.open_client(client_url).await;
    let result = host.registration.dispatch_fetch(Some(client), request).await;
    host.registration.close_client(client).await;
    let outcome = result?;

    eprintln!("{}", ui::fetch_status(&outcome, url.as_str()));
    let response = match outcome {
        FetchOutcome::Unavailable { reason } => {
            host.close().await?;
            return Err(ShellcacheError::User(format!(
                "{} is not cached and the network failed: {}",
                url, reason
            )));
        }
        other => other.into_response(),
    };

    if let Some(response) = response {
        let body = response.bytes()?;
        write_body(&body, &args)?;
    }

    host.close().await
}

fn resolve(scope: &Url, input: &str) -> ShellcacheResult<Url> {
    scope.join(input).map_err(|e| ShellcacheError::InvalidUrl {
        url: input.to_string(),
        reason: e.to_string(),
    })
}

fn write_body(body: &[u8], args: &FetchArgs) -> ShellcacheResult<()> {
    match &args.output {
        Some(path) => std::fs::write(path, body)
            .map_err(|e| ShellcacheError::io(format!("writing {}", path.display()), e)),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(body)
                .and_then(|_| stdout.flush())
                .map_err(|e| ShellcacheError::io("writing response body", e))
        }
    }
}
