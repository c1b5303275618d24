// SPDX-License-Identifier: MIT

use clap::{Parser, Subcommand};
use tracing::error;

use platform_auth::config::AuthConfig;
use platform_auth::login::acquire_context;
use platform_auth::provider::{OAuthTokenProvider, StaticTokenProvider, TokenProvider};
use platform_auth::refresh::RefreshStrategy;
use platform_auth::store::ContextStore;
use platform_auth::token::epoch_secs;

#[derive(Debug, Parser)]
#[command(name = "platform-auth", about = "Maintain a platform session for local tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    config: AuthConfig,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the browser login flow (no-op if the session is still fresh).
    Login,
    /// Show the persisted session context.
    Status,
    /// Print the current access token.
    Token,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is reserved for command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(cli).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config;
    let store = ContextStore::new(&config.config_dir());

    match cli.command {
        Command::Login => {
            let ctx = acquire_context(&config, &store).await?;
            println!("logged in");
            if let Some(user_id) = ctx.user_id() {
                println!("user id: {user_id}");
            }
            if let Some(prefix) = &ctx.host_prefix {
                println!("host prefix: {prefix}");
            }
        }
        Command::Status => match store.read() {
            Some(ctx) => {
                let now = epoch_secs();
                match ctx.expires_at() {
                    Some(expires_at) if expires_at > now => {
                        println!("token: valid for {}s", expires_at - now);
                    }
                    Some(_) => println!("token: expired"),
                    None => println!("token: none"),
                }
                println!("account: {}", fmt_opt(ctx.account_id.as_ref()));
                println!("host prefix: {}", fmt_opt(ctx.host_prefix.as_ref()));
                println!(
                    "dev environment: {}",
                    fmt_opt(ctx.dev_environment.as_ref().map(|e| &e.name))
                );
                println!(
                    "prod environment: {}",
                    fmt_opt(ctx.prod_environment.as_ref().map(|e| &e.name))
                );
            }
            None => println!("no session context; run `platform-auth login`"),
        },
        Command::Token => {
            // A configured static token bypasses OAuth entirely.
            if config.token.is_some() {
                let provider = StaticTokenProvider::new(config.token.clone());
                println!("{}", provider.get_token()?);
                return Ok(());
            }
            let ctx = acquire_context(&config, &store).await?;
            let initial = ctx
                .decoded_access_token
                .ok_or_else(|| anyhow::anyhow!("session context has no access token"))?
                .access_token_response;
            let provider = OAuthTokenProvider::new(
                initial,
                &config.platform_url,
                &config.client_id,
                store,
                RefreshStrategy {
                    buffer_secs: config.refresh_buffer_secs,
                    ..RefreshStrategy::default()
                },
            );
            println!("{}", provider.get_token()?);
        }
    }
    Ok(())
}

fn fmt_opt<T: std::fmt::Display>(v: Option<&T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "unset".to_owned())
}
