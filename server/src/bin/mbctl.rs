//! Operator CLI for the Murmur bridge.
//!
//! Each subcommand exits 0 on success and 1 on failure, printing a short
//! human-readable summary. Intended for cron jobs and shell operators; the
//! HTTP API carries the same operations for machines.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::distributions::Alphanumeric;
use rand::Rng;

use mb_server::auth::{AuthService, AuthStore, PgAuthStore};
use mb_server::config::Config;
use mb_server::db::{self, PgAccountStore};
use mb_server::gateway::{HttpTransport, MurmurControl, MurmurGateway};
use mb_server::identity::{resolve, IdentityProvider, PgIdentityProvider};
use mb_server::permissions::ChannelPermissions;
use mb_server::sync::{SyncEngine, SyncMode, SyncOutcome};

#[derive(Parser)]
#[command(name = "mbctl", version, about = "Murmur bridge control tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify the control endpoint handshake and server liveness
    TestConnection,
    /// Check the environment configuration without touching anything
    ValidateConfig,
    /// Voice registrations
    Users(UsersArgs),
    /// Voice channels
    Channels(ChannelsArgs),
    /// Admin allow-list
    Allowlist(AllowlistArgs),
    /// Personal passwords
    Password(PasswordArgs),
    /// Run a permission synchronization pass
    Sync {
        /// Resolve and report without writing to the voice server
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the permission resolution for one identity
    Show {
        /// Host account id
        #[arg(long)]
        user: i64,
    },
}

#[derive(Args)]
struct UsersArgs {
    #[command(subcommand)]
    command: UsersCommand,
}

#[derive(Subcommand)]
enum UsersCommand {
    /// List registered voice users
    List,
    /// List account links recorded in the bridge database
    Links,
    /// Register the linked identity of a host account
    Create {
        /// Host account id
        #[arg(long)]
        user: i64,
        /// Registration password; generated when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Set or clear the nickname override for a host account
    Nickname {
        /// Host account id
        #[arg(long)]
        user: i64,
        /// New nickname; omit to clear the override
        nickname: Option<String>,
    },
    /// Remove the account link and its remote registration
    Unlink {
        /// Host account id
        #[arg(long)]
        user: i64,
    },
}

#[derive(Args)]
struct ChannelsArgs {
    #[command(subcommand)]
    command: ChannelsCommand,
}

#[derive(Subcommand)]
enum ChannelsCommand {
    /// List channels
    List,
    /// Create a channel
    Create {
        name: String,
        /// Parent channel id
        #[arg(long, default_value_t = 0)]
        parent: i32,
    },
}

#[derive(Args)]
struct AllowlistArgs {
    #[command(subcommand)]
    command: AllowlistCommand,
}

#[derive(Subcommand)]
enum AllowlistCommand {
    List,
    Add { entry: String },
    Remove { entry: String },
}

#[derive(Args)]
struct PasswordArgs {
    #[command(subcommand)]
    command: PasswordCommand,
}

#[derive(Subcommand)]
enum PasswordCommand {
    /// Set a personal password for a voice username
    Set { username: String, password: String },
    /// Remove a personal password
    Remove { username: String },
    /// List personal password records
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::ValidateConfig => {
            let config = Config::from_env()?;
            println!(
                "configuration ok: control endpoint {}:{}, virtual server {}",
                config.ice_host, config.ice_port, config.server_id
            );
            Ok(())
        }
        Command::TestConnection => {
            let config = Config::from_env()?;
            let gateway = build_gateway(&config)?;
            gateway.connect().await?;
            let summary = gateway.server_summary().await?;
            println!(
                "connected: server {} '{}' ({} online, {} channels, version {})",
                summary.id, summary.name, summary.users_online, summary.channel_count,
                summary.version
            );
            Ok(())
        }
        Command::Users(args) => users(args.command).await,
        Command::Channels(args) => channels(args.command).await,
        Command::Allowlist(args) => allowlist(args.command).await,
        Command::Password(args) => password(args.command).await,
        Command::Sync { dry_run } => sync(dry_run).await,
        Command::Show { user } => show(user).await,
    }
}

fn build_gateway(config: &Config) -> Result<Arc<dyn MurmurControl>> {
    let timeout = Duration::from_secs(config.ice_timeout_secs);
    let transport = HttpTransport::new(
        &config.ice_host,
        config.ice_port,
        config.ice_secret.clone(),
        timeout,
    )?;
    Ok(Arc::new(MurmurGateway::new(
        transport,
        config.server_id,
        timeout,
    )))
}

async fn connected_gateway(config: &Config) -> Result<Arc<dyn MurmurControl>> {
    let gateway = build_gateway(config)?;
    gateway
        .connect()
        .await
        .context("could not reach the control endpoint")?;
    Ok(gateway)
}

async fn users(command: UsersCommand) -> Result<()> {
    let config = Config::from_env()?;
    match command {
        UsersCommand::List => {
            let gateway = connected_gateway(&config).await?;
            let users = gateway.online_users().await?;
            println!("{} online", users.len());
            for user in users {
                println!(
                    "  {:>6}  {} (channel {}, registered id {})",
                    user.session, user.name, user.channel, user.user_id
                );
            }
            Ok(())
        }
        UsersCommand::Create { user, password } => {
            if !config.allow_registration {
                bail!("registration is disabled (ALLOW_REGISTRATION)");
            }
            let pool = db::create_pool(&config.database_url).await?;
            let provider = PgIdentityProvider::new(pool.clone());
            let Some(linked) = provider.find_by_id(user).await? else {
                bail!("account {user} has no linked voice registration");
            };

            let password = password.unwrap_or_else(generate_password);
            let gateway = connected_gateway(&config).await?;
            let name = linked.identity.display_name();
            let remote_id = gateway.create_user(name, &password, "").await?;

            db::upsert_account(&pool, user, name).await?;
            db::set_remote_id(&pool, user, remote_id).await?;
            println!("registered '{name}' with id {remote_id}");
            Ok(())
        }
        UsersCommand::Links => {
            let pool = db::create_pool(&config.database_url).await?;
            let accounts = db::list_accounts(&pool).await?;
            println!("{} linked accounts", accounts.len());
            for account in accounts {
                let remote = account
                    .murmur_user_id
                    .map_or_else(|| "-".to_string(), |id| id.to_string());
                println!(
                    "  {:>6}  {}  remote id {remote}  nickname {}",
                    account.user_id,
                    account.murmur_username,
                    account.nickname.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
        UsersCommand::Nickname { user, nickname } => {
            let pool = db::create_pool(&config.database_url).await?;
            if db::find_account_by_user_id(&pool, user).await?.is_none() {
                bail!("account {user} has no linked voice registration");
            }
            db::set_nickname(&pool, user, nickname.as_deref()).await?;
            match nickname {
                Some(nickname) => println!("nickname for account {user} set to '{nickname}'"),
                None => println!("nickname override for account {user} cleared"),
            }
            println!("run a sync pass to push the new display name");
            Ok(())
        }
        UsersCommand::Unlink { user } => {
            let pool = db::create_pool(&config.database_url).await?;
            let Some(account) = db::find_account_by_user_id(&pool, user).await? else {
                bail!("account {user} has no linked voice registration");
            };

            if let Some(remote_id) = account.murmur_user_id {
                let gateway = connected_gateway(&config).await?;
                gateway.delete_user(remote_id).await?;
            }
            db::delete_account(&pool, user).await?;
            println!("unlinked '{}' from account {user}", account.murmur_username);
            Ok(())
        }
    }
}

async fn channels(command: ChannelsCommand) -> Result<()> {
    let config = Config::from_env()?;
    let gateway = connected_gateway(&config).await?;
    match command {
        ChannelsCommand::List => {
            let channels = gateway.channels().await?;
            println!("{} channels", channels.len());
            for channel in channels {
                println!("  {:>6}  {} (parent {})", channel.id, channel.name, channel.parent);
            }
        }
        ChannelsCommand::Create { name, parent } => {
            let id = gateway.create_channel(&name, parent).await?;
            println!("created channel '{name}' with id {id}");
        }
    }
    Ok(())
}

async fn allowlist(command: AllowlistCommand) -> Result<()> {
    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    let mut allowlist = db::load_allowlist(&pool, &config.admin_users).await?;

    match command {
        AllowlistCommand::List => {
            println!("{} entries", allowlist.len());
            for entry in allowlist.entries() {
                println!("  {entry}");
            }
        }
        AllowlistCommand::Add { entry } => {
            if !allowlist.add(&entry) {
                bail!("'{}' is already on the allow-list", entry.trim());
            }
            db::save_allowlist(&pool, &allowlist).await?;
            println!("added '{}'", entry.trim());
        }
        AllowlistCommand::Remove { entry } => {
            if !allowlist.remove(&entry) {
                bail!("'{}' is not on the allow-list", entry.trim());
            }
            db::save_allowlist(&pool, &allowlist).await?;
            println!("removed '{}'", entry.trim());
        }
    }
    Ok(())
}

async fn password(command: PasswordCommand) -> Result<()> {
    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    let store = Arc::new(PgAuthStore::new(pool));
    let gateway = build_gateway(&config)?;
    let auth = AuthService::new(
        store,
        gateway,
        config.enable_custom_auth,
        config.server_password.clone(),
    );

    match command {
        PasswordCommand::Set { username, password } => {
            auth.set_password(&username, &password).await?;
            println!("personal password set for '{username}'");
        }
        PasswordCommand::Remove { username } => {
            if !auth.remove_password(&username).await? {
                bail!("no personal password for '{username}'");
            }
            println!("personal password removed for '{username}'");
        }
        PasswordCommand::List => {
            let records = auth.list_records().await?;
            println!("{} records", records.len());
            for record in records {
                let last = record
                    .last_login_at
                    .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
                println!(
                    "  {}  status={:?}  last_login={last}",
                    record.murmur_username, record.status
                );
            }
        }
    }
    Ok(())
}

async fn sync(dry_run: bool) -> Result<()> {
    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    let gateway = connected_gateway(&config).await?;

    let provider = Arc::new(PgIdentityProvider::new(pool.clone()));
    let accounts = Arc::new(PgAccountStore::new(pool.clone()));
    let engine = SyncEngine::new(gateway, provider, accounts, config.auto_create_channels);

    let allowlist = db::load_allowlist(&pool, &config.admin_users).await?;
    let mode = if dry_run { SyncMode::DryRun } else { SyncMode::Apply };
    let report = engine.sync_all(&allowlist, mode).await?;

    for result in &report.results {
        let status = match &result.outcome {
            SyncOutcome::Updated => "updated".to_string(),
            SyncOutcome::Planned => "planned".to_string(),
            SyncOutcome::Failed(message) => format!("FAILED: {message}"),
        };
        println!(
            "  {:>6}  {}  {} @ channel {}  {status}",
            result.user_id, result.name, result.role, result.channel_id
        );
    }
    println!(
        "sync finished: {} updated, {} planned, {} errors",
        report.updated, report.planned, report.errors
    );
    if report.errors > 0 {
        bail!("{} identities failed to sync", report.errors);
    }
    Ok(())
}

async fn show(user: i64) -> Result<()> {
    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    let provider = PgIdentityProvider::new(pool.clone());

    let Some(linked) = provider.find_by_id(user).await? else {
        bail!("account {user} has no linked voice registration");
    };
    let allowlist = db::load_allowlist(&pool, &config.admin_users).await?;
    let identity = &linked.identity;
    let resolution = resolve(identity, &allowlist);

    println!("account {} '{}'", identity.id, identity.name);
    println!("  display name: {}", identity.display_name());
    println!("  superuser: {}", identity.superuser);
    println!("  allow-listed: {}", allowlist.matches(identity));
    if let Some(main) = &identity.main_character {
        println!(
            "  main character: {} (corporation {})",
            main.character_name,
            main.corporation_name.as_deref().unwrap_or("?")
        );
        if !main.titles.is_empty() {
            println!("  titles: {}", main.titles.join(", "));
        }
    } else {
        println!("  main character: none");
    }
    if !identity.roles.is_empty() {
        println!("  platform roles: {}", identity.roles.join(", "));
    }
    let auth_store = PgAuthStore::new(pool.clone());
    match auth_store.find_by_user_id(user).await? {
        Some(record) => println!("  personal password: {:?}", record.status),
        None => println!("  personal password: none"),
    }
    println!("  resolved role: {} ({:?} scope)", resolution.role, resolution.scope);
    println!("  granted bits:");
    for (bit, name) in ChannelPermissions::named_bits() {
        if resolution.bundle.allow.has(*bit) {
            println!("    {name}");
        }
    }
    Ok(())
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}
