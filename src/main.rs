use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use xpdash::auth::SigninClient;
use xpdash::config::{Config, PieChartKind};
use xpdash::error::DashboardError;
use xpdash::graphql::GraphqlClient;
use xpdash::logging::{log, obj, token_fingerprint, v_str, Domain, Level};
use xpdash::model::{build_profile, ProfileBundle};
use xpdash::profile::{load_profile, login, settle_failure};
use xpdash::render::html::render_dashboard;
use xpdash::session::{SessionStore, SqliteSessionStore};

/// Personal learning-platform profile: sign in, fetch your records, render a dashboard.
#[derive(Parser)]
#[command(name = "xpdash", version, about)]
struct Cli {
    /// Platform host; overrides DASHBOARD_DOMAIN.
    #[arg(long, global = true)]
    domain: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with username or email and store the session.
    Login {
        /// Username or email.
        identifier: String,
        /// Password; read from DASHBOARD_PASSWORD when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session.
    Logout,
    /// Show who the stored session belongs to.
    Whoami,
    /// Fetch the profile and write the HTML dashboard.
    Profile {
        #[arg(long)]
        out: Option<String>,
        /// Pie chart: grades or audits.
        #[arg(long)]
        pie: Option<String>,
        /// Print the view model as JSON instead of writing HTML.
        #[arg(long)]
        json: bool,
        /// Also save the raw fetched records for offline rendering.
        #[arg(long)]
        dump: Option<String>,
    },
    /// Render a dashboard from a previously dumped record file.
    Render {
        #[arg(long)]
        input: String,
        #[arg(long)]
        out: Option<String>,
        #[arg(long)]
        pie: Option<String>,
    },
}

fn pie_kind(raw: Option<&str>, cfg: &Config) -> Result<PieChartKind> {
    match raw {
        None => Ok(cfg.pie_chart),
        Some(raw) => match PieChartKind::parse(raw) {
            Some(kind) => Ok(kind),
            None => bail!("unknown pie chart {:?}, expected grades or audits", raw),
        },
    }
}

fn write_page(path: &str, page: &str) -> Result<()> {
    std::fs::write(path, page).with_context(|| format!("writing {}", path))?;
    println!("dashboard written to {}", path);
    Ok(())
}

async fn run_login(cfg: &Config, store: &mut SqliteSessionStore, identifier: &str, password: Option<String>) -> Result<()> {
    let password = match password.or_else(|| std::env::var("DASHBOARD_PASSWORD").ok()) {
        Some(p) if !p.is_empty() => p,
        _ => bail!("password required: pass --password or set DASHBOARD_PASSWORD"),
    };
    let client = SigninClient::new(cfg)?;
    match login(&client, store, identifier, &password).await {
        Ok(session) => {
            match session.identity.user_id() {
                Some(id) => println!("signed in as {} (user {})", identifier, id),
                None => println!("signed in as {}", identifier),
            }
            Ok(())
        }
        Err(err) => bail!(err.user_message()),
    }
}

fn run_whoami(store: &SqliteSessionStore) -> Result<()> {
    let Some(token) = store.token()? else {
        println!("not logged in");
        return Ok(());
    };
    println!("token    {}", token_fingerprint(&token));
    match store.identity()? {
        Some(identity) if identity.is_valid() => {
            if let Some(id) = identity.user_id() {
                println!("user id  {}", id);
            }
            if identity.is_expired(Utc::now().timestamp()) {
                println!("status   expired, log in again");
            } else {
                println!("status   active");
            }
        }
        _ => println!("status   token payload could not be decoded"),
    }
    Ok(())
}

async fn run_profile(
    cfg: &Config,
    store: &mut SqliteSessionStore,
    out: Option<String>,
    pie: PieChartKind,
    json: bool,
    dump: Option<String>,
) -> Result<()> {
    let token = match store.require_token() {
        Ok(token) => token,
        Err(err) => bail!(err.user_message()),
    };
    let source = GraphqlClient::new(cfg, &token)?;
    let (bundle, view) = match load_profile(&source, &*store).await {
        Ok(loaded) => loaded,
        Err(err) => {
            if settle_failure(store, &err)? {
                bail!("{} Please log in again.", err.user_message());
            }
            bail!(err.user_message());
        }
    };

    if let Some(path) = dump {
        let raw = serde_json::to_string_pretty(&bundle)?;
        std::fs::write(&path, raw).with_context(|| format!("writing {}", path))?;
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }
    let path = out.unwrap_or_else(|| cfg.out_path.clone());
    write_page(&path, &render_dashboard(&view, pie))
}

fn run_render(cfg: &Config, input: &str, out: Option<String>, pie: PieChartKind) -> Result<()> {
    let raw = std::fs::read_to_string(input).with_context(|| format!("reading {}", input))?;
    let bundle: ProfileBundle = serde_json::from_str(&raw)
        .map_err(|e| DashboardError::MalformedResponse(format!("{}: {}", input, e)))?;
    let view = build_profile(&bundle);
    let path = out.unwrap_or_else(|| cfg.out_path.clone());
    write_page(&path, &render_dashboard(&view, pie))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = Config::from_env();
    if let Some(domain) = &cli.domain {
        cfg = cfg.with_domain(domain);
    }
    cfg.validate()?;
    log(
        Level::Debug,
        Domain::System,
        "startup",
        obj(&[("domain", v_str(&cfg.domain)), ("session_path", v_str(&cfg.session_path))]),
    );

    match cli.command {
        Command::Login { identifier, password } => {
            let mut store = SqliteSessionStore::open(&cfg.session_path)?;
            run_login(&cfg, &mut store, &identifier, password).await
        }
        Command::Logout => {
            let mut store = SqliteSessionStore::open(&cfg.session_path)?;
            store.clear()?;
            println!("logged out");
            Ok(())
        }
        Command::Whoami => {
            let store = SqliteSessionStore::open(&cfg.session_path)?;
            run_whoami(&store)
        }
        Command::Profile { out, pie, json, dump } => {
            let pie = pie_kind(pie.as_deref(), &cfg)?;
            let mut store = SqliteSessionStore::open(&cfg.session_path)?;
            run_profile(&cfg, &mut store, out, pie, json, dump).await
        }
        Command::Render { input, out, pie } => {
            let pie = pie_kind(pie.as_deref(), &cfg)?;
            run_render(&cfg, &input, out, pie)
        }
    }
}
