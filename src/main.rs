//! `mihf` command-line shell.
//!
//! A thin front end over the library: every subcommand bootstraps the
//! persisted session, drives one view-model and prints plain lines.
//!
//! ```text
//! mihf login 79101234567 secret1
//! mihf players --search Ivanov --pages 2
//! mihf game 42
//! mihf referee-games
//! mihf confirm 42
//! ```

#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::Instrument;

use mihf::api::{ClubsFilter, PlayersFilter};
use mihf::app::{game_timeline, LoginForm, PageSource, PaginatedList, PasswordStrength};
use mihf::domain::models::GameRow;
use mihf::session::Route;
use mihf::{initialize, observability, App, Config};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "mihf")]
#[command(about = "Hockey federation client", version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "MIHF_CONFIG")]
    config: Option<PathBuf>,

    /// Backend root URL (overrides config file)
    #[arg(long, env = "MIHF_BASE_URL")]
    base_url: Option<String>,

    /// Data directory (overrides config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (overrides config file)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Copy)]
struct Pages {
    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pages: u32,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with phone number and password
    Login { phone: String, password: String },
    /// Sign out and forget the stored token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List players
    Players {
        #[arg(long, default_value = "")]
        search: String,
        #[command(flatten)]
        pages: Pages,
    },
    /// List clubs
    Clubs {
        #[arg(long, default_value = "")]
        search: String,
        /// Only Moscow clubs
        #[arg(long)]
        moscow: bool,
        #[command(flatten)]
        pages: Pages,
    },
    /// List teams
    Teams {
        #[command(flatten)]
        pages: Pages,
    },
    /// List tournaments
    Tournaments {
        #[command(flatten)]
        pages: Pages,
    },
    /// List the game schedule
    Games {
        #[command(flatten)]
        pages: Pages,
    },
    /// Show one game with its timeline
    Game { id: i64 },
    /// List games assigned to the signed-in referee
    RefereeGames {
        #[command(flatten)]
        pages: Pages,
    },
    /// Confirm a referee assignment
    Confirm { id: i64 },
    /// Withdraw a referee assignment confirmation
    Unconfirm { id: i64 },
    /// List documents
    Documents {
        #[command(flatten)]
        pages: Pages,
    },
    /// List seasons
    Seasons,
    /// Change the account e-mail
    Email { address: String },
    /// Change the password (signs out on success)
    Password { old: String, new: String },
}

fn load_config(cli: &Cli) -> mihf::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir.clone_from(data_dir);
    }
    if let Some(level) = &cli.log_level {
        config.log_level.clone_from(level);
    }
    Ok(config)
}

/// Loads `pages` pages (stopping early when exhausted) and prints each row.
async fn print_list<S: PageSource>(
    list: &PaginatedList<S>,
    pages: Pages,
    line: impl Fn(&S::Item) -> String,
) -> CliResult {
    list.reload().await;
    for _ in 1..pages.pages {
        if !list.load_next().await {
            break;
        }
    }

    let snapshot = list.snapshot();
    if let Some(err) = snapshot.last_error {
        return Err(err.into());
    }
    for item in &snapshot.items {
        println!("{}", line(item));
    }
    if let Some(total) = snapshot.total {
        println!("-- {} of {total}", snapshot.items.len());
    }
    Ok(())
}

fn game_line(game: &GameRow) -> String {
    let score = game
        .score
        .map(|s| {
            format!(
                "{}:{}",
                s.team1.map_or_else(|| "-".to_string(), |n| n.to_string()),
                s.team2.map_or_else(|| "-".to_string(), |n| n.to_string())
            )
        })
        .unwrap_or_else(|| "-:-".to_string());
    format!(
        "{:>6}  {}  {} {score} {}",
        game.id, game.date_start, game.team1.name, game.team2.name
    )
}

fn require_session(app: &App) -> CliResult {
    if app.session().route() == Route::Home {
        Ok(())
    } else {
        Err("not signed in, run `mihf login <phone> <password>` first".into())
    }
}

async fn run(app: &App, command: Command) -> CliResult {
    app.session().bootstrap().await?;

    match command {
        Command::Login { phone, password } => {
            let outcome = app.auth().login(&LoginForm::new(phone, password)).await?;
            let user = app.session().current_user();
            println!(
                "Signed in as {}",
                user.map(|u| u.full_name()).unwrap_or_default()
            );
            if !outcome.token_persisted {
                eprintln!("warning: the token could not be saved, sign in again next time");
            }
        }
        Command::Logout => {
            app.session().logout().await?;
            println!("Signed out");
        }
        Command::Whoami => {
            require_session(app)?;
            if let Some(user) = app.session().current_user() {
                println!("{} ({})", user.full_name(), user.phone);
                if let Some(email) = &user.email {
                    println!("e-mail: {email}");
                }
                if let Some(born) = user.date_of_birth {
                    println!("born:   {born}");
                }
                let roles: Vec<&str> = user.roles.iter().map(|r| r.name.as_str()).collect();
                println!("roles:  {}", roles.join(", "));
            }
        }
        Command::Players { search, pages } => {
            require_session(app)?;
            let list = app.players().with_filter(PlayersFilter { search });
            print_list(&list, pages, |p| format!("{:>6}  {}", p.id, p.full_name())).await?;
        }
        Command::Clubs {
            search,
            moscow,
            pages,
        } => {
            require_session(app)?;
            let list = app.clubs().with_filter(ClubsFilter {
                search,
                moscow_only: moscow,
            });
            print_list(&list, pages, |c| format!("{:>6}  {}", c.id, c.short_name)).await?;
        }
        Command::Teams { pages } => {
            require_session(app)?;
            print_list(&app.teams(), pages, |t| format!("{:>6}  {}", t.id, t.short_name)).await?;
        }
        Command::Tournaments { pages } => {
            require_session(app)?;
            print_list(&app.tournaments(), pages, |t| {
                format!("{:>6}  {} ({}, {})", t.id, t.full_name, t.season, t.year_of_birth)
            })
            .await?;
        }
        Command::Games { pages } => {
            require_session(app)?;
            print_list(&app.games(), pages, game_line).await?;
        }
        Command::Game { id } => {
            require_session(app)?;
            let loader = app.game(id);
            loader.load().await;
            let state = loader.state();
            if let Some(err) = state.error {
                return Err(err.into());
            }
            if let Some(game) = state.value {
                println!("{} vs {}  {}", game.team1.name, game.team2.name, game.date_start);
                for event in game_timeline(&game) {
                    println!(
                        "{:>3}:{:02}  {:<20} {}",
                        event.minute.unwrap_or(0),
                        event.second.unwrap_or(0),
                        event.kind,
                        event.team.name
                    );
                }
            }
        }
        Command::RefereeGames { pages } => {
            require_session(app)?;
            let desk = app.referee_desk();
            if !desk.is_available() {
                return Err("the signed-in user is not a referee".into());
            }
            print_list(desk.games(), pages, game_line).await?;
        }
        Command::Confirm { id } => set_confirmation(app, id, true).await?,
        Command::Unconfirm { id } => set_confirmation(app, id, false).await?,
        Command::Documents { pages } => {
            require_session(app)?;
            let desk = app.documents_desk();
            print_list(desk.documents(), pages, |d| {
                format!(
                    "{:>6}  {}  {}",
                    d.id,
                    d.name.as_deref().unwrap_or("(untitled)"),
                    d.url
                )
            })
            .await?;
        }
        Command::Seasons => {
            require_session(app)?;
            let seasons = app.seasons();
            seasons.load().await;
            if let Some(err) = seasons.error() {
                return Err(err.into());
            }
            for season in seasons.value().unwrap_or_default() {
                println!("{:>6}  {}", season.id, season.name);
            }
        }
        Command::Email { address } => {
            require_session(app)?;
            let user = app.profile().update_email(&address).await?;
            println!("e-mail set to {}", user.email.unwrap_or_default());
        }
        Command::Password { old, new } => {
            require_session(app)?;
            println!("strength: {}", PasswordStrength::evaluate(&new));
            app.profile().change_password(&old, &new, &new).await?;
            println!("Password changed, signed out");
        }
    }
    Ok(())
}

async fn set_confirmation(app: &App, id: i64, confirm: bool) -> CliResult {
    require_session(app)?;
    let desk = app.referee_desk();
    let done = if confirm {
        desk.confirm(id).await
    } else {
        desk.unconfirm(id).await
    };
    if !done {
        let alert = desk
            .take_alert()
            .unwrap_or_else(|| "not signed in".to_string());
        return Err(alert.into());
    }
    println!("game {id}: {}", if confirm { "confirmed" } else { "unconfirmed" });
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    observability::init_tracing(&config);

    let app = match initialize(&config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "initialization failed");
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let span = tracing::debug_span!("cli");
    let outcome = run(&app, cli.command).instrument(span).await;

    app.shutdown().await;

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
