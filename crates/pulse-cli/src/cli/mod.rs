//! CLI entry and dispatch.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use pulse_core::calendar::Month;
use pulse_core::config::Config;
use pulse_core::logging;
use pulse_core::models::{EventLocation, EventType, ParticipantRole, ParticipationStatus};

mod commands;

#[derive(Parser)]
#[command(name = "pulse")]
#[command(version)]
#[command(about = "KemSU Pulse: university events in your terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long, env = "PULSE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account (does not sign in)
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "PULSE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,

    /// Browse and manage events
    Events {
        #[command(subcommand)]
        command: EventCommands,
    },
    /// Calendar export
    Calendar {
        #[command(subcommand)]
        command: CalendarCommands,
    },
    /// Your notifications
    Notifications {
        #[command(subcommand)]
        command: NotificationCommands,
    },
    /// Events you registered for
    Participations {
        #[command(subcommand)]
        command: ParticipationCommands,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Filters shared by `events list` and `calendar export`.
#[derive(clap::Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Earliest start date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    from: Option<NaiveDate>,
    /// Latest start date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    to: Option<NaiveDate>,
    /// participant, volunteer or organizer
    #[arg(long)]
    role: Option<ParticipantRole>,
    /// central, east, kpitip, law or other
    #[arg(long)]
    location: Option<EventLocation>,
    /// social, cultural, sports, educational or other
    #[arg(long = "type", value_name = "TYPE")]
    event_type: Option<EventType>,
    /// Free-text search
    #[arg(long, short)]
    search: Option<String>,
}

#[derive(clap::Subcommand)]
enum EventCommands {
    /// List events
    List {
        #[command(flatten)]
        filters: FilterArgs,
        /// List archived events instead of active ones
        #[arg(long)]
        archived: bool,
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one event
    Show {
        #[arg(value_name = "EVENT_ID")]
        id: i64,
    },
    /// Move an event to the archive (admin)
    Archive {
        #[arg(value_name = "EVENT_ID")]
        id: i64,
    },
    /// Restore an archived event (admin)
    Restore {
        #[arg(value_name = "EVENT_ID")]
        id: i64,
    },
    /// Permanently delete an archived event (admin)
    Delete {
        #[arg(value_name = "EVENT_ID")]
        id: i64,
    },
    /// Register for an event
    Participate {
        #[arg(value_name = "EVENT_ID")]
        id: i64,
    },
    /// Cancel your registration
    Leave {
        #[arg(value_name = "EVENT_ID")]
        id: i64,
    },
}

#[derive(clap::Subcommand)]
enum CalendarCommands {
    /// Write a month of events to an .ics file
    Export {
        /// Month to export (YYYY-MM, default: current month on campus)
        #[arg(long)]
        month: Option<Month>,
        /// Output file (default: events-YYYY-MM.ics in the current directory)
        #[arg(long, short)]
        output: Option<std::path::PathBuf>,
        #[command(flatten)]
        filters: FilterArgs,
    },
}

#[derive(clap::Subcommand)]
enum NotificationCommands {
    /// List notifications, newest first
    List {
        /// Only unread ones
        #[arg(long)]
        unread: bool,
    },
    /// Mark one or all notifications as read
    Read {
        #[arg(value_name = "NOTIFICATION_ID", required_unless_present = "all")]
        id: Option<i64>,
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
}

#[derive(clap::Subcommand)]
enum ParticipationCommands {
    /// List your participations
    List {
        /// upcoming, past or all
        #[arg(long, default_value = "all")]
        status: ParticipationStatus,
    },
    /// Show participation totals
    Count,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Print a fresh config built from the defaults
    Generate,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    // Config commands must work even when the file is broken.
    if let Some(Commands::Config { command }) = &cli.command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
        };
    }

    let config = Config::load().context("load config")?;
    let _log_guard = match logging::init(&config.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {e:#}");
            None
        }
    };

    let Some(command) = cli.command else {
        return commands::interactive::run(&config).await;
    };

    let client = commands::Client::open(&config)?;
    let result = match command {
        Commands::Login { email, password } => {
            commands::auth::login(&client, email, password).await
        }
        Commands::Register {
            username,
            email,
            password,
        } => commands::auth::register(&client, username, email, password).await,
        Commands::Logout => {
            commands::auth::logout(&client);
            Ok(())
        }
        Commands::Whoami => commands::auth::whoami(&client).await,

        Commands::Events { command } => match command {
            EventCommands::List {
                filters,
                archived,
                json,
            } => commands::events::list(&client, &config, &filters.into(), archived, json).await,
            EventCommands::Show { id } => commands::events::show(&client, &config, id).await,
            EventCommands::Archive { id } => commands::events::archive(&client, id).await,
            EventCommands::Restore { id } => commands::events::restore(&client, id).await,
            EventCommands::Delete { id } => commands::events::delete(&client, id).await,
            EventCommands::Participate { id } => commands::events::participate(&client, id).await,
            EventCommands::Leave { id } => commands::events::leave(&client, id).await,
        },

        Commands::Calendar { command } => match command {
            CalendarCommands::Export {
                month,
                output,
                filters,
            } => commands::calendar::export(&client, &config, month, output, &filters.into()).await,
        },

        Commands::Notifications { command } => match command {
            NotificationCommands::List { unread } => {
                commands::notifications::list(&client, &config, unread).await
            }
            NotificationCommands::Read { id, all } => {
                commands::notifications::read(&client, id.filter(|_| !all)).await
            }
        },

        Commands::Participations { command } => match command {
            ParticipationCommands::List { status } => {
                commands::participations::list(&client, &config, status).await
            }
            ParticipationCommands::Count => commands::participations::count(&client).await,
        },

        Commands::Config { .. } => Ok(()),
    };
    client.flush_toasts();
    result
}

impl From<FilterArgs> for commands::EventsSelection {
    fn from(args: FilterArgs) -> Self {
        commands::EventsSelection {
            filters: pulse_core::models::EventFilters {
                start_date: args.from,
                end_date: args.to,
                role: args.role,
                location: args.location,
                event_type: args.event_type,
            },
            search: args.search.unwrap_or_default(),
        }
    }
}
