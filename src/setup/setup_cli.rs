use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use textile_archive::config::Config;
use textile_archive::models::db_operations::{gallery_db_operations, timeline_db_operations, users_db_operations, DbError};
use textile_archive::setup::{db_setup, seed};

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial archive setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// Creates the archive tables.
    Setup,
    /// Loads timeline events and gallery images from a JSON seed file.
    Seed {
        /// Seed file to load; defaults to SEED_FILE.
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    List,
    ChangePassword {
        #[arg(long)]
        username: String,
        #[arg(long)]
        new_password: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup => setup_database(&config),
            DbAction::Seed { file } => {
                let seed_path = file.clone().or_else(|| config.seed_file.as_ref().map(PathBuf::from));
                match seed_path {
                    Some(path) => seed_database(&config, &path),
                    None => eprintln!("❌ Error: No seed file given. Pass --file or set SEED_FILE."),
                }
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Create { username, password } => create_admin_user(&config, username, password),
            AdminAction::List => list_admin_users(&config),
            AdminAction::ChangePassword { username, new_password } => {
                change_admin_password(&config, username, new_password)
            }
        },
    }
}

fn setup_database(config: &Config) {
    let db_path = config.archive_db_path();
    println!("\nSetting up archive database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        if let Err(e) = fs::create_dir_all(parent_dir) {
            eprintln!("❌ Error: Could not create database directory: {}", e);
            return;
        }
    }

    let mut conn = match Connection::open(&db_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ Error: Could not open archive database file: {}", e);
            return;
        }
    };
    match db_setup::setup_archive_db(&mut conn) {
        Ok(()) => println!("✅ Archive database setup completed successfully."),
        Err(e) => {
            eprintln!("❌ Error setting up archive database: {}", e);
            return;
        }
    }
    print_record_counts(&conn);
}

fn print_record_counts(conn: &Connection) {
    let counts = (
        timeline_db_operations::count_events(conn),
        gallery_db_operations::count_images(conn),
        users_db_operations::count_users(conn),
    );
    match counts {
        (Ok(events), Ok(images), Ok(users)) => {
            println!("ℹ️ Archive holds {} timeline events, {} gallery images and {} users.", events, images, users)
        }
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => eprintln!("❌ Error counting records: {}", e),
    }
}

/// Opens the archive database, refusing to create it implicitly.
fn open_existing(config: &Config) -> Option<Connection> {
    let db_path = config.archive_db_path();
    if !db_path.exists() {
        eprintln!(
            "❌ Error: Archive database not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        );
        return None;
    }
    match Connection::open(&db_path) {
        Ok(c) => Some(c),
        Err(e) => {
            eprintln!("❌ Error: Could not open archive database: {}", e);
            None
        }
    }
}

fn seed_database(config: &Config, path: &Path) {
    let Some(mut conn) = open_existing(config) else { return };
    match seed::load_seed_file(path).and_then(|data| seed::seed_database(&mut conn, &data)) {
        Ok(report) => {
            println!(
                "✅ Seeded '{}': {} events inserted ({} already present), {} images inserted ({} already present).",
                path.display(),
                report.events_inserted,
                report.events_skipped,
                report.images_inserted,
                report.images_skipped
            );
            print_record_counts(&conn);
        }
        Err(e) => eprintln!("❌ Error seeding from '{}' (nothing was written): {}", path.display(), e),
    }
}

fn create_admin_user(config: &Config, username: &str, password: &str) {
    let Some(conn) = open_existing(config) else { return };
    match users_db_operations::create_user(&conn, username, password) {
        Ok(_) => println!("✅ Admin user '{}' created successfully.", username),
        Err(e) if e.is_constraint_violation() => {
            eprintln!("❌ Error: User '{}' already exists or the name is invalid.", username)
        }
        Err(e) => eprintln!("❌ Error creating admin user: {}", e),
    }
}

fn list_admin_users(config: &Config) {
    let Some(conn) = open_existing(config) else { return };
    match users_db_operations::read_all_users(&conn) {
        Ok(users) => {
            println!("Listing Admin Users:");
            for user in users {
                let last_login = user.last_login_time.as_deref().unwrap_or("never");
                println!("- {} (last login: {})", user.username, last_login);
            }
        }
        Err(e) => eprintln!("❌ Error fetching admins: {}", e),
    }
}

fn change_admin_password(config: &Config, username: &str, new_password: &str) {
    if new_password.is_empty() {
        eprintln!("❌ Error: The new password must not be empty.");
        return;
    }
    let Some(conn) = open_existing(config) else { return };
    let user = match users_db_operations::read_user_by_username(&conn, username) {
        Ok(Some(user)) => user,
        Ok(None) => {
            eprintln!("❌ Error: No admin user named '{}' found.", username);
            return;
        }
        Err(e) => {
            eprintln!("❌ Error looking up '{}': {}", username, e);
            return;
        }
    };
    match users_db_operations::update_user(&conn, user.id, &user.username, Some(new_password)) {
        Ok(()) => println!("✅ Password for admin user '{}' changed successfully.", username),
        Err(DbError::NotFound(_)) => eprintln!("❌ Error: No admin user named '{}' found.", username),
        Err(e) => eprintln!("❌ Error updating password: {}", e),
    }
}
