use actix_cors::Cors;
use actix_web::{cookie::Key, http::header, middleware::Logger, web, App, HttpServer};
use clap::Parser;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::convert::TryFrom;
use std::fs;
use std::path::{Path, PathBuf};
use tera::Tera;
use textile_archive::{
    config::Config,
    models::db_operations::users_db_operations,
    routes,
    setup::{db_setup, seed},
    AppState,
};

#[derive(Parser, Debug)]
#[command(name = "archive_server", author, version, about = "Starts the textile archive web server.")]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

fn build_cors(allowed_origins: &str) -> Cors {
    let cors = if allowed_origins.trim() == "*" {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .supports_credentials()
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    let tera = Tera::new("templates/**/*.html").expect("FATAL: Tera initialization failed.");

    let db_path = config.archive_db_path();
    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir)?;
    }
    fs::create_dir_all(&config.media_path)?;

    let manager = SqliteConnectionManager::file(&db_path);
    let pool = Pool::builder()
        .build(manager)
        .expect("FATAL: Failed to create Rusqlite connection pool.");

    {
        let mut conn = pool.get().expect("FATAL: Failed to get DB connection for initial setup.");
        db_setup::setup_archive_db(&mut conn).expect("FATAL: Failed to create the archive schema.");

        match &config.admin_password {
            Some(password) => match db_setup::ensure_admin_user(&conn, password) {
                Ok(true) => log::info!("Default admin user created."),
                Ok(false) => log::debug!("Default admin user already present."),
                Err(e) => log::error!("Could not create the default admin user: {}", e),
            },
            None => log::debug!("ADMIN_PASSWORD not set; skipping default admin user."),
        }

        if let Some(seed_file) = &config.seed_file {
            seed::seed_from_file(&mut conn, Path::new(seed_file));
        }
    }

    if !users_db_operations::prepare_dummy_hash() {
        log::warn!("Unknown-user logins will answer faster than wrong-password ones.");
    }

    let session_key_bytes = hex::decode(&config.session_secret_key)
        .expect("FATAL: SESSION_SECRET_KEY in .env is not a valid hex string.");
    let session_key = Key::try_from(session_key_bytes.as_slice())
        .expect("FATAL: The decoded SESSION_SECRET_KEY is not long enough (minimum 64 bytes required).");

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    log::info!("Server starting at http://{}", server_address);

    let allowed_origins = config.allowed_origins.clone();
    let media_path = config.media_path.clone();
    let secure_cookies = config.use_secure_cookies;
    let app_state = web::Data::new(AppState { pool, tera, config });

    HttpServer::new(move || {
        let session_key = session_key.clone();
        let media_path = media_path.clone();

        App::new()
            .wrap(build_cors(&allowed_origins))
            .wrap(Logger::default())
            .wrap(routes::security_headers())
            .app_data(app_state.clone())
            .configure(move |cfg| routes::config_app(cfg, &media_path, session_key, secure_cookies))
    })
    .bind(server_address)?
    .run()
    .await
}
