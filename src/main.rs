use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use color_eyre::eyre::WrapErr;

use campus_api::config::Config;
use campus_api::data::database::Database;
use campus_api::utils::routes;

#[actix_web::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenv::dotenv().ok();
    campus_api::init_tracing();

    let config = Config::from_env().wrap_err("invalid configuration")?;
    let db = Database::open(&config.database_path)
        .wrap_err_with(|| format!("failed to open database at {}", config.database_path))?;
    std::fs::create_dir_all(&config.upload_dir)
        .wrap_err_with(|| format!("failed to create {}", config.upload_dir.display()))?;

    let bind = config.bind_address();
    tracing::info!(host = %bind.0, port = bind.1, database = %config.database_path, "Server starting");

    let db = web::Data::new(db);
    let config = web::Data::new(config);
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(db.clone())
            .app_data(config.clone())
            .configure(routes::configure)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
