//! Creates or refreshes the staff accounts and optionally imports colleges.
//!
//! ```text
//! SEED_PASSWORD=... cargo run --bin seed -- --colleges colleges.json
//! ```

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::WrapErr;

use campus_api::data::colleges::{College, CollegeImport};
use campus_api::data::database::Database;
use campus_api::data::users::{upsert_staff, NewUser};
use campus_api::utils::enums::{Region, Role};

#[derive(Parser, Debug)]
#[command(name = "seed", about = "Seed staff accounts and college cutoffs")]
struct Args {
    /// SQLite file. Defaults to `DATABASE_PATH` or `campus.db`.
    #[arg(long)]
    database: Option<PathBuf>,

    /// JSON array of colleges to import.
    #[arg(long)]
    colleges: Option<PathBuf>,

    /// Skip the staff accounts.
    #[arg(long)]
    no_staff: bool,
}

struct Staff {
    name: &'static str,
    email: &'static str,
    phone: &'static str,
    role: Role,
}

const STAFF: [Staff; 3] = [
    Staff {
        name: "Support User",
        email: "support@campus.local",
        phone: "9000000001",
        role: Role::Support,
    },
    Staff {
        name: "Admin User",
        email: "admin@campus.local",
        phone: "9000000002",
        role: Role::Admin,
    },
    Staff {
        name: "Super Admin",
        email: "superadmin@campus.local",
        phone: "9000000003",
        role: Role::SuperAdmin,
    },
];

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenv::dotenv().ok();
    campus_api::init_tracing();

    let args = Args::parse();
    let path = args
        .database
        .or_else(|| std::env::var_os("DATABASE_PATH").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("campus.db"));
    let db = Database::open(&path).wrap_err_with(|| format!("failed to open {}", path.display()))?;
    let mut conn = db.lock();

    if !args.no_staff {
        let password = std::env::var("SEED_PASSWORD")
            .wrap_err("SEED_PASSWORD must be set to seed staff accounts")?;
        let pepper = std::env::var("HASH_SECRET").ok().filter(|s| !s.is_empty());

        for staff in &STAFF {
            let new = NewUser::new(
                staff.name,
                Some(staff.email),
                Some(&password),
                staff.phone,
                staff.role,
                Region::AndhraPradesh,
                pepper.as_deref(),
            )?;
            let (user, created) = upsert_staff(&conn, new)?;
            if created {
                tracing::info!(email = staff.email, role = %user.role, "Created staff account");
            } else {
                tracing::info!(email = staff.email, role = %user.role, "Updated staff account");
            }
        }
    }

    if let Some(file) = args.colleges {
        let raw = std::fs::read_to_string(&file)
            .wrap_err_with(|| format!("failed to read {}", file.display()))?;
        let colleges: Vec<CollegeImport> =
            serde_json::from_str(&raw).wrap_err("college file must be a JSON array")?;
        let count = College::import(&mut conn, &colleges)?;
        tracing::info!(count, "Imported colleges");
    }

    tracing::info!("Seed completed");
    Ok(())
}
