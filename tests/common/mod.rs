#![allow(dead_code)]

use std::path::PathBuf;

use actix_web::web;

use campus_api::config::Config;
use campus_api::data::database::Database;
use campus_api::data::students::Student;
use campus_api::data::users::{NewUser, User};
use campus_api::utils::auth::sign_token;
use campus_api::utils::enums::{Qualification, Region, Role};

pub const PASSWORD: &str = "secret123";
pub const WEBHOOK_SECRET: &str = "whsec-test";

/// Builds the full application around a [`TestContext`].
macro_rules! app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($ctx.db.clone())
                .app_data($ctx.config.clone())
                .configure(campus_api::utils::routes::configure),
        )
        .await
    };
}

pub struct TestContext {
    pub db: web::Data<Database>,
    pub config: web::Data<Config>,
    pub uploads: tempfile::TempDir,
}

impl TestContext {
    pub fn new() -> TestContext {
        let uploads = tempfile::tempdir().expect("temp dir");
        let config = Config {
            host: "127.0.0.1".into(),
            port: 0,
            database_path: ":memory:".into(),
            jwt_secret: "integration-secret".into(),
            jwt_expire_days: 1,
            hash_secret: None,
            webhook_secret: Some(WEBHOOK_SECRET.into()),
            upload_dir: PathBuf::from(uploads.path()),
            public_base_url: "http://localhost:5000".into(),
        };
        TestContext {
            db: web::Data::new(Database::open_in_memory().expect("in-memory database")),
            config: web::Data::new(config),
            uploads,
        }
    }

    /// Inserts an account directly and returns it with a bearer token.
    pub fn account(&self, name: &str, phone: &str, email: Option<&str>, role: Role) -> (User, String) {
        self.account_in(name, phone, email, role, Region::AndhraPradesh)
    }

    pub fn account_in(
        &self,
        name: &str,
        phone: &str,
        email: Option<&str>,
        role: Role,
        state: Region,
    ) -> (User, String) {
        let conn = self.db.lock();
        let user = NewUser::new(name, email, Some(PASSWORD), phone, role, state, None)
            .unwrap()
            .dump(&conn)
            .unwrap();
        let token = sign_token(&user.id, &self.config).unwrap();
        (user, token)
    }

    /// A USER account plus the linked student record.
    pub fn student(&self, name: &str, phone: &str, email: &str, qualification: Qualification) -> (User, Student, String) {
        let (user, token) = self.account(name, phone, Some(email), Role::User);
        let conn = self.db.lock();
        let student = Student::create(&conn, name, email, phone, qualification).unwrap();
        (user, student, token)
    }
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}
