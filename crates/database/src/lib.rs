use std::{env, error::Error};

mod driver_store;
mod error;
mod ride_store;
mod rows;

pub use error::convert_error;

/// Takes a single DSN rather than split host/port/user/password variables —
/// `DATABASE_URL` is the one variable `web::main` requires at startup.
pub struct DatabaseConnectionInfo {
    pub url: String,
}

impl DatabaseConnectionInfo {
    pub fn from_env() -> Option<Self> {
        env::var("DATABASE_URL").ok().map(|url| Self { url })
    }
}

#[derive(Clone)]
pub struct PgDatabase {
    pool: sqlx::PgPool,
}

impl PgDatabase {
    pub async fn connect(
        connection_info: DatabaseConnectionInfo,
    ) -> Result<Self, Box<dyn Error>> {
        let pool = sqlx::postgres::PgPool::connect(&connection_info.url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }
}
