use sqlx::{PgPool, Row};
use anyhow::{Result, Context};

pub const REQUIRED_TABLES: [&str; 5] = ["announcements", "leave_requests", "profiles", "shifts", "tasks"];

#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        log::info!("🔗 Connecting to database...");

        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to the database")?;

        log::info!("✅ Database connection established");

        Ok(Database { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        log::info!("🔍 Running database health check...");

        let row = sqlx::query("SELECT 1 as health_check")
            .fetch_one(&self.pool)
            .await
            .context("Failed to execute health check query")?;

        let result: i32 = row.get("health_check");

        if result == 1 {
            log::info!("✅ Database health check passed");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Database health check failed"))
        }
    }

    pub async fn check_tables(&self) -> Result<()> {
        log::info!("📋 Checking database tables...");

        let tables = sqlx::query(
            r#"
            SELECT table_name
            FROM information_schema.tables
            WHERE table_schema = 'public'
            AND table_name = ANY($1)
            ORDER BY table_name
            "#
        )
        .bind(&REQUIRED_TABLES[..])
        .fetch_all(&self.pool)
        .await
        .context("Failed to check database tables")?;

        let found_tables: Vec<String> = tables
            .iter()
            .map(|row| row.get::<String, _>("table_name"))
            .collect();

        log::info!("📊 Found tables: {:?}", found_tables);

        if found_tables.len() == REQUIRED_TABLES.len() {
            log::info!("✅ All required tables exist");
        } else {
            log::warn!("⚠️  Some tables may be missing. Expected: {:?}", REQUIRED_TABLES);
            log::warn!("   Run schema.sql against the database if tables are missing");
        }

        Ok(())
    }

    pub async fn get_stats(&self) -> Result<DatabaseStats> {
        let stats = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM profiles) as profile_count,
                (SELECT COUNT(*) FROM tasks) as task_count,
                (SELECT COUNT(*) FROM leave_requests) as leave_count,
                (SELECT COUNT(*) FROM leave_requests WHERE status = 'pending') as pending_leave_count,
                (SELECT COUNT(*) FROM announcements) as announcement_count
            "#
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to get database statistics")?;

        Ok(DatabaseStats {
            profiles: stats.get::<i64, _>("profile_count"),
            tasks: stats.get::<i64, _>("task_count"),
            leave_requests: stats.get::<i64, _>("leave_count"),
            pending_leave_requests: stats.get::<i64, _>("pending_leave_count"),
            announcements: stats.get::<i64, _>("announcement_count"),
        })
    }
}

#[derive(Debug, Default)]
pub struct DatabaseStats {
    pub profiles: i64,
    pub tasks: i64,
    pub leave_requests: i64,
    pub pending_leave_requests: i64,
    pub announcements: i64,
}

impl DatabaseStats {
    pub fn log_stats(&self) {
        log::info!("📈 Database Statistics:");
        log::info!("   👥 Profiles: {}", self.profiles);
        log::info!("   📋 Tasks: {}", self.tasks);
        log::info!("   🌴 Leave requests: {} ({} pending)", self.leave_requests, self.pending_leave_requests);
        log::info!("   📢 Announcements: {}", self.announcements);
    }
}
