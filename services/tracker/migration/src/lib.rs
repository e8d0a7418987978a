pub use sea_orm_migration::prelude::*;

mod m20251001_000001_create_users;
mod m20251001_000002_create_sessions;
mod m20251001_000003_create_locations;
mod m20251001_000004_create_blackouts;
mod m20251001_000005_create_meta;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_create_users::Migration),
            Box::new(m20251001_000002_create_sessions::Migration),
            Box::new(m20251001_000003_create_locations::Migration),
            Box::new(m20251001_000004_create_blackouts::Migration),
            Box::new(m20251001_000005_create_meta::Migration),
        ]
    }
}
