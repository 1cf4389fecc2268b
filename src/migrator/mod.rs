use sea_orm_migration::prelude::*;

mod m20260801_000001_create_users;
mod m20260801_000002_create_incidents;
mod m20260805_000001_create_trusted_circles;
mod m20260805_000002_create_check_in_timers;
mod m20260805_000003_create_user_locations;
mod m20260810_000001_create_badges;
mod m20260812_000001_create_notifications;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260801_000001_create_users::Migration),
            Box::new(m20260801_000002_create_incidents::Migration),
            Box::new(m20260805_000001_create_trusted_circles::Migration),
            Box::new(m20260805_000002_create_check_in_timers::Migration),
            Box::new(m20260805_000003_create_user_locations::Migration),
            Box::new(m20260810_000001_create_badges::Migration),
            Box::new(m20260812_000001_create_notifications::Migration),
        ]
    }
}
