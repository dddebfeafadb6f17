pub use sea_orm_migration::prelude::*;

mod m20251229_063323_create_users;
mod m20260105_090000_create_publications;
mod m20260105_091500_create_materials;
mod m20260105_093000_create_community;
mod m20260105_094500_create_party_infos;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251229_063323_create_users::Migration),
            Box::new(m20260105_090000_create_publications::Migration),
            Box::new(m20260105_091500_create_materials::Migration),
            Box::new(m20260105_093000_create_community::Migration),
            Box::new(m20260105_094500_create_party_infos::Migration),
        ]
    }
}
