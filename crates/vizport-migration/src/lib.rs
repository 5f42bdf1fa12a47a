use sea_orm_migration::prelude::*;

mod m0001_create_port_reservations;
mod m0002_create_port_assignments;
mod m0003_create_running_containers;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m0001_create_port_reservations::Migration),
            Box::new(m0002_create_port_assignments::Migration),
            Box::new(m0003_create_running_containers::Migration),
        ]
    }
}
