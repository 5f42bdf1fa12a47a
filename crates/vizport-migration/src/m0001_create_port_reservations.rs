use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PortReservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PortReservations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PortReservations::UserId).string().not_null())
                    .col(
                        ColumnDef::new(PortReservations::RequestedPort)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PortReservations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .index(
                        Index::create()
                            .name("idx_port_reservations_requested_port_unique")
                            .table(PortReservations::Table)
                            .col(PortReservations::RequestedPort)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_port_reservations_user_id")
                    .table(PortReservations::Table)
                    .col(PortReservations::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PortReservations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PortReservations {
    Table,
    Id,
    UserId,
    RequestedPort,
    CreatedAt,
}
