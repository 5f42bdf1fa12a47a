use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RunningContainers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RunningContainers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RunningContainers::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RunningContainers::Port).integer().not_null())
                    .col(
                        ColumnDef::new(RunningContainers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .index(
                        Index::create()
                            .name("idx_running_containers_port_unique")
                            .table(RunningContainers::Table)
                            .col(RunningContainers::Port)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_running_containers_user_id")
                    .table(RunningContainers::Table)
                    .col(RunningContainers::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RunningContainers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RunningContainers {
    Table,
    Id,
    UserId,
    Port,
    CreatedAt,
}
