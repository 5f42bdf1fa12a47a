use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PortAssignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PortAssignments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PortAssignments::UserId).string().not_null())
                    .col(ColumnDef::new(PortAssignments::Port).integer().not_null())
                    .col(
                        ColumnDef::new(PortAssignments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .index(
                        Index::create()
                            .name("idx_port_assignments_port_unique")
                            .table(PortAssignments::Table)
                            .col(PortAssignments::Port)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_port_assignments_user_id")
                    .table(PortAssignments::Table)
                    .col(PortAssignments::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PortAssignments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PortAssignments {
    Table,
    Id,
    UserId,
    Port,
    CreatedAt,
}
