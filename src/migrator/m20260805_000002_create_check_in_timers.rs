use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CheckInTimers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CheckInTimers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CheckInTimers::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(CheckInTimers::DurationMinutes)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CheckInTimers::StartedAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CheckInTimers::ExpiresAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CheckInTimers::Status).string().not_null())
                    .col(
                        ColumnDef::new(CheckInTimers::CreatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_check_in_timers_user")
                            .from(CheckInTimers::Table, CheckInTimers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The sweep scans by (status, expires_at).
        manager
            .create_index(
                Index::create()
                    .name("idx_check_in_timers_status_expires")
                    .table(CheckInTimers::Table)
                    .col(CheckInTimers::Status)
                    .col(CheckInTimers::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CheckInTimers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CheckInTimers {
    Table,
    Id,
    UserId,
    DurationMinutes,
    StartedAt,
    ExpiresAt,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
