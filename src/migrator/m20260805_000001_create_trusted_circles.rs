use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrustedCircles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrustedCircles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TrustedCircles::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(TrustedCircles::TrustedUserId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TrustedCircles::Status).string().not_null())
                    .col(
                        ColumnDef::new(TrustedCircles::CreatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trusted_circles_user")
                            .from(TrustedCircles::Table, TrustedCircles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trusted_circles_trusted_user")
                            .from(TrustedCircles::Table, TrustedCircles::TrustedUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_trusted_circles_pair")
                    .table(TrustedCircles::Table)
                    .col(TrustedCircles::UserId)
                    .col(TrustedCircles::TrustedUserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_trusted_circles_trusted_user_id")
                    .table(TrustedCircles::Table)
                    .col(TrustedCircles::TrustedUserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrustedCircles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TrustedCircles {
    Table,
    Id,
    UserId,
    TrustedUserId,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
