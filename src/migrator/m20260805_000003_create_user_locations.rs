use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserLocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserLocations::UserId)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserLocations::Latitude).double().not_null())
                    .col(
                        ColumnDef::new(UserLocations::Longitude)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserLocations::IsSharing)
                            .boolean()
                            .default(false)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserLocations::UpdatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_locations_user")
                            .from(UserLocations::Table, UserLocations::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserLocations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserLocations {
    Table,
    UserId,
    Latitude,
    Longitude,
    IsSharing,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
