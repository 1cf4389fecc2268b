use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IncidentNotifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IncidentNotifications::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IncidentNotifications::IncidentId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IncidentNotifications::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IncidentNotifications::Kind)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IncidentNotifications::CreatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_incident_notifications_incident")
                            .from(
                                IncidentNotifications::Table,
                                IncidentNotifications::IncidentId,
                            )
                            .to(Incidents::Table, Incidents::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_incident_notifications_user_id")
                    .table(IncidentNotifications::Table)
                    .col(IncidentNotifications::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PointAwards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PointAwards::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PointAwards::UserId).integer().not_null())
                    .col(ColumnDef::new(PointAwards::Points).integer().not_null())
                    .col(ColumnDef::new(PointAwards::Reason).string().not_null())
                    .col(
                        ColumnDef::new(PointAwards::CreatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_point_awards_user")
                            .from(PointAwards::Table, PointAwards::UserId)
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
                    .name("idx_point_awards_user_id")
                    .table(PointAwards::Table)
                    .col(PointAwards::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PointAwards::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(IncidentNotifications::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum IncidentNotifications {
    Table,
    Id,
    IncidentId,
    UserId,
    Kind,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PointAwards {
    Table,
    Id,
    UserId,
    Points,
    Reason,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Incidents {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
