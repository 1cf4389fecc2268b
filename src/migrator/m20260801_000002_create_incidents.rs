use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Incidents::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Incidents::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Incidents::ReporterId).integer().not_null())
                    .col(ColumnDef::new(Incidents::Kind).string().not_null())
                    .col(ColumnDef::new(Incidents::EmergencyType).string())
                    .col(ColumnDef::new(Incidents::Status).string().not_null())
                    .col(ColumnDef::new(Incidents::Latitude).double())
                    .col(ColumnDef::new(Incidents::Longitude).double())
                    .col(ColumnDef::new(Incidents::Description).text())
                    .col(ColumnDef::new(Incidents::VoiceNoteUrl).string())
                    .col(
                        ColumnDef::new(Incidents::IsSilent)
                            .boolean()
                            .default(false)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Incidents::AutoContact)
                            .boolean()
                            .default(false)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Incidents::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Incidents::ResolvedAt).date_time())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_incidents_reporter")
                            .from(Incidents::Table, Incidents::ReporterId)
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
                    .name("idx_incidents_reporter_id")
                    .table(Incidents::Table)
                    .col(Incidents::ReporterId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_incidents_status")
                    .table(Incidents::Table)
                    .col(Incidents::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IncidentHelpers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IncidentHelpers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IncidentHelpers::IncidentId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IncidentHelpers::HelperId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(IncidentHelpers::Status).string().not_null())
                    .col(
                        ColumnDef::new(IncidentHelpers::RespondedAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(ColumnDef::new(IncidentHelpers::ArrivedAt).date_time())
                    .col(ColumnDef::new(IncidentHelpers::Rating).integer())
                    .col(ColumnDef::new(IncidentHelpers::ActionsTaken).json())
                    .col(ColumnDef::new(IncidentHelpers::ThankYouNote).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_incident_helpers_incident")
                            .from(IncidentHelpers::Table, IncidentHelpers::IncidentId)
                            .to(Incidents::Table, Incidents::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_incident_helpers_helper")
                            .from(IncidentHelpers::Table, IncidentHelpers::HelperId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One response row per helper per incident; concurrent duplicate
        // inserts collapse onto this constraint.
        manager
            .create_index(
                Index::create()
                    .name("idx_incident_helpers_pair")
                    .table(IncidentHelpers::Table)
                    .col(IncidentHelpers::IncidentId)
                    .col(IncidentHelpers::HelperId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IncidentHelpers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Incidents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Incidents {
    Table,
    Id,
    ReporterId,
    Kind,
    EmergencyType,
    Status,
    Latitude,
    Longitude,
    Description,
    VoiceNoteUrl,
    IsSilent,
    AutoContact,
    CreatedAt,
    ResolvedAt,
}

#[derive(DeriveIden)]
enum IncidentHelpers {
    Table,
    Id,
    IncidentId,
    HelperId,
    Status,
    RespondedAt,
    ArrivedAt,
    Rating,
    ActionsTaken,
    ThankYouNote,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
