use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Badges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Badges::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Badges::Name).string().not_null())
                    .col(ColumnDef::new(Badges::Icon).string().not_null())
                    .col(ColumnDef::new(Badges::Description).text())
                    .col(ColumnDef::new(Badges::Tier).string().not_null())
                    .col(
                        ColumnDef::new(Badges::PointsRequired)
                            .integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserBadges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserBadges::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserBadges::UserId).integer().not_null())
                    .col(ColumnDef::new(UserBadges::BadgeId).integer().not_null())
                    .col(
                        ColumnDef::new(UserBadges::UnlockedAt)
                            .date_time()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_badges_user")
                            .from(UserBadges::Table, UserBadges::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_badges_badge")
                            .from(UserBadges::Table, UserBadges::BadgeId)
                            .to(Badges::Table, Badges::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unlocks are monotonic; duplicate unlock attempts land on this
        // constraint and are dropped.
        manager
            .create_index(
                Index::create()
                    .name("idx_user_badges_pair")
                    .table(UserBadges::Table)
                    .col(UserBadges::UserId)
                    .col(UserBadges::BadgeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Seed the badge catalog.
        let seed = [
            ("First Responder", "🦸", "Responded to your first emergency", "bronze", 100),
            ("Shield Master", "🛡️", "Completed safety training", "bronze", 250),
            ("Guardian Angel", "👼", "Helped 5 people in emergencies", "silver", 500),
            ("Night Owl", "🦉", "Responded to 3 nighttime emergencies", "silver", 1000),
            ("Campus Hero", "🏆", "Reached Level 10", "gold", 2500),
            ("Trusted Friend", "🤝", "Added to 10 trusted circles", "gold", 5000),
            ("Safety Legend", "⭐", "Reached Level 25", "platinum", 10000),
        ];
        for (name, icon, description, tier, points_required) in seed {
            manager
                .exec_stmt(
                    Query::insert()
                        .into_table(Badges::Table)
                        .columns([
                            Badges::Name,
                            Badges::Icon,
                            Badges::Description,
                            Badges::Tier,
                            Badges::PointsRequired,
                        ])
                        .values_panic([
                            name.into(),
                            icon.into(),
                            description.into(),
                            tier.into(),
                            points_required.into(),
                        ])
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserBadges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Badges::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Badges {
    Table,
    Id,
    Name,
    Icon,
    Description,
    Tier,
    PointsRequired,
}

#[derive(DeriveIden)]
enum UserBadges {
    Table,
    Id,
    UserId,
    BadgeId,
    UnlockedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
