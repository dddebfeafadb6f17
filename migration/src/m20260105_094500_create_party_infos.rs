use sea_orm_migration::prelude::*;

use crate::m20251229_063323_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PartyInfos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PartyInfos::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    // 与 users 一对一
                    .col(ColumnDef::new(PartyInfos::UserId).uuid().not_null().unique_key())
                    .col(ColumnDef::new(PartyInfos::PoliticalStatus).string().not_null().default("群众"))
                    .col(ColumnDef::new(PartyInfos::ClassName).string().not_null().default(""))
                    .col(ColumnDef::new(PartyInfos::Hometown).string().not_null().default(""))
                    .col(ColumnDef::new(PartyInfos::WechatQq).string().not_null().default(""))
                    .col(ColumnDef::new(PartyInfos::JoinLeagueDate).date())
                    .col(ColumnDef::new(PartyInfos::ActivistDate).date())
                    .col(ColumnDef::new(PartyInfos::ProbationaryDate).date())
                    .col(ColumnDef::new(PartyInfos::FormalDate).date())
                    .col(ColumnDef::new(PartyInfos::ShowPoliticalStatus).boolean().not_null().default(true))
                    .col(ColumnDef::new(PartyInfos::ShowClassName).boolean().not_null().default(true))
                    .col(ColumnDef::new(PartyInfos::ShowHometown).boolean().not_null().default(true))
                    .col(ColumnDef::new(PartyInfos::ShowWechatQq).boolean().not_null().default(false))
                    .col(ColumnDef::new(PartyInfos::ShowJoinLeagueDate).boolean().not_null().default(true))
                    .col(ColumnDef::new(PartyInfos::ShowActivistDate).boolean().not_null().default(true))
                    .col(ColumnDef::new(PartyInfos::ShowProbationaryDate).boolean().not_null().default(true))
                    .col(ColumnDef::new(PartyInfos::ShowFormalDate).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(PartyInfos::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PartyInfos::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_party_infos_user")
                            .from(PartyInfos::Table, PartyInfos::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // update_timestamp() 由 users 迁移创建
        let db = manager.get_connection();
        db.execute_unprepared(
            "CREATE TRIGGER set_party_infos_timestamp
             BEFORE UPDATE ON party_infos
             FOR EACH ROW
             EXECUTE PROCEDURE update_timestamp();",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TRIGGER IF EXISTS set_party_infos_timestamp ON party_infos;")
            .await?;

        manager
            .drop_table(Table::drop().table(PartyInfos::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PartyInfos {
    Table,
    Id,
    UserId,
    PoliticalStatus,
    ClassName,
    Hometown,
    WechatQq,
    JoinLeagueDate,
    ActivistDate,
    ProbationaryDate,
    FormalDate,
    ShowPoliticalStatus,
    ShowClassName,
    ShowHometown,
    ShowWechatQq,
    ShowJoinLeagueDate,
    ShowActivistDate,
    ShowProbationaryDate,
    ShowFormalDate,
    CreatedAt,
    UpdatedAt,
}
