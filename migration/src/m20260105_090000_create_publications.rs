use sea_orm_migration::prelude::*;

use crate::m20251229_063323_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 文档与活动日志结构一致：draft -> published 单向状态
        manager
            .create_table(
                Table::create()
                    .table(Documents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Documents::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Documents::Title).string().not_null())
                    .col(ColumnDef::new(Documents::Content).text().not_null().default(""))
                    .col(ColumnDef::new(Documents::Status).string().not_null().default("draft"))
                    .col(ColumnDef::new(Documents::AuthorId).uuid().not_null())
                    .col(
                        ColumnDef::new(Documents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Documents::PublishedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_documents_author")
                            .from(Documents::Table, Documents::AuthorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DocumentEditors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DocumentEditors::DocumentId).uuid().not_null())
                    .col(ColumnDef::new(DocumentEditors::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(DocumentEditors::EditedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // 复合主键：同一用户对同一文档只保留一条编辑记录
                    .primary_key(
                        Index::create()
                            .col(DocumentEditors::DocumentId)
                            .col(DocumentEditors::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_document_editors_document")
                            .from(DocumentEditors::Table, DocumentEditors::DocumentId)
                            .to(Documents::Table, Documents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_document_editors_user")
                            .from(DocumentEditors::Table, DocumentEditors::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DocumentAttachments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DocumentAttachments::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(DocumentAttachments::DocumentId).uuid().not_null())
                    .col(ColumnDef::new(DocumentAttachments::Filename).string().not_null())
                    .col(ColumnDef::new(DocumentAttachments::Url).string().not_null())
                    .col(ColumnDef::new(DocumentAttachments::Size).big_integer().not_null())
                    .col(
                        ColumnDef::new(DocumentAttachments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_document_attachments_document")
                            .from(DocumentAttachments::Table, DocumentAttachments::DocumentId)
                            .to(Documents::Table, Documents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WorkLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WorkLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(WorkLogs::Title).string().not_null())
                    .col(ColumnDef::new(WorkLogs::Content).text().not_null().default(""))
                    .col(ColumnDef::new(WorkLogs::Status).string().not_null().default("draft"))
                    .col(ColumnDef::new(WorkLogs::AuthorId).uuid().not_null())
                    .col(
                        ColumnDef::new(WorkLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(WorkLogs::PublishedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_logs_author")
                            .from(WorkLogs::Table, WorkLogs::AuthorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WorkLogEditors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(WorkLogEditors::WorkLogId).uuid().not_null())
                    .col(ColumnDef::new(WorkLogEditors::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(WorkLogEditors::EditedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(WorkLogEditors::WorkLogId)
                            .col(WorkLogEditors::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_log_editors_work_log")
                            .from(WorkLogEditors::Table, WorkLogEditors::WorkLogId)
                            .to(WorkLogs::Table, WorkLogs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_log_editors_user")
                            .from(WorkLogEditors::Table, WorkLogEditors::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WorkLogEditors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DocumentAttachments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DocumentEditors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Documents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Documents {
    Table,
    Id,
    Title,
    Content,
    Status,
    AuthorId,
    CreatedAt,
    PublishedAt,
}

#[derive(DeriveIden)]
enum DocumentEditors {
    Table,
    DocumentId,
    UserId,
    EditedAt,
}

#[derive(DeriveIden)]
enum DocumentAttachments {
    Table,
    Id,
    DocumentId,
    Filename,
    Url,
    Size,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WorkLogs {
    Table,
    Id,
    Title,
    Content,
    Status,
    AuthorId,
    CreatedAt,
    PublishedAt,
}

#[derive(DeriveIden)]
enum WorkLogEditors {
    Table,
    WorkLogId,
    UserId,
    EditedAt,
}
