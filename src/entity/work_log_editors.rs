use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "work_log_editors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub work_log_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    pub edited_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::work_logs::Entity",
        from = "Column::WorkLogId",
        to = "super::work_logs::Column::Id",
        on_delete = "Cascade"
    )]
    WorkLog,
}

impl Related<super::work_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
