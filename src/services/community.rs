use std::collections::HashMap;

use sea_orm::{sea_query::Expr, *};
use uuid::Uuid;

use crate::{
    core::error::AppError,
    dtos::{
        community::{AnswerView, LikeState, ReplyView, TopicDetail, TopicSummary},
        AuthorRef,
    },
    entity::{answer_likes, answers, replies, topics, users},
    extractors::current_user::CurrentUser,
    services::user::{display_names, name_of},
};

fn author(names: &HashMap<Uuid, String>, id: Uuid) -> AuthorRef {
    AuthorRef {
        id,
        name: name_of(names, id),
    }
}

fn required(text: &str, message: &str) -> Result<String, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest(message.to_string()));
    }
    Ok(text.to_string())
}

/// 按话题统计回答数
pub async fn answer_counts<C: ConnectionTrait>(
    db: &C,
    topic_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, u64>, AppError> {
    if topic_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(Uuid, i64)> = answers::Entity::find()
        .select_only()
        .column(answers::Column::TopicId)
        .column_as(Expr::col(answers::Column::Id).count(), "count")
        .filter(answers::Column::TopicId.is_in(topic_ids))
        .group_by(answers::Column::TopicId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|(id, n)| (id, n as u64)).collect())
}

async fn like_counts(db: &DatabaseConnection, answer_ids: Vec<Uuid>) -> Result<HashMap<Uuid, u64>, AppError> {
    if answer_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(Uuid, i64)> = answer_likes::Entity::find()
        .select_only()
        .column(answer_likes::Column::AnswerId)
        .column_as(Expr::col(answer_likes::Column::Id).count(), "count")
        .filter(answer_likes::Column::AnswerId.is_in(answer_ids))
        .group_by(answer_likes::Column::AnswerId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|(id, n)| (id, n as u64)).collect())
}

async fn find_topic(db: &DatabaseConnection, id: Uuid) -> Result<topics::Model, AppError> {
    topics::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("话题不存在".to_string()))
}

async fn find_answer(db: &DatabaseConnection, id: Uuid) -> Result<answers::Model, AppError> {
    answers::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("回答不存在".to_string()))
}

pub async fn list_topics(db: &DatabaseConnection) -> Result<Vec<TopicSummary>, AppError> {
    let rows = topics::Entity::find()
        .order_by_desc(topics::Column::CreatedAt)
        .all(db)
        .await?;
    let counts = answer_counts(db, rows.iter().map(|t| t.id).collect()).await?;
    let names = display_names(db, rows.iter().map(|t| t.author_id)).await?;

    Ok(rows
        .into_iter()
        .map(|t| TopicSummary {
            author: author(&names, t.author_id),
            answer_count: counts.get(&t.id).copied().unwrap_or(0),
            id: t.id,
            title: t.title,
            description: t.description,
            created_at: t.created_at,
        })
        .collect())
}

/// 作者账号必须仍然存在
pub async fn create_topic(
    db: &DatabaseConnection,
    user: &CurrentUser,
    title: &str,
    description: Option<String>,
) -> Result<TopicSummary, AppError> {
    let title = required(title, "标题不能为空")?;
    let author_row = users::Entity::find_by_id(user.id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("用户不存在".to_string()))?;

    let topic = topics::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        description: Set(description.unwrap_or_default()),
        author_id: Set(user.id),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(TopicSummary {
        author: AuthorRef {
            id: author_row.id,
            name: author_row.display_name(),
        },
        answer_count: 0,
        id: topic.id,
        title: topic.title,
        description: topic.description,
        created_at: topic.created_at,
    })
}

/// 回答按时间倒序，附点赞数
pub async fn get_topic(db: &DatabaseConnection, id: Uuid) -> Result<TopicDetail, AppError> {
    let topic = find_topic(db, id).await?;
    let answer_rows = answers::Entity::find()
        .filter(answers::Column::TopicId.eq(id))
        .order_by_desc(answers::Column::CreatedAt)
        .all(db)
        .await?;
    let likes = like_counts(db, answer_rows.iter().map(|a| a.id).collect()).await?;
    let names = display_names(
        db,
        std::iter::once(topic.author_id).chain(answer_rows.iter().map(|a| a.author_id)),
    )
    .await?;

    let answers = answer_rows
        .into_iter()
        .map(|a| AnswerView {
            author: author(&names, a.author_id),
            like_count: likes.get(&a.id).copied().unwrap_or(0),
            id: a.id,
            content: a.content,
            created_at: a.created_at,
        })
        .collect();

    Ok(TopicDetail {
        author: author(&names, topic.author_id),
        id: topic.id,
        title: topic.title,
        description: topic.description,
        created_at: topic.created_at,
        answers,
    })
}

/// 回答、回复、点赞随话题级联删除
pub async fn delete_topic(db: &DatabaseConnection, user: &CurrentUser, id: Uuid) -> Result<(), AppError> {
    let topic = find_topic(db, id).await?;
    user.ensure_can_manage(topic.author_id, "无权删除此话题")?;
    topics::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

pub async fn create_answer(
    db: &DatabaseConnection,
    user: &CurrentUser,
    topic_id: Uuid,
    content: &str,
) -> Result<AnswerView, AppError> {
    let content = required(content, "回答内容不能为空")?;
    find_topic(db, topic_id).await?;

    let answer = answers::ActiveModel {
        id: Set(Uuid::new_v4()),
        content: Set(content),
        topic_id: Set(topic_id),
        author_id: Set(user.id),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let names = display_names(db, [user.id]).await?;
    Ok(AnswerView {
        author: author(&names, user.id),
        like_count: 0,
        id: answer.id,
        content: answer.content,
        created_at: answer.created_at,
    })
}

pub async fn delete_answer(db: &DatabaseConnection, user: &CurrentUser, id: Uuid) -> Result<(), AppError> {
    let answer = find_answer(db, id).await?;
    user.ensure_can_manage(answer.author_id, "无权删除此回答")?;
    answers::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

async fn find_like(
    db: &DatabaseConnection,
    answer_id: Uuid,
    user_id: Uuid,
) -> Result<Option<answer_likes::Model>, AppError> {
    Ok(answer_likes::Entity::find()
        .filter(answer_likes::Column::AnswerId.eq(answer_id))
        .filter(answer_likes::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

/// 已赞则取消，未赞则点赞
pub async fn toggle_like(db: &DatabaseConnection, user: &CurrentUser, answer_id: Uuid) -> Result<LikeState, AppError> {
    find_answer(db, answer_id).await?;

    match find_like(db, answer_id, user.id).await? {
        Some(like) => {
            answer_likes::Entity::delete_by_id(like.id).exec(db).await?;
            Ok(LikeState { liked: false })
        }
        None => {
            answer_likes::ActiveModel {
                id: Set(Uuid::new_v4()),
                answer_id: Set(answer_id),
                user_id: Set(user.id),
                ..Default::default()
            }
            .insert(db)
            .await?;
            Ok(LikeState { liked: true })
        }
    }
}

pub async fn like_state(db: &DatabaseConnection, user: &CurrentUser, answer_id: Uuid) -> Result<LikeState, AppError> {
    let liked = find_like(db, answer_id, user.id).await?.is_some();
    Ok(LikeState { liked })
}

/// 回复按时间正序
pub async fn list_replies(db: &DatabaseConnection, answer_id: Uuid) -> Result<Vec<ReplyView>, AppError> {
    let rows = replies::Entity::find()
        .filter(replies::Column::AnswerId.eq(answer_id))
        .order_by_asc(replies::Column::CreatedAt)
        .all(db)
        .await?;
    let names = display_names(db, rows.iter().map(|r| r.author_id)).await?;
    Ok(rows
        .into_iter()
        .map(|r| ReplyView {
            author: author(&names, r.author_id),
            id: r.id,
            content: r.content,
            created_at: r.created_at,
        })
        .collect())
}

pub async fn create_reply(
    db: &DatabaseConnection,
    user: &CurrentUser,
    answer_id: Uuid,
    content: &str,
) -> Result<ReplyView, AppError> {
    let content = required(content, "回复内容不能为空")?;
    find_answer(db, answer_id).await?;

    let reply = replies::ActiveModel {
        id: Set(Uuid::new_v4()),
        content: Set(content),
        answer_id: Set(answer_id),
        author_id: Set(user.id),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let names = display_names(db, [user.id]).await?;
    Ok(ReplyView {
        author: author(&names, user.id),
        id: reply.id,
        content: reply.content,
        created_at: reply.created_at,
    })
}
