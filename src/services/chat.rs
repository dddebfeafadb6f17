//! 学六小助手：拼装支部数据上下文并转发到 OpenAI 兼容的对话接口。

use std::fmt::Write as _;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use sea_orm::{prelude::DateTimeWithTimeZone, *};
use secrecy::ExposeSecret;
use uuid::Uuid;

use crate::{
    core::{
        constants::*,
        enums::{CategoryKind, FileKind, PublicationStatus},
        error::AppError,
    },
    dtos::chat::{ChatMessage, CompletionRequest, CompletionResponse},
    entity::{categories, documents, materials, topics, users, work_logs},
    services::{
        community::answer_counts,
        material::material_counts,
        user::{display_names, name_of},
    },
    state::AppState,
};

const PERSONA: &str = "你是\"学六小助手\"，学生第六党支部的AI助手。你热情、专业、乐于助人。

你可以访问支部的数据概览，包括已发布的文档和活动日志摘要、学习资料的详细信息、社区话题以及学习资料的分类体系。";

const GUIDELINES: &str = "## 你的能力
1. **信息查询**: 帮助用户快速找到文档、资料、话题
2. **内容推荐**: 根据用户需求推荐相关学习资料
3. **数据统计**: 提供支部活动、资料的统计信息
4. **导航指引**: 告诉用户在哪个板块可以找到相关内容

## 回答风格
- 语气友好亲切，像支部的热心学长/学姐，适当使用 emoji
- 简洁明了，分点列举；提到具体文档或资料时给出标题、作者、时间
- 数据中有相关内容时优先引用，没有就如实告知
- 鼓励用户到对应板块查看完整内容";

const LAYOUT_PERSONA: &str = "你是\"学六小助手\"，一个专业的文档排版助手。你的任务是优化文档的排版格式，使其更适合PDF导出。

要求：
1. 保持原文内容不变，只优化排版
2. 使用清晰的标题层级（# ## ###）
3. 合理使用段落分隔
4. 添加适当的列表格式
5. 保持专业的文档风格
6. 输出纯Markdown格式，不要添加任何解释

直接输出优化后的Markdown内容，不要有任何前缀或后缀说明。";

const NO_KEY: &str = "系统未配置API Key，请联系管理员或在个人设置中填写。";

/// Key 的三级回退：请求携带 > 用户启用的个人 Key > 系统默认
pub fn resolve_api_key(
    request_key: Option<&str>,
    user: Option<&users::Model>,
    system_key: Option<&str>,
) -> Result<String, AppError> {
    let own_key = user
        .filter(|u| u.use_own_api_key)
        .and_then(|u| u.api_key.as_deref());

    [request_key, own_key, system_key]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|k| !k.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest(NO_KEY.to_string()))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextStats {
    pub documents: u64,
    pub work_logs: u64,
    pub materials: u64,
    pub topics: u64,
    pub users: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryLine {
    pub name: String,
    pub description: String,
    pub kind: CategoryKind,
    pub material_count: u64,
}

/// 文档或活动日志
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationLine {
    pub title: String,
    pub author: String,
    pub date: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialLine {
    pub title: String,
    pub file_type: FileKind,
    pub file_size: i64,
    pub category: Option<(String, CategoryKind)>,
    pub uploader: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLine {
    pub title: String,
    pub description: String,
    pub author: String,
    pub answer_count: u64,
    pub date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatContext {
    pub stats: ContextStats,
    pub categories: Vec<CategoryLine>,
    pub documents: Vec<PublicationLine>,
    pub work_logs: Vec<PublicationLine>,
    pub materials: Vec<MaterialLine>,
    pub topics: Vec<TopicLine>,
}

fn kind_label(kind: CategoryKind) -> &'static str {
    match kind {
        CategoryKind::Theory => "理论学习",
        CategoryKind::Course => "课程学习",
    }
}

fn file_label(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Image => "图片",
        FileKind::Video => "视频",
        FileKind::Document => "文档",
    }
}

/// 前 150 字，换行压成空格，截断时补 `...`
pub fn preview(content: &str) -> String {
    let mut out: String = content
        .chars()
        .take(CHAT_EXCERPT_CHARS)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    if content.chars().count() > CHAT_EXCERPT_CHARS {
        out.push_str("...");
    }
    out
}

fn format_date(at: &DateTimeWithTimeZone) -> String {
    at.format("%Y/%-m/%-d").to_string()
}

fn render_publications(out: &mut String, items: &[PublicationLine]) {
    let blocks: Vec<String> = items
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "{}. 《{}》\n   作者: {}\n   时间: {}\n   摘要: {}",
                i + 1,
                p.title,
                p.author,
                p.date,
                preview(&p.content)
            )
        })
        .collect();
    out.push_str(&blocks.join("\n\n"));
    out.push('\n');
}

/// 把数据概览渲染成 Markdown
pub fn render_context(ctx: &ChatContext) -> String {
    let mut out = String::from("\n# 学生第六党支部数据库概览\n\n");

    let s = &ctx.stats;
    let _ = writeln!(out, "## 📊 统计数据");
    let _ = writeln!(out, "- 已发布文档: {} 篇", s.documents);
    let _ = writeln!(out, "- 活动日志: {} 条", s.work_logs);
    let _ = writeln!(out, "- 学习资料: {} 个文件", s.materials);
    let _ = writeln!(out, "- 社区话题: {} 个", s.topics);
    let _ = writeln!(out, "- 支部成员: {} 人", s.users);

    let _ = writeln!(out, "\n## 📚 学习资料分类");
    for c in &ctx.categories {
        let _ = write!(out, "- {} ({}): {} 个文件", c.name, kind_label(c.kind), c.material_count);
        if !c.description.is_empty() {
            let _ = write!(out, " - {}", c.description);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "\n## 📄 近期文档 (已发布)");
    render_publications(&mut out, &ctx.documents);

    let _ = writeln!(out, "\n## 📝 活动日志 (已发布)");
    render_publications(&mut out, &ctx.work_logs);

    let _ = writeln!(out, "\n## 📖 学习资料清单");
    let blocks: Vec<String> = ctx
        .materials
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let size_mb = m.file_size as f64 / 1024.0 / 1024.0;
            let category = match &m.category {
                Some((name, kind)) => format!("{} ({})", name, kind_label(*kind)),
                None => "未分类".to_string(),
            };
            format!(
                "{}. {}\n   类型: {} | 大小: {:.2}MB\n   分类: {}\n   上传者: {}\n   时间: {}",
                i + 1,
                m.title,
                file_label(m.file_type),
                size_mb,
                category,
                m.uploader,
                m.date
            )
        })
        .collect();
    out.push_str(&blocks.join("\n\n"));
    out.push('\n');

    let _ = writeln!(out, "\n## 💬 社区话题");
    let blocks: Vec<String> = ctx
        .topics
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let mut block = format!("{}. {}\n", i + 1, t.title);
            if !t.description.is_empty() {
                let _ = writeln!(block, "   简介: {}", t.description);
            }
            let _ = write!(
                block,
                "   发起人: {}\n   回答数: {}\n   时间: {}",
                t.author, t.answer_count, t.date
            );
            block
        })
        .collect();
    out.push_str(&blocks.join("\n\n"));
    out.push('\n');

    out
}

pub fn system_prompt(context: &str) -> String {
    format!("{PERSONA}\n{context}\n{GUIDELINES}")
}

async fn collect_context(db: &DatabaseConnection) -> Result<ChatContext, AppError> {
    let docs = documents::Entity::find()
        .filter(documents::Column::Status.eq(PublicationStatus::Published))
        .order_by_desc(documents::Column::CreatedAt)
        .limit(CHAT_CONTEXT_DOCUMENTS)
        .all(db)
        .await?;
    let logs = work_logs::Entity::find()
        .filter(work_logs::Column::Status.eq(PublicationStatus::Published))
        .order_by_desc(work_logs::Column::CreatedAt)
        .limit(CHAT_CONTEXT_WORK_LOGS)
        .all(db)
        .await?;
    let mats = materials::Entity::find()
        .find_also_related(categories::Entity)
        .order_by_desc(materials::Column::CreatedAt)
        .limit(CHAT_CONTEXT_MATERIALS)
        .all(db)
        .await?;
    let topic_rows = topics::Entity::find()
        .order_by_desc(topics::Column::CreatedAt)
        .limit(CHAT_CONTEXT_TOPICS)
        .all(db)
        .await?;
    let category_rows = categories::Entity::find()
        .order_by_desc(categories::Column::CreatedAt)
        .all(db)
        .await?;

    let answer_totals = answer_counts(db, topic_rows.iter().map(|t| t.id).collect()).await?;
    let material_totals = material_counts(db).await?;

    let stats = ContextStats {
        documents: documents::Entity::find()
            .filter(documents::Column::Status.eq(PublicationStatus::Published))
            .count(db)
            .await?,
        work_logs: work_logs::Entity::find()
            .filter(work_logs::Column::Status.eq(PublicationStatus::Published))
            .count(db)
            .await?,
        materials: materials::Entity::find().count(db).await?,
        topics: topics::Entity::find().count(db).await?,
        users: users::Entity::find().count(db).await?,
    };

    let people: Vec<Uuid> = docs
        .iter()
        .map(|d| d.author_id)
        .chain(logs.iter().map(|l| l.author_id))
        .chain(mats.iter().map(|(m, _)| m.uploader_id))
        .chain(topic_rows.iter().map(|t| t.author_id))
        .collect();
    let names = display_names(db, people).await?;

    Ok(ChatContext {
        stats,
        categories: category_rows
            .into_iter()
            .map(|c| CategoryLine {
                material_count: material_totals.get(&c.id).copied().unwrap_or(0),
                name: c.name,
                description: c.description,
                kind: c.kind,
            })
            .collect(),
        documents: docs
            .into_iter()
            .map(|d| PublicationLine {
                author: name_of(&names, d.author_id),
                date: format_date(&d.created_at),
                title: d.title,
                content: d.content,
            })
            .collect(),
        work_logs: logs
            .into_iter()
            .map(|l| PublicationLine {
                author: name_of(&names, l.author_id),
                date: format_date(&l.created_at),
                title: l.title,
                content: l.content,
            })
            .collect(),
        materials: mats
            .into_iter()
            .map(|(m, c)| MaterialLine {
                uploader: name_of(&names, m.uploader_id),
                date: format_date(&m.created_at),
                category: c.map(|c| (c.name, c.kind)),
                title: m.title,
                file_type: m.file_type,
                file_size: m.file_size,
            })
            .collect(),
        topics: topic_rows
            .into_iter()
            .map(|t| TopicLine {
                author: name_of(&names, t.author_id),
                answer_count: answer_totals.get(&t.id).copied().unwrap_or(0),
                date: format_date(&t.created_at),
                title: t.title,
                description: t.description,
            })
            .collect(),
    })
}

/// 数据库出错时退化为空上下文，不影响对话本身
pub async fn build_context(db: &DatabaseConnection) -> String {
    match collect_context(db).await {
        Ok(ctx) => render_context(&ctx),
        Err(e) => {
            tracing::error!("❌ Failed to assemble chat context: {:?}", e);
            String::new()
        }
    }
}

/// 按三级回退选出本次使用的 Key
async fn pick_key(state: &AppState, user_id: Uuid, request_key: Option<&str>) -> Result<String, AppError> {
    let user = users::Entity::find_by_id(user_id).one(state.db.as_ref()).await?;
    let system_key = state.config.default_chat_key().map(|k| k.expose_secret());
    resolve_api_key(request_key, user.as_ref(), system_key)
}

async fn send_completion(
    state: &AppState,
    api_key: &str,
    messages: Vec<ChatMessage>,
    stream: bool,
) -> Result<reqwest::Response, AppError> {
    let body = CompletionRequest {
        model: &state.config.chat_model,
        messages,
        stream,
    };

    let response = state
        .http
        .post(&state.config.chat_api_url)
        .header(AUTHORIZATION, format!("Bearer {api_key}"))
        .header(CONTENT_TYPE, "application/json")
        .header("HTTP-Referer", &state.config.app_url)
        .header("X-Title", "CPC Student Branch App")
        .json(&body)
        .send()
        .await
        .map_err(|e| AppError::UpstreamError(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(AppError::UpstreamError(format!("{status}: {detail}")));
    }
    Ok(response)
}

/// 校验消息、选定 Key、拼好 Prompt 后转发。
/// 返回上游的原始响应，由调用方决定透传流还是解析 JSON。
pub async fn forward(
    state: &AppState,
    user_id: Uuid,
    message: &str,
    request_key: Option<&str>,
    stream: bool,
) -> Result<reqwest::Response, AppError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("消息不能为空".to_string()));
    }

    let api_key = pick_key(state, user_id, request_key).await?;
    let context = build_context(&state.db).await;
    let messages = vec![
        ChatMessage {
            role: "system",
            content: system_prompt(&context),
        },
        ChatMessage {
            role: "user",
            content: message.to_string(),
        },
    ];
    send_completion(state, &api_key, messages, stream).await
}

/// 排版优化的对话内容；标题或正文为空时拒绝
pub fn layout_messages(title: &str, content: &str) -> Result<Vec<ChatMessage>, AppError> {
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(AppError::BadRequest("标题和内容不能为空".to_string()));
    }
    Ok(vec![
        ChatMessage {
            role: "system",
            content: LAYOUT_PERSONA.to_string(),
        },
        ChatMessage {
            role: "user",
            content: format!("请优化以下文档的排版：\n\n标题：{title}\n\n内容：\n{content}"),
        },
    ])
}

/// 把文档交给 AI 重新排版，导出 PDF 前使用。不附带支部数据上下文。
pub async fn optimize_layout(
    state: &AppState,
    user_id: Uuid,
    title: &str,
    content: &str,
    stream: bool,
) -> Result<reqwest::Response, AppError> {
    let messages = layout_messages(title, content)?;
    let api_key = pick_key(state, user_id, None).await?;
    send_completion(state, &api_key, messages, stream).await
}

/// 非流式响应的第一条回复，空串算没有
pub async fn first_choice(response: reqwest::Response) -> Result<Option<String>, AppError> {
    let data: CompletionResponse = response
        .json()
        .await
        .map_err(|e| AppError::UpstreamError(format!("bad completion body: {e}")))?;
    Ok(data
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .filter(|c| !c.is_empty()))
}

pub async fn read_reply(response: reqwest::Response) -> Result<String, AppError> {
    Ok(first_choice(response).await?.unwrap_or_else(|| "无回复".to_string()))
}
