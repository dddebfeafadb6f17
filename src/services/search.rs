use sea_orm::{
    sea_query::{Expr, Func, IntoColumnRef, LikeExpr, SimpleExpr},
    *,
};

use crate::{
    core::{
        constants::{SEARCH_BUCKET_LIMIT, SEARCH_EXCERPT_CHARS},
        enums::PublicationStatus,
        error::AppError,
    },
    dtos::search::{CategoryHit, DocumentHit, MaterialHit, SearchResults, TopicHit},
    entity::{categories, documents, materials, topics},
    services::{
        community::answer_counts,
        material::material_counts,
        user::{display_names, name_of},
    },
};

/// 搜索范围。`materials` 同时覆盖资料和板块；未知值按全部处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    All,
    Community,
    Documents,
    Materials,
}

impl SearchScope {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("community") => Self::Community,
            Some("documents") => Self::Documents,
            Some("materials") => Self::Materials,
            _ => Self::All,
        }
    }

    fn includes(self, other: SearchScope) -> bool {
        self == SearchScope::All || self == other
    }
}

/// 转义 LIKE 通配符后前后加 `%`，统一小写
pub fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// lower(列) LIKE 模式
fn folded_like<T: IntoColumnRef>(col: T, pattern: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col))).like(LikeExpr::new(pattern).escape('\\'))
}

pub fn excerpt(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}

pub async fn search(
    db: &DatabaseConnection,
    query: Option<&str>,
    scope: SearchScope,
) -> Result<SearchResults, AppError> {
    let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return Ok(SearchResults::default());
    };
    let pattern = like_pattern(query);
    let mut results = SearchResults::default();

    if scope.includes(SearchScope::Community) {
        results.community = search_topics(db, &pattern).await?;
    }
    if scope.includes(SearchScope::Documents) {
        results.documents = search_documents(db, &pattern).await?;
    }
    if scope.includes(SearchScope::Materials) {
        results.materials = search_materials(db, &pattern).await?;
        results.categories = search_categories(db, &pattern).await?;
    }

    tracing::debug!(
        "🔍 '{}' -> {} topics, {} documents, {} materials, {} categories",
        query,
        results.community.len(),
        results.documents.len(),
        results.materials.len(),
        results.categories.len()
    );
    Ok(results)
}

async fn search_topics(db: &DatabaseConnection, pattern: &str) -> Result<Vec<TopicHit>, AppError> {
    let rows = topics::Entity::find()
        .filter(
            Condition::any()
                .add(folded_like((topics::Entity, topics::Column::Title), pattern))
                .add(folded_like((topics::Entity, topics::Column::Description), pattern)),
        )
        .order_by_desc(topics::Column::CreatedAt)
        .limit(SEARCH_BUCKET_LIMIT)
        .all(db)
        .await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let counts = answer_counts(db, rows.iter().map(|t| t.id).collect()).await?;
    let names = display_names(db, rows.iter().map(|t| t.author_id)).await?;

    Ok(rows
        .into_iter()
        .map(|t| TopicHit {
            author: name_of(&names, t.author_id),
            answer_count: counts.get(&t.id).copied().unwrap_or(0),
            url: format!("/community/{}", t.id),
            id: t.id,
            title: t.title,
            description: t.description,
            created_at: t.created_at,
        })
        .collect())
}

/// 只搜已发布文档的标题
async fn search_documents(db: &DatabaseConnection, pattern: &str) -> Result<Vec<DocumentHit>, AppError> {
    let rows = documents::Entity::find()
        .filter(documents::Column::Status.eq(PublicationStatus::Published))
        .filter(folded_like((documents::Entity, documents::Column::Title), pattern))
        .order_by_desc(documents::Column::PublishedAt)
        .limit(SEARCH_BUCKET_LIMIT)
        .all(db)
        .await?;
    let names = display_names(db, rows.iter().map(|d| d.author_id)).await?;

    Ok(rows
        .into_iter()
        .map(|d| DocumentHit {
            author: name_of(&names, d.author_id),
            content: excerpt(&d.content, SEARCH_EXCERPT_CHARS),
            url: format!("/documents/{}", d.id),
            id: d.id,
            title: d.title,
            published_at: d.published_at,
        })
        .collect())
}

async fn search_materials(db: &DatabaseConnection, pattern: &str) -> Result<Vec<MaterialHit>, AppError> {
    let rows = materials::Entity::find()
        .find_also_related(categories::Entity)
        .filter(folded_like((materials::Entity, materials::Column::Title), pattern))
        .order_by_desc(materials::Column::CreatedAt)
        .limit(SEARCH_BUCKET_LIMIT)
        .all(db)
        .await?;
    let names = display_names(db, rows.iter().map(|(m, _)| m.uploader_id)).await?;

    Ok(rows
        .into_iter()
        .map(|(m, category)| MaterialHit {
            uploader: name_of(&names, m.uploader_id),
            url: format!("/materials/{}", m.category_id),
            category_name: category.as_ref().map(|c| c.name.clone()),
            category_type: category.map(|c| c.kind),
            id: m.id,
            title: m.title,
            file_type: m.file_type,
            file_url: m.file_url,
            file_size: m.file_size,
            category_id: m.category_id,
            created_at: m.created_at,
        })
        .collect())
}

async fn search_categories(db: &DatabaseConnection, pattern: &str) -> Result<Vec<CategoryHit>, AppError> {
    let rows = categories::Entity::find()
        .filter(
            Condition::any()
                .add(folded_like((categories::Entity, categories::Column::Name), pattern))
                .add(folded_like((categories::Entity, categories::Column::Description), pattern)),
        )
        .order_by_desc(categories::Column::CreatedAt)
        .limit(SEARCH_BUCKET_LIMIT)
        .all(db)
        .await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let counts = material_counts(db).await?;
    let names = display_names(db, rows.iter().map(|c| c.creator_id)).await?;

    Ok(rows
        .into_iter()
        .map(|c| CategoryHit {
            creator: name_of(&names, c.creator_id),
            material_count: counts.get(&c.id).copied().unwrap_or(0),
            url: format!("/materials/{}", c.id),
            id: c.id,
            name: c.name,
            description: c.description,
            category_type: c.kind,
            created_at: c.created_at,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use uuid::Uuid;

    #[test]
    fn wildcards_are_escaped() {
        assert_eq!(like_pattern(" 党史 "), "%党史%");
        assert_eq!(like_pattern("100%_A"), r"%100\%\_a%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
    }

    #[test]
    fn scope_parsing() {
        assert_eq!(SearchScope::parse(None), SearchScope::All);
        assert_eq!(SearchScope::parse(Some("materials")), SearchScope::Materials);
        assert_eq!(SearchScope::parse(Some("nonsense")), SearchScope::All);
        assert!(SearchScope::All.includes(SearchScope::Documents));
        assert!(!SearchScope::Community.includes(SearchScope::Documents));
    }

    #[test]
    fn excerpt_counts_characters_not_bytes() {
        let text = "学".repeat(300);
        assert_eq!(excerpt(&text, SEARCH_EXCERPT_CHARS).chars().count(), 200);
        assert_eq!(excerpt("短", SEARCH_EXCERPT_CHARS), "短");
    }

    #[test]
    fn title_match_is_case_folded() {
        let sql = documents::Entity::find()
            .filter(folded_like((documents::Entity, documents::Column::Title), &like_pattern("CPC")))
            .build(DatabaseBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#"LOWER("documents"."title") LIKE '%cpc%'"#));
    }

    #[tokio::test]
    async fn blank_query_returns_empty_buckets_without_queries() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let results = search(&db, Some("   "), SearchScope::All).await.unwrap();
        assert!(results.community.is_empty() && results.documents.is_empty());
        assert!(results.materials.is_empty() && results.categories.is_empty());
    }

    #[tokio::test]
    async fn documents_scope_only_hits_documents() {
        let author = Uuid::new_v4();
        let now = Utc::now().fixed_offset();
        let doc = documents::Model {
            id: Uuid::new_v4(),
            title: "党课笔记".to_string(),
            content: "内容".repeat(150),
            status: PublicationStatus::Published,
            author_id: author,
            created_at: now,
            published_at: Some(now),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[doc.clone()]])
            .append_query_results([[crate::services::user::test_user(author, "li", Some("小李"))]])
            .into_connection();

        let results = search(&db, Some("党课"), SearchScope::Documents).await.unwrap();
        assert_eq!(results.documents.len(), 1);
        assert_eq!(results.documents[0].author, "小李");
        assert_eq!(results.documents[0].content.chars().count(), 200);
        assert_eq!(results.documents[0].url, format!("/documents/{}", doc.id));
        assert!(results.community.is_empty());
    }
}
