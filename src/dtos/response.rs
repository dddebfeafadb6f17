use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// 统一响应外壳：`{ code, msg, data }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn with_data(data: T) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            msg: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn with_code(code: StatusCode, msg: &str, data: Option<T>) -> Self {
        Self {
            code: code.as_u16(),
            msg: msg.to_string(),
            data,
        }
    }
}

impl ApiResponse<()> {
    pub fn with_message(msg: &str) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            msg: msg.to_string(),
            data: None,
        }
    }

    pub fn with_error(code: StatusCode, msg: &str) -> Self {
        Self {
            code: code.as_u16(),
            msg: msg.to_string(),
            data: None,
        }
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_omits_missing_data() {
        let body = serde_json::to_value(ApiResponse::<()>::with_error(StatusCode::NOT_FOUND, "文档不存在")).unwrap();
        assert_eq!(body, serde_json::json!({ "code": 404, "msg": "文档不存在" }));

        let body = serde_json::to_value(ApiResponse::with_data(vec![1, 2])).unwrap();
        assert_eq!(body["data"], serde_json::json!([1, 2]));
        assert_eq!(body["code"], 200);
    }

    #[test]
    fn created_status_is_preserved() {
        let resp = ApiResponse::<()>::with_code(StatusCode::CREATED, "ok", None).into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
}
