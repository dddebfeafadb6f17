use serde::{Deserialize, Serialize};

fn yes() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// 请求里直接带的 Key，优先级最高
    pub api_key: Option<String>,
    #[serde(default = "yes")]
    pub stream: bool,
}

#[derive(Serialize, Debug)]
pub struct ChatReply {
    pub reply: String,
}

/// 导出 PDF 前的排版优化
#[derive(Deserialize)]
pub struct OptimizeRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "yes")]
    pub stream: bool,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedDocument {
    pub optimized_content: String,
    pub title: String,
}

/// 发往 OpenAI 兼容接口的消息
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Serialize, Debug)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

#[derive(Deserialize, Debug)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Deserialize, Debug)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Deserialize, Debug)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: String,
}
