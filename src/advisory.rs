//! 远程诊断 - 把各车轮的摆动结果交给文本生成服务, 获取处理建议
//!
//! 仅在用户请求时调用, 不参与逐帧处理.

use std::fmt::Write;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::WobbleSettings;
use crate::detection::TargetResult;
use crate::error::{Result, WobbleError};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const NO_WHEELS_MESSAGE: &str = "No wheels were detected, so no diagnosis can be provided.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// 生成诊断提示词
pub fn build_prompt(targets: &[TargetResult], settings: &WobbleSettings) -> String {
    let mut details = String::new();
    for t in targets {
        let _ = writeln!(
            details,
            "- Wheel {}: Wobble of {:.2} mm (Status: {})",
            t.id,
            t.wobble_mm,
            t.status.as_str().to_uppercase()
        );
    }

    format!(
        "You are an expert mechanical engineer advising a foundry operator.\n\
         Your task is to analyze real-time data from a centrifuge's wheel wobble detection system \
         and provide a clear, concise diagnosis and action plan.\n\
         \n\
         **System Data:**\n\
         - Wobble Tolerance Threshold: {:.2} mm\n\
         - Detected Wheels Data:\n\
         {}\n\
         **Your Analysis:**\n\
         Based on the data above, provide a brief diagnosis.\n\
         - Identify which wheels are performing normally, which are marginal (warning), and which are critical (alert).\n\
         - For any wheel exceeding the tolerance, state the likely cause (e.g., bearing wear, misalignment, debris).\n\
         - Recommend a clear, prioritized course of action for the operator. Be direct and focus on safety and operational integrity.\n\
         - Keep the entire response under 100 words.\n",
        settings.wobble_tolerance_mm, details
    )
}

// ========== generateContent 请求/响应 ==========

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
    }
}

/// 诊断客户端
#[derive(Clone, Debug)]
pub struct DiagnosisClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl DiagnosisClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
        }
    }

    /// 从环境变量 GEMINI_API_KEY / API_KEY 读取密钥
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::new(DEFAULT_ENDPOINT, DEFAULT_MODEL, api_key)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    /// 请求诊断 (阻塞)
    pub fn diagnose(&self, targets: &[TargetResult], settings: &WobbleSettings) -> Result<String> {
        if targets.is_empty() {
            return Ok(NO_WHEELS_MESSAGE.to_string());
        }
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            WobbleError::Advisory("API key is not configured. Cannot get diagnosis.".into())
        })?;

        let prompt = build_prompt(targets, settings);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
        };

        info!("🤖 请求诊断: {} 个车轮 → {}", targets.len(), self.model);
        let response = ureq::post(&self.url())
            .timeout(REQUEST_TIMEOUT)
            .set("x-goog-api-key", api_key)
            .send_json(&body);

        match response {
            Ok(resp) => {
                let reply: GenerateResponse = resp.into_json().map_err(|e| {
                    WobbleError::Advisory(format!("malformed diagnosis reply: {}", e))
                })?;
                reply
                    .first_text()
                    .ok_or_else(|| WobbleError::Advisory("diagnosis reply has no text".into()))
            }
            Err(ureq::Error::Status(code, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                error!("❌ 诊断服务返回 {}: {}", code, text);
                Err(classify_status(code, &text))
            }
            Err(e) => {
                error!("❌ 诊断请求失败: {}", e);
                Err(WobbleError::Advisory(
                    "Failed to communicate with the AI for diagnosis.".into(),
                ))
            }
        }
    }
}

fn classify_status(code: u16, body: &str) -> WobbleError {
    if matches!(code, 400 | 401 | 403) && body.contains("API key not valid") {
        WobbleError::Advisory(
            "The configured API key is invalid. Please check your configuration.".into(),
        )
    } else {
        WobbleError::Advisory("Failed to communicate with the AI for diagnosis.".into())
    }
}
