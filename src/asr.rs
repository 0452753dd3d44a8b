use reqwest::multipart;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct AsrResponse {
    data: Option<AsrData>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AsrData {
    text: String,
}

/// 语音识别服务客户端
#[derive(Clone)]
pub struct AsrClient {
    client: reqwest::Client,
    endpoint: String,
    asr_config_id: String,
}

impl AsrClient {
    pub fn new(server_url: &str, asr_config_id: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint(server_url),
            asr_config_id: asr_config_id.to_string(),
        }
    }

    /// 上传 WAV 并返回识别文本
    pub async fn recognize(&self, wav_bytes: Vec<u8>) -> Result<String, String> {
        let file_part = multipart::Part::bytes(wav_bytes)
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| format!("构建 multipart 失败: {e}"))?;

        let form = multipart::Form::new()
            .part("file", file_part)
            .text("asrConfigId", self.asr_config_id.clone());

        let resp = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| format!("ASR 请求失败: {e}"))?;

        if !resp.status().is_success() {
            return Err(format!("ASR 返回错误状态: {}", resp.status()));
        }

        let body: AsrResponse = resp
            .json()
            .await
            .map_err(|e| format!("解析 ASR 响应失败: {e}"))?;
        recognized_text(body)
    }
}

fn endpoint(server_url: &str) -> String {
    format!("{}/api/tasks/asr-recognize/sync", server_url.trim_end_matches('/'))
}

fn recognized_text(body: AsrResponse) -> Result<String, String> {
    if let Some(err) = body.error {
        return Err(format!("ASR 错误: {err}"));
    }
    body.data
        .map(|d| d.text.trim().to_string())
        .ok_or_else(|| "ASR 响应中无 data 字段".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_ignores_trailing_slash() {
        assert_eq!(
            endpoint("http://asr.local:3000/"),
            "http://asr.local:3000/api/tasks/asr-recognize/sync"
        );
    }

    #[test]
    fn text_is_extracted_and_trimmed() {
        let body: AsrResponse =
            serde_json::from_str(r#"{"data": {"text": " Volume Up "}}"#).expect("json");
        assert_eq!(recognized_text(body).expect("text"), "Volume Up");
    }

    #[test]
    fn error_field_wins() {
        let body: AsrResponse =
            serde_json::from_str(r#"{"data": null, "error": "quota exceeded"}"#).expect("json");
        assert_eq!(recognized_text(body).unwrap_err(), "ASR 错误: quota exceeded");
    }

    #[test]
    fn missing_data_is_error() {
        let body: AsrResponse = serde_json::from_str("{}").expect("json");
        assert!(recognized_text(body).is_err());
    }
}
