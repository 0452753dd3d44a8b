//! 联网查询：维基百科摘要与新闻头条。

use crate::config::NewsConfig;
use serde::Deserialize;
use tokio::runtime::Runtime;

/// 维基百科查询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicSummary {
    Found(String),
    /// 消歧义页，话题太宽泛
    Ambiguous,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Headlines {
    Articles(Vec<String>),
    NotConfigured,
}

pub trait Lookup {
    fn summary(&mut self, topic: &str) -> Result<TopicSummary, String>;
    fn headlines(&mut self) -> Result<Headlines, String>;
}

const WIKIPEDIA_SUMMARY_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";
const NEWS_URL: &str = "https://newsapi.org/v2/top-headlines";
const SUMMARY_SENTENCES: usize = 3;
const HEADLINE_COUNT: usize = 10;

#[derive(Debug, Deserialize)]
struct WikiSummary {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    extract: String,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    status: String,
    #[serde(default)]
    articles: Vec<NewsArticle>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsArticle {
    title: Option<String>,
}

/// 基于 reqwest 的查询实现，异步请求在私有运行时上阻塞执行
pub struct WebLookup {
    runtime: Runtime,
    client: reqwest::Client,
    news: NewsConfig,
}

impl WebLookup {
    pub fn new(news: NewsConfig) -> Result<Self, String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("创建运行时失败: {e}"))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("voice-assistant/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| format!("创建 HTTP 客户端失败: {e}"))?;
        Ok(Self {
            runtime,
            client,
            news,
        })
    }
}

impl Lookup for WebLookup {
    fn summary(&mut self, topic: &str) -> Result<TopicSummary, String> {
        let title = topic.trim().replace(' ', "_");
        let url = format!("{WIKIPEDIA_SUMMARY_URL}/{}", urlencoding::encode(&title));
        let client = self.client.clone();

        self.runtime.block_on(async move {
            let resp = client
                .get(&url)
                .send()
                .await
                .map_err(|e| format!("维基百科请求失败: {e}"))?;
            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(TopicSummary::NotFound);
            }
            if !resp.status().is_success() {
                return Err(format!("维基百科返回错误状态: {}", resp.status()));
            }
            let body: WikiSummary = resp
                .json()
                .await
                .map_err(|e| format!("解析维基百科响应失败: {e}"))?;
            Ok(interpret_summary(body))
        })
    }

    fn headlines(&mut self) -> Result<Headlines, String> {
        let Some(api_key) = self.news.api_key.clone().filter(|k| !k.trim().is_empty()) else {
            return Ok(Headlines::NotConfigured);
        };
        let client = self.client.clone();
        let country = self.news.country.clone();
        let page_size = HEADLINE_COUNT.to_string();

        self.runtime.block_on(async move {
            let resp = client
                .get(NEWS_URL)
                .query(&[
                    ("country", country.as_str()),
                    ("pageSize", page_size.as_str()),
                    ("apiKey", api_key.as_str()),
                ])
                .send()
                .await
                .map_err(|e| format!("新闻请求失败: {e}"))?;
            let body: NewsResponse = resp
                .json()
                .await
                .map_err(|e| format!("解析新闻响应失败: {e}"))?;
            interpret_news(body)
        })
    }
}

fn interpret_summary(body: WikiSummary) -> TopicSummary {
    if body.kind == "disambiguation" {
        return TopicSummary::Ambiguous;
    }
    let text = first_sentences(&body.extract, SUMMARY_SENTENCES);
    if text.is_empty() {
        TopicSummary::NotFound
    } else {
        TopicSummary::Found(text)
    }
}

fn interpret_news(body: NewsResponse) -> Result<Headlines, String> {
    if body.status != "ok" {
        return Err(format!(
            "新闻接口返回 {}: {}",
            body.status,
            body.message.unwrap_or_default()
        ));
    }
    Ok(Headlines::Articles(
        body.articles
            .into_iter()
            .filter_map(|a| a.title)
            .filter(|t| !t.trim().is_empty())
            .take(HEADLINE_COUNT)
            .collect(),
    ))
}

/// 取前 n 句（以 ". " / "! " / "? " 或结尾为句界）
pub fn first_sentences(text: &str, n: usize) -> String {
    let text = text.trim();
    let mut end = text.len();
    let mut count = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                count += 1;
                if count == n {
                    end = i + c.len_utf8();
                    break;
                }
            }
        }
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_three_sentences() {
        let text = "Rust is a language. It is fast. It is safe. It has a crab. More text.";
        assert_eq!(
            first_sentences(text, 3),
            "Rust is a language. It is fast. It is safe."
        );
    }

    #[test]
    fn decimals_do_not_split_sentences() {
        let text = "Version 1.75 shipped. Then 1.76 followed.";
        assert_eq!(first_sentences(text, 1), "Version 1.75 shipped.");
    }

    #[test]
    fn short_text_is_returned_whole() {
        assert_eq!(first_sentences("  Only one  ", 3), "Only one");
    }

    #[test]
    fn disambiguation_pages_are_ambiguous() {
        let body: WikiSummary = serde_json::from_str(
            r#"{"type": "disambiguation", "extract": "Mercury may refer to:"}"#,
        )
        .expect("json");
        assert_eq!(interpret_summary(body), TopicSummary::Ambiguous);
    }

    #[test]
    fn standard_page_is_found() {
        let body: WikiSummary = serde_json::from_str(
            r#"{"type": "standard", "extract": "Ferris is a crab. He is orange."}"#,
        )
        .expect("json");
        assert_eq!(
            interpret_summary(body),
            TopicSummary::Found("Ferris is a crab. He is orange.".to_string())
        );
    }

    #[test]
    fn news_titles_are_collected() {
        let body: NewsResponse = serde_json::from_str(
            r#"{"status": "ok", "articles": [{"title": "A"}, {"title": null}, {"title": "B"}]}"#,
        )
        .expect("json");
        assert_eq!(
            interpret_news(body).expect("ok"),
            Headlines::Articles(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn news_error_status_is_reported() {
        let body: NewsResponse = serde_json::from_str(
            r#"{"status": "error", "message": "apiKeyInvalid"}"#,
        )
        .expect("json");
        assert!(interpret_news(body).unwrap_err().contains("apiKeyInvalid"));
    }
}
