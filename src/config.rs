use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "voice-assistant";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub tables: TablesConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub news: NewsConfig,
    /// 语音指令 → 快捷键映射，如 "save file" = "CTRL+S"
    #[serde(default)]
    pub voice_commands: HashMap<String, String>,
}

/// 语音识别服务
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
    pub asr_config_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    /// 麦克风 + VAD + ASR
    Microphone,
    /// 从终端逐行读取
    Console,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_capture_source")]
    pub source: CaptureSource,
    /// 等待开口的超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 单句最长时长（秒）
    #[serde(default = "default_phrase_limit_secs")]
    pub phrase_limit_secs: u64,
    /// RMS 能量阈值
    #[serde(default = "default_speech_threshold")]
    pub speech_threshold: f32,
    /// 静音超时（毫秒）
    #[serde(default = "default_silence_timeout")]
    pub silence_timeout_ms: u64,
    /// 最短语音段（毫秒）
    #[serde(default = "default_min_speech_duration")]
    pub min_speech_duration_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// 是否使用剪贴板粘贴代替逐字输入
    #[serde(default)]
    pub use_clipboard: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// 外部 TTS 命令，播报文本追加为最后一个参数；为空则只打印
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// 对用户的称呼
    #[serde(default = "default_title")]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    #[serde(default = "default_applications_path")]
    pub applications: PathBuf,
    #[serde(default = "default_responses_path")]
    pub responses: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// 文件搜索起点
    #[serde(default = "default_search_root")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_news_country")]
    pub country: String,
}

fn default_capture_source() -> CaptureSource {
    CaptureSource::Microphone
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_phrase_limit_secs() -> u64 {
    5
}
fn default_speech_threshold() -> f32 {
    0.03
}
fn default_silence_timeout() -> u64 {
    800
}
fn default_min_speech_duration() -> u64 {
    300
}
fn default_title() -> String {
    "Sir".to_string()
}
fn default_applications_path() -> PathBuf {
    app_dir().join("applications.json")
}
fn default_responses_path() -> PathBuf {
    app_dir().join("responses.json")
}
fn default_search_root() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}
fn default_news_country() -> String {
    "us".to_string()
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: default_capture_source(),
            timeout_secs: default_timeout_secs(),
            phrase_limit_secs: default_phrase_limit_secs(),
            speech_threshold: default_speech_threshold(),
            silence_timeout_ms: default_silence_timeout(),
            min_speech_duration_ms: default_min_speech_duration(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
        }
    }
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            applications: default_applications_path(),
            responses: default_responses_path(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            root: default_search_root(),
        }
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            country: default_news_country(),
        }
    }
}

/// 配置与规则表所在目录
pub fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// 获取配置文件路径
pub fn config_path() -> PathBuf {
    app_dir().join("config.toml")
}

/// 加载配置，文件不存在则创建默认配置
pub fn load_config(path: &Path) -> Result<AppConfig, String> {
    if path.exists() {
        let content = fs::read_to_string(path).map_err(|e| format!("读取配置失败: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("解析配置失败: {e}"))
    } else {
        let config = default_config();
        save_config(path, &config)?;
        log::info!("已创建默认配置: {}", path.display());
        Ok(config)
    }
}

/// 保存配置到文件
pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("创建配置目录失败: {e}"))?;
    }
    let content = toml::to_string_pretty(config).map_err(|e| format!("序列化配置失败: {e}"))?;
    fs::write(path, content).map_err(|e| format!("写入配置失败: {e}"))?;
    Ok(())
}

/// 默认配置
pub fn default_config() -> AppConfig {
    let mut voice_commands = HashMap::new();
    voice_commands.insert("save file".to_string(), "CTRL+S".to_string());
    voice_commands.insert("select all".to_string(), "CTRL+A".to_string());
    voice_commands.insert("copy that".to_string(), "CTRL+C".to_string());
    voice_commands.insert("paste that".to_string(), "CTRL+V".to_string());
    voice_commands.insert("undo that".to_string(), "CTRL+Z".to_string());
    voice_commands.insert("refresh page".to_string(), "F5".to_string());

    AppConfig {
        server: ServerConfig {
            url: "http://127.0.0.1:3000".to_string(),
            asr_config_id: "your-asr-config-id".to_string(),
        },
        capture: CaptureConfig::default(),
        input: InputConfig::default(),
        speech: SpeechConfig::default(),
        assistant: AssistantConfig::default(),
        tables: TablesConfig::default(),
        search: SearchConfig::default(),
        news: NewsConfig::default(),
        voice_commands,
    }
}
