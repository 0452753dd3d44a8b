use crate::capture::{Capture, CaptureError};
use crate::desktop::Desktop;
use crate::lookup::Lookup;
use crate::normalize::normalize;
use crate::speech::Output;
use std::path::PathBuf;
use std::time::Duration;

/// 识别服务异常时的提示
pub const SERVICE_ERROR_MESSAGE: &str =
    "There seems to be an issue with the speech recognition service.";

/// 处理结果的副作用类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    None,
    AppLaunch,
    SystemCommand,
    WindowOp,
    MediaKey,
    WebOpen,
    FileSearch,
    StatusReport,
    Lookup,
    Typing,
    Shortcut,
}

/// 一次分发的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub handled: bool,
    /// 需要播报给用户的内容
    pub spoken: Option<String>,
    pub side_effect: SideEffect,
}

impl ActionResult {
    pub fn unhandled() -> Self {
        Self {
            handled: false,
            spoken: None,
            side_effect: SideEffect::None,
        }
    }

    pub fn done(side_effect: SideEffect, spoken: impl Into<String>) -> Self {
        Self {
            handled: true,
            spoken: Some(spoken.into()),
            side_effect,
        }
    }

    /// 已处理，处理器自行播报过
    pub fn silent(side_effect: SideEffect) -> Self {
        Self {
            handled: true,
            spoken: None,
            side_effect,
        }
    }
}

/// 引擎之外的协作方：采集、播报、桌面操作、联网查询
pub struct Services {
    pub capture: Box<dyn Capture>,
    pub output: Box<dyn Output>,
    pub desktop: Box<dyn Desktop>,
    pub lookup: Box<dyn Lookup>,
}

impl Services {
    /// 采集一句话；超时、听不清、输入结束都视为没有输入，服务异常会提示用户
    pub fn listen(&mut self, timeout: Duration, phrase_limit: Duration) -> Option<String> {
        match self.capture.capture(timeout, phrase_limit) {
            Ok(Some(text)) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(CaptureError::Closed) => None,
            Err(e) => {
                log::error!("{e}");
                self.output.say(SERVICE_ERROR_MESSAGE);
                None
            }
        }
    }
}

/// 处理器运行参数
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub timeout: Duration,
    pub phrase_limit: Duration,
    /// 文件搜索起点
    pub search_root: PathBuf,
    /// 对用户的称呼
    pub title: String,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            phrase_limit: Duration::from_secs(5),
            search_root: PathBuf::from("."),
            title: "Sir".to_string(),
        }
    }
}

/// 传给处理器的上下文
pub struct ActionContext<'a> {
    pub services: &'a mut Services,
    pub settings: &'a HandlerSettings,
}

impl ActionContext<'_> {
    pub fn say(&mut self, text: &str) {
        self.services.output.say(text);
    }

    /// 追问一句并同步等待回答（不会重新进入分发）
    pub fn ask(&mut self, question: &str) -> Option<String> {
        self.say(question);
        self.services
            .listen(self.settings.timeout, self.settings.phrase_limit)
            .map(|answer| normalize(&answer))
            .filter(|answer| !answer.is_empty())
    }
}
