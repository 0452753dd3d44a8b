//! 会话状态机：问候 → 监听 → 分发 → 监听 / 结束。

use crate::action::{Services, SERVICE_ERROR_MESSAGE};
use crate::capture::CaptureError;
use crate::engine::{unrecognized_message, Dispatch, Engine};
use chrono::{Local, Timelike};
use std::time::Duration;

pub const GOODBYE: &str = "Goodbye!";

/// 识别服务连续失败时的首次等待
pub const RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// 第 n 次连续失败后的等待：指数增长，封顶 30 秒
pub fn backoff_delay(failures: u32, base: Duration) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }
    let factor = 1u32 << (failures - 1).min(5);
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Greeting,
    Listening,
    /// 携带本轮采集到的原始文本
    Dispatching(Option<String>),
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Salutation {
    Morning,
    Afternoon,
    Evening,
}

impl Salutation {
    /// [0,12) 上午，[12,16) 下午，其余为晚上
    pub fn for_hour(hour: u32) -> Self {
        match hour {
            0..=11 => Salutation::Morning,
            12..=15 => Salutation::Afternoon,
            _ => Salutation::Evening,
        }
    }
}

pub fn greeting(hour: u32, title: &str) -> String {
    match Salutation::for_hour(hour) {
        Salutation::Morning => format!("Good morning {title}, How can I assist you?"),
        Salutation::Afternoon => format!("Good afternoon {title}. How can I assist you?"),
        Salutation::Evening => format!("Good evening {title}, How can I help you?"),
    }
}

pub struct Session {
    engine: Engine,
    services: Services,
    state: SessionState,
    /// 连续的识别服务失败次数
    failures: u32,
    retry_delay: Duration,
}

impl Session {
    pub fn new(engine: Engine, services: Services) -> Self {
        Self {
            engine,
            services,
            state: SessionState::Greeting,
            failures: 0,
            retry_delay: RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// 推进一步，返回新状态
    pub fn step(&mut self) -> &SessionState {
        let state = std::mem::replace(&mut self.state, SessionState::Terminated);
        self.state = match state {
            SessionState::Greeting => {
                let message = greeting(Local::now().hour(), &self.engine.settings().title);
                self.services.output.say(&message);
                SessionState::Listening
            }
            SessionState::Listening => self.listen(),
            SessionState::Dispatching(utterance) => self.dispatch(utterance),
            SessionState::Terminated => SessionState::Terminated,
        };
        &self.state
    }

    /// 一直运行到结束
    pub fn run(&mut self) {
        log::info!("会话开始");
        while self.step() != &SessionState::Terminated {}
        log::info!("会话结束");
    }

    fn listen(&mut self) -> SessionState {
        let settings = self.engine.settings();
        match self
            .services
            .capture
            .capture(settings.timeout, settings.phrase_limit)
        {
            Ok(utterance) => {
                self.failures = 0;
                SessionState::Dispatching(utterance)
            }
            Err(CaptureError::Closed) => {
                log::info!("输入源已关闭");
                SessionState::Terminated
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                // 同一轮故障只播报一次
                if self.failures == 1 {
                    self.services.output.say(SERVICE_ERROR_MESSAGE);
                }
                let delay = backoff_delay(self.failures, self.retry_delay);
                log::error!("{e}，第 {} 次，{}ms 后重试", self.failures, delay.as_millis());
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                SessionState::Listening
            }
        }
    }

    fn dispatch(&mut self, utterance: Option<String>) -> SessionState {
        let raw = utterance.as_deref();
        match self.engine.dispatch(raw, &mut self.services) {
            Dispatch::Terminate => {
                self.services.output.say(GOODBYE);
                SessionState::Terminated
            }
            Dispatch::Done(result) => {
                if let Some(message) = &result.spoken {
                    self.services.output.say(message);
                } else if !result.handled {
                    if let Some(text) = raw.map(str::trim).filter(|t| !t.is_empty()) {
                        self.services.output.say(&unrecognized_message(text));
                    }
                }
                SessionState::Listening
            }
        }
    }
}
