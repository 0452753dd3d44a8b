//! 单元测试用的假实现，所有调用记入同一份日志。

use crate::action::{ActionContext, HandlerSettings, Services};
use crate::capture::{Capture, CaptureError};
use crate::desktop::{Desktop, SystemCommand, SystemStatus};
use crate::lookup::{Headlines, Lookup, TopicSummary};
use crate::speech::Output;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

#[derive(Default)]
struct FakeState {
    events: Vec<String>,
    /// 采集脚本；耗尽后返回 Closed
    script: VecDeque<Result<Option<String>, CaptureError>>,
    summary: Option<TopicSummary>,
    headlines: Option<Headlines>,
    status: Option<SystemStatus>,
    desktop_fails: bool,
}

type Shared = Rc<RefCell<FakeState>>;

struct ScriptedCapture(Shared);

impl Capture for ScriptedCapture {
    fn capture(&mut self, _: Duration, _: Duration) -> Result<Option<String>, CaptureError> {
        self.0
            .borrow_mut()
            .script
            .pop_front()
            .unwrap_or(Err(CaptureError::Closed))
    }
}

struct RecordingOutput(Shared);

impl Output for RecordingOutput {
    fn say(&mut self, text: &str) {
        self.0.borrow_mut().events.push(format!("say:{text}"));
    }
}

struct FakeDesktop(Shared);

impl FakeDesktop {
    fn record(&mut self, event: String) -> Result<(), String> {
        let mut state = self.0.borrow_mut();
        if state.desktop_fails {
            return Err("fake failure".to_string());
        }
        state.events.push(event);
        Ok(())
    }
}

impl Desktop for FakeDesktop {
    fn launch(&mut self, path: &Path) -> Result<(), String> {
        self.record(format!("launch:{}", path.display()))
    }

    fn open_url(&mut self, url: &str) -> Result<(), String> {
        self.record(format!("url:{url}"))
    }

    fn send_keys(&mut self, shortcut: &str) -> Result<(), String> {
        self.record(format!("keys:{shortcut}"))
    }

    fn scroll(&mut self, lines: i32) -> Result<(), String> {
        self.record(format!("scroll:{lines}"))
    }

    fn type_text(&mut self, text: &str) -> Result<(), String> {
        self.record(format!("type:{text}"))
    }

    fn run(&mut self, command: SystemCommand) -> Result<(), String> {
        self.record(format!("run:{command:?}"))
    }

    fn status(&mut self) -> Result<SystemStatus, String> {
        let state = self.0.borrow();
        if state.desktop_fails {
            return Err("fake failure".to_string());
        }
        state.status.ok_or_else(|| "no status".to_string())
    }
}

struct FakeLookup(Shared);

impl Lookup for FakeLookup {
    fn summary(&mut self, topic: &str) -> Result<TopicSummary, String> {
        let mut state = self.0.borrow_mut();
        state.events.push(format!("lookup:{topic}"));
        Ok(state.summary.clone().unwrap_or(TopicSummary::NotFound))
    }

    fn headlines(&mut self) -> Result<Headlines, String> {
        Ok(self
            .0
            .borrow()
            .headlines
            .clone()
            .unwrap_or(Headlines::NotConfigured))
    }
}

pub struct FakeServices {
    pub services: Services,
    state: Shared,
}

impl FakeServices {
    /// 每条回复对应一次成功采集
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::scripted(replies.into_iter().map(|r| Ok(Some(r.into()))))
    }

    pub fn scripted(script: impl IntoIterator<Item = Result<Option<String>, CaptureError>>) -> Self {
        let state: Shared = Rc::new(RefCell::new(FakeState {
            script: script.into_iter().collect(),
            ..FakeState::default()
        }));
        let services = Services {
            capture: Box::new(ScriptedCapture(state.clone())),
            output: Box::new(RecordingOutput(state.clone())),
            desktop: Box::new(FakeDesktop(state.clone())),
            lookup: Box::new(FakeLookup(state.clone())),
        };
        Self { services, state }
    }

    pub fn context<'a>(&'a mut self, settings: &'a HandlerSettings) -> ActionContext<'a> {
        ActionContext {
            services: &mut self.services,
            settings,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.state.borrow().events.clone()
    }

    /// services 被移走后仍可读取日志
    pub fn shared_events(&self) -> impl Fn() -> Vec<String> {
        let state = self.state.clone();
        move || state.borrow().events.clone()
    }

    pub fn set_summary(&mut self, summary: TopicSummary) {
        self.state.borrow_mut().summary = Some(summary);
    }

    pub fn set_headlines(&mut self, headlines: Headlines) {
        self.state.borrow_mut().headlines = Some(headlines);
    }

    pub fn set_status(&mut self, status: SystemStatus) {
        self.state.borrow_mut().status = Some(status);
    }

    pub fn fail_desktop(&mut self) {
        self.state.borrow_mut().desktop_fails = true;
    }
}
