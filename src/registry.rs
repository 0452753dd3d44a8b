//! 内置指令注册表。
//!
//! 注册顺序即优先级：按顺序检查触发条件，第一个命中的处理器执行后立即停止。
//! 多个触发条件可能同时命中同一句话（如 "system settings" 同时包含 "system"），
//! 因此顺序本身就是行为的一部分，改动时需要同步更新测试。

use crate::action::{ActionContext, ActionResult};
use crate::file_search::FileKind;
use crate::handlers;

/// 结束会话的触发词，优先于所有规则
pub const TERMINATION_TRIGGERS: &[&str] = &["exit", "quit", "stop"];

pub fn is_termination(text: &str) -> bool {
    TERMINATION_TRIGGERS.iter().any(|t| text.contains(t))
}

pub type Handler = fn(&str, &mut ActionContext<'_>) -> ActionResult;

/// 作用于规范化文本的触发条件
#[derive(Debug, Clone, Copy)]
pub enum Trigger {
    /// 包含任一子串
    Any(&'static [&'static str]),
    /// 以该前缀开头
    Prefix(&'static str),
}

impl Trigger {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Trigger::Any(phrases) => phrases.iter().any(|p| text.contains(p)),
            Trigger::Prefix(prefix) => text.starts_with(prefix),
        }
    }
}

pub struct ActionRule {
    pub name: &'static str,
    pub trigger: Trigger,
    pub handler: Handler,
}

#[derive(Default)]
pub struct ActionRegistry {
    rules: Vec<ActionRule>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, trigger: Trigger, handler: Handler) -> &mut Self {
        self.rules.push(ActionRule {
            name,
            trigger,
            handler,
        });
        self
    }

    /// 按注册顺序找第一条命中的规则
    pub fn first_match(&self, text: &str) -> Option<&ActionRule> {
        self.rules.iter().find(|rule| rule.trigger.matches(text))
    }

    pub fn rules(&self) -> &[ActionRule] {
        &self.rules
    }

    /// 内置规则
    pub fn builtin() -> Self {
        use handlers as h;
        use Trigger::{Any, Prefix};

        let mut r = Self::new();
        r.register("type_text", Prefix("type "), h::type_text)
            .register("topic_summary", Any(&["tell me about", "about"]), h::topic_summary)
            .register("wikipedia", Any(&["wikipedia"]), h::wikipedia)
            .register("news", Any(&["latest news", "top news"]), h::news)
            .register("google_search", Any(&["google"]), h::google_search)
            .register("youtube_search", Any(&["youtube"]), h::youtube_search)
            .register("search_video", Any(&["search video"]), |t, c| {
                h::search_files(t, c, FileKind::Video)
            })
            .register("search_audio", Any(&["search audio"]), |t, c| {
                h::search_files(t, c, FileKind::Audio)
            })
            .register("search_document", Any(&["search document"]), |t, c| {
                h::search_files(t, c, FileKind::Document)
            })
            .register("search_image", Any(&["search image"]), |t, c| {
                h::search_files(t, c, FileKind::Image)
            })
            .register(
                "system_condition",
                Any(&["system condition", "condition of the system"]),
                h::system_condition,
            )
            .register("close_tab", Any(&["close tab"]), h::close_tab)
            .register("new_tab", Any(&["new tab"]), h::new_tab)
            .register("volume_up", Any(&["volume up", "increase volume"]), h::volume_up)
            .register("volume_down", Any(&["volume down", "decrease volume"]), h::volume_down)
            .register("volume_mute", Any(&["volume mute", "mute the sound"]), h::volume_mute)
            .register("screenshot", Any(&["take screenshot", "screenshot"]), h::screenshot)
            .register(
                "current_time",
                Any(&["current time", "what is the time", "time please", "present time"]),
                h::current_time,
            )
            .register(
                "current_date",
                Any(&["what day is today", "tell me the date", "today's date"]),
                h::current_date,
            )
            .register("zoom_in", Any(&["zoom in"]), h::zoom_in)
            .register("zoom_out", Any(&["zoom out"]), h::zoom_out)
            .register("scroll_down", Any(&["scroll down"]), h::scroll_down)
            .register("scroll_up", Any(&["scroll up"]), h::scroll_up)
            .register("scroll_bottom", Any(&["scroll at the bottom"]), h::scroll_bottom)
            .register("scroll_top", Any(&["scroll at the top"]), h::scroll_top)
            .register(
                "minimize_window",
                Any(&["minimise window", "minimize window"]),
                h::minimize_window,
            )
            .register(
                "maximize_window",
                Any(&["maximize window", "maximise window"]),
                h::maximize_window,
            )
            .register("close_window", Any(&["close window"]), h::close_window)
            .register("lock_screen", Any(&["lock screen"]), h::lock_screen)
            .register("start_menu", Any(&["start menu"]), h::start_menu)
            .register("control_panel", Any(&["control panel"]), h::control_panel)
            .register(
                "next_window",
                Any(&["switch to next window", "next window"]),
                h::next_window,
            )
            .register("toggle_full_screen", Any(&["toggle full screen"]), h::toggle_full_screen)
            .register("enable_bluetooth", Any(&["enable bluetooth"]), h::bluetooth_settings)
            .register("disable_bluetooth", Any(&["disable bluetooth"]), h::bluetooth_settings)
            .register("previous_window", Any(&["previous window"]), h::previous_window)
            .register("power_options", Any(&["power options"]), h::power_options)
            .register("device_manager", Any(&["device manager"]), h::device_manager)
            .register("sound_settings", Any(&["sound settings", "sounds"]), h::sound_settings)
            .register("system_settings", Any(&["system settings", "system"]), h::system_settings)
            .register("my_computer", Any(&["my computer", "this pc"]), h::my_computer)
            .register("task_manager", Any(&["task manager"]), h::task_manager);
        r
    }
}
