//! 分发引擎：一句话 → 至多一个动作。
//!
//! 优先级依次为结束词、应用表、回复表、配置快捷键、内置注册表。

use crate::action::{ActionContext, ActionResult, HandlerSettings, Services, SideEffect};
use crate::normalize::normalize;
use crate::registry::{self, ActionRegistry};
use crate::rule_store::{RuleStore, StoreError, TableId};
use crate::voice_commands::VoiceCommandMatcher;
use std::path::Path;

/// 一次分发的结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// 命中结束词，会话应当结束
    Terminate,
    Done(ActionResult),
}

pub struct Engine {
    store: RuleStore,
    shortcuts: VoiceCommandMatcher,
    registry: ActionRegistry,
    settings: HandlerSettings,
}

impl Engine {
    pub fn new(
        store: RuleStore,
        shortcuts: VoiceCommandMatcher,
        registry: ActionRegistry,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            store,
            shortcuts,
            registry,
            settings,
        }
    }

    pub fn settings(&self) -> &HandlerSettings {
        &self.settings
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    pub fn add_rule(&mut self, table: TableId, trigger: &str, value: &str) -> Result<(), StoreError> {
        self.store.upsert(table, trigger, value)
    }

    pub fn dispatch(&self, raw: Option<&str>, services: &mut Services) -> Dispatch {
        let Some(raw) = raw else {
            return Dispatch::Done(ActionResult::unhandled());
        };
        let text = normalize(raw);
        if text.is_empty() {
            return Dispatch::Done(ActionResult::unhandled());
        }

        if registry::is_termination(&text) {
            log::info!("收到结束指令: {text}");
            return Dispatch::Terminate;
        }

        if let Some(path) = self.store.get(TableId::Applications, &text) {
            return Dispatch::Done(launch_application(&text, Path::new(path), services));
        }

        if let Some(response) = self.store.get(TableId::Responses, &text) {
            log::debug!("命中回复表: {text}");
            return Dispatch::Done(ActionResult::done(SideEffect::None, response));
        }

        if let Some(shortcut) = self.shortcuts.match_text(&text) {
            log::info!("语音指令 {text:?} -> {shortcut}");
            let result = match services.desktop.send_keys(shortcut) {
                Ok(()) => ActionResult::silent(SideEffect::Shortcut),
                Err(e) => {
                    log::error!("执行快捷键 {shortcut} 失败: {e}");
                    ActionResult::done(SideEffect::Shortcut, "I couldn't do that on this system.")
                }
            };
            return Dispatch::Done(result);
        }

        if let Some(rule) = self.registry.first_match(&text) {
            log::info!("命中内置规则 {}: {text}", rule.name);
            let mut ctx = ActionContext {
                services,
                settings: &self.settings,
            };
            return Dispatch::Done((rule.handler)(&text, &mut ctx));
        }

        log::debug!("未识别: {text}");
        Dispatch::Done(ActionResult::unhandled())
    }
}

fn launch_application(trigger: &str, path: &Path, services: &mut Services) -> ActionResult {
    if !path.exists() {
        log::warn!("{trigger} 的路径不存在: {}", path.display());
        return ActionResult::done(
            SideEffect::AppLaunch,
            format!("The path for {trigger} is invalid or the program is not installed."),
        );
    }
    match services.desktop.launch(path) {
        Ok(()) => {
            log::info!("启动 {trigger}: {}", path.display());
            ActionResult::done(SideEffect::AppLaunch, format!("Opening {trigger}."))
        }
        Err(e) => {
            log::error!("启动 {trigger} 失败: {e}");
            ActionResult::done(SideEffect::AppLaunch, format!("I couldn't open {trigger}."))
        }
    }
}

/// 未识别时的回显
pub fn unrecognized_message(utterance: &str) -> String {
    format!("I heard: {utterance}, but I don't recognize that as a valid request.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeServices;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn engine_in(dir: &TempDir) -> Engine {
        let store = RuleStore::open(
            dir.path().join("applications.json"),
            dir.path().join("responses.json"),
        );
        let mut shortcuts = HashMap::new();
        shortcuts.insert("save file".to_string(), "CTRL+S".to_string());
        Engine::new(
            store,
            VoiceCommandMatcher::new(shortcuts),
            ActionRegistry::builtin(),
            HandlerSettings::default(),
        )
    }

    fn done(dispatch: Dispatch) -> ActionResult {
        match dispatch {
            Dispatch::Done(result) => result,
            Dispatch::Terminate => panic!("unexpected termination"),
        }
    }

    #[test]
    fn empty_input_has_no_side_effects() {
        let dir = tempdir().expect("tempdir");
        let engine = engine_in(&dir);
        let mut fake = FakeServices::with_replies(Vec::<&str>::new());

        for raw in [None, Some(""), Some("   ")] {
            let result = done(engine.dispatch(raw, &mut fake.services));
            assert_eq!(result, ActionResult::unhandled());
        }
        assert!(fake.events().is_empty());
    }

    #[test]
    fn termination_wins_over_every_table() {
        let dir = tempdir().expect("tempdir");
        let mut engine = engine_in(&dir);
        engine
            .add_rule(TableId::Responses, "stop", "not this")
            .expect("upsert");
        let mut fake = FakeServices::with_replies(Vec::<&str>::new());

        assert_eq!(engine.dispatch(Some("Stop"), &mut fake.services), Dispatch::Terminate);
        assert_eq!(
            engine.dispatch(Some("please exit now"), &mut fake.services),
            Dispatch::Terminate
        );
        assert!(fake.events().is_empty());
    }

    #[test]
    fn application_launch_for_existing_path() {
        let dir = tempdir().expect("tempdir");
        let program = dir.path().join("calc");
        fs::write(&program, b"").expect("write");
        let mut engine = engine_in(&dir);
        engine
            .add_rule(TableId::Applications, "Calculator", &program.display().to_string())
            .expect("upsert");
        let mut fake = FakeServices::with_replies(Vec::<&str>::new());

        let result = done(engine.dispatch(Some("CALCULATOR"), &mut fake.services));
        assert_eq!(result.side_effect, SideEffect::AppLaunch);
        assert_eq!(result.spoken.as_deref(), Some("Opening calculator."));
        assert_eq!(fake.events(), vec![format!("launch:{}", program.display())]);
    }

    #[test]
    fn missing_application_path_does_not_fall_through() {
        let dir = tempdir().expect("tempdir");
        let mut engine = engine_in(&dir);
        // 同时命中内置规则 "system"，但应用表优先且不再继续
        engine
            .add_rule(TableId::Applications, "system", "/definitely/not/here")
            .expect("upsert");
        let mut fake = FakeServices::with_replies(Vec::<&str>::new());

        let result = done(engine.dispatch(Some("system"), &mut fake.services));
        assert!(result.handled);
        assert_eq!(
            result.spoken.as_deref(),
            Some("The path for system is invalid or the program is not installed.")
        );
        assert!(fake.events().is_empty());
    }

    #[test]
    fn launch_failure_is_reported() {
        let dir = tempdir().expect("tempdir");
        let program = dir.path().join("paint");
        fs::write(&program, b"").expect("write");
        let mut engine = engine_in(&dir);
        engine
            .add_rule(TableId::Applications, "paint", &program.display().to_string())
            .expect("upsert");
        let mut fake = FakeServices::with_replies(Vec::<&str>::new());
        fake.fail_desktop();

        let result = done(engine.dispatch(Some("paint"), &mut fake.services));
        assert_eq!(result.spoken.as_deref(), Some("I couldn't open paint."));
    }

    #[test]
    fn response_table_beats_registry() {
        let dir = tempdir().expect("tempdir");
        let mut engine = engine_in(&dir);
        engine
            .add_rule(TableId::Responses, "What Is The Time", "Time to get a watch.")
            .expect("upsert");
        let mut fake = FakeServices::with_replies(Vec::<&str>::new());

        let result = done(engine.dispatch(Some("what is the time"), &mut fake.services));
        assert_eq!(result, ActionResult::done(SideEffect::None, "Time to get a watch."));
    }

    #[test]
    fn config_shortcut_sends_keys() {
        let dir = tempdir().expect("tempdir");
        let engine = engine_in(&dir);
        let mut fake = FakeServices::with_replies(Vec::<&str>::new());

        let result = done(engine.dispatch(Some("Save File"), &mut fake.services));
        assert_eq!(result, ActionResult::silent(SideEffect::Shortcut));
        assert_eq!(fake.events(), vec!["keys:CTRL+S".to_string()]);
    }

    #[test]
    fn registry_first_match_runs_once() {
        let dir = tempdir().expect("tempdir");
        let engine = engine_in(&dir);
        let mut fake = FakeServices::with_replies(Vec::<&str>::new());

        let result = done(engine.dispatch(Some("Volume Up please"), &mut fake.services));
        assert_eq!(result, ActionResult::done(SideEffect::MediaKey, "Volume increased"));
        assert_eq!(fake.events(), vec!["keys:VOLUMEUP".to_string()]);
    }

    fn say_first(_text: &str, ctx: &mut ActionContext<'_>) -> ActionResult {
        ctx.say("first handler");
        ActionResult::silent(SideEffect::WindowOp)
    }

    fn say_second(_text: &str, ctx: &mut ActionContext<'_>) -> ActionResult {
        ctx.say("second handler");
        ActionResult::silent(SideEffect::MediaKey)
    }

    #[test]
    fn only_earlier_registered_handler_runs() {
        use crate::registry::Trigger;

        let dir = tempdir().expect("tempdir");
        let mut registry = ActionRegistry::new();
        registry
            .register("first", Trigger::Any(&["lights"]), say_first)
            .register("second", Trigger::Any(&["lights on"]), say_second);
        let engine = Engine::new(
            RuleStore::open(
                dir.path().join("applications.json"),
                dir.path().join("responses.json"),
            ),
            VoiceCommandMatcher::new(HashMap::new()),
            registry,
            HandlerSettings::default(),
        );
        let mut fake = FakeServices::with_replies(Vec::<&str>::new());

        let result = done(engine.dispatch(Some("Lights On"), &mut fake.services));
        assert_eq!(result, ActionResult::silent(SideEffect::WindowOp));
        assert_eq!(fake.events(), vec!["say:first handler".to_string()]);
    }

    #[test]
    fn nested_capture_does_not_reenter_dispatch() {
        let dir = tempdir().expect("tempdir");
        let engine = engine_in(&dir);
        // 追问的回答本身是结束词，也只会被当作搜索内容
        let mut fake = FakeServices::with_replies(["stop"]);

        let result = done(engine.dispatch(Some("open google"), &mut fake.services));
        assert_eq!(result.side_effect, SideEffect::WebOpen);
        assert!(fake
            .events()
            .contains(&"url:https://www.google.com/search?q=stop".to_string()));
    }

    #[test]
    fn unknown_utterance_is_unhandled() {
        let dir = tempdir().expect("tempdir");
        let engine = engine_in(&dir);
        let mut fake = FakeServices::with_replies(Vec::<&str>::new());

        let result = done(engine.dispatch(Some("make me a sandwich"), &mut fake.services));
        assert!(!result.handled);
        assert_eq!(
            unrecognized_message("make me a sandwich"),
            "I heard: make me a sandwich, but I don't recognize that as a valid request."
        );
    }
}
