pub mod action;
pub mod asr;
pub mod audio;
pub mod capture;
pub mod config;
pub mod desktop;
pub mod engine;
pub mod file_search;
pub mod handlers;
pub mod input_sim;
pub mod lookup;
pub mod normalize;
pub mod registry;
pub mod rule_store;
pub mod session;
pub mod speech;
pub mod vad;
pub mod voice_commands;

#[cfg(test)]
mod testing;

use action::{HandlerSettings, Services};
use asr::AsrClient;
use audio::MicrophoneCapture;
use capture::{Capture, ConsoleCapture};
use config::{AppConfig, CaptureSource};
use desktop::SystemDesktop;
use engine::Engine;
use lookup::WebLookup;
use registry::ActionRegistry;
use rule_store::RuleStore;
use session::Session;
use speech::Speaker;
use std::time::Duration;
use voice_commands::VoiceCommandMatcher;

pub fn handler_settings(config: &AppConfig) -> HandlerSettings {
    HandlerSettings {
        timeout: Duration::from_secs(config.capture.timeout_secs),
        phrase_limit: Duration::from_secs(config.capture.phrase_limit_secs),
        search_root: config.search.root.clone(),
        title: config.assistant.title.clone(),
    }
}

pub fn open_store(config: &AppConfig) -> RuleStore {
    RuleStore::open(&config.tables.applications, &config.tables.responses)
}

/// 按配置组装分发引擎
pub fn build_engine(config: &AppConfig) -> Engine {
    let matcher = VoiceCommandMatcher::new(config.voice_commands.clone());
    log::info!("已加载 {} 条语音指令", matcher.len());
    Engine::new(
        open_store(config),
        matcher,
        ActionRegistry::builtin(),
        handler_settings(config),
    )
}

/// 按配置组装外部服务；`typed` 强制使用键盘输入
pub fn build_services(config: &AppConfig, typed: bool) -> Result<Services, String> {
    let source = if typed {
        CaptureSource::Console
    } else {
        config.capture.source
    };
    let capture: Box<dyn Capture> = match source {
        CaptureSource::Console => Box::new(ConsoleCapture::spawn()),
        CaptureSource::Microphone => {
            let asr = AsrClient::new(&config.server.url, &config.server.asr_config_id);
            Box::new(MicrophoneCapture::new(asr, config.capture.clone())?)
        }
    };
    log::info!("输入方式: {source:?}");

    Ok(Services {
        capture,
        output: Box::new(Speaker::new(config.speech.command.clone())),
        desktop: Box::new(SystemDesktop::new(config.input.use_clipboard)),
        lookup: Box::new(WebLookup::new(config.news.clone())?),
    })
}

/// 运行交互会话直到结束
pub fn run(config: &AppConfig, typed: bool) -> Result<(), String> {
    let services = build_services(config, typed)?;
    Session::new(build_engine(config), services).run();
    Ok(())
}
