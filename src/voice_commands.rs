use crate::normalize::normalize;
use std::collections::HashMap;

/// 配置文件中的语音指令表：规范化后的短语 → 快捷键
pub struct VoiceCommandMatcher {
    commands: HashMap<String, String>,
}

impl VoiceCommandMatcher {
    pub fn new(commands: HashMap<String, String>) -> Self {
        let commands = commands
            .into_iter()
            .map(|(phrase, shortcut)| (normalize(&phrase), shortcut))
            .filter(|(phrase, _)| !phrase.is_empty())
            .collect();
        Self { commands }
    }

    /// 精确匹配，返回快捷键
    pub fn match_text(&self, text: &str) -> Option<&str> {
        self.commands.get(&normalize(text)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
