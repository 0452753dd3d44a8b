/// 规范化识别文本：转小写并折叠空白
///
/// 撇号等标点原样保留（"today's date" 这类指令依赖它们匹配）。
/// 幂等：`normalize(&normalize(x)) == normalize(x)`。
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
