/// 把消息追加到已有输出：非空时以换行分隔，否则直接使用消息
pub fn accumulate(existing: Option<&str>, message: &str) -> String {
    match existing {
        Some(output) if !output.is_empty() => format!("{output}\n{message}"),
        _ => message.to_string(),
    }
}

/// 去除首尾空白，空输出视为无输出
pub fn normalize(output: &str) -> Option<String> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
