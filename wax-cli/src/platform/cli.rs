//! CLI 格式化输出
//!
//! 提供命令行友好的错误显示和源码上下文打印。

use std::path::Path;

use wax_api::WaxError;

/// 错误报告格式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

/// 打印错误；语法错误同时显示源代码上下文
pub fn print_error(e: &WaxError, format: ReportFormat, root: &Path) {
    let report = e.to_report();
    match format {
        ReportFormat::Json => eprintln!("{}", report.to_json()),
        ReportFormat::Text => {
            eprintln!("{}", report);
            let context = e
                .file()
                .zip(syntax_lines(e.message()))
                .and_then(|(file, lines)| read_view(root, file).map(|source| (source, lines)));
            if let Some((source, (start, end))) = context {
                print_source_context(&source, start, end);
            }
        }
    }
}

/// 从 `error on lines <start>:<end>` 中取出行号
pub fn syntax_lines(message: &str) -> Option<(usize, usize)> {
    let range = message.strip_prefix("error on lines ")?;
    let (start, end) = range.split_once(':')?;
    Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
}

fn read_view(root: &Path, file: &str) -> Option<String> {
    std::fs::read_to_string(root.join(file.trim_start_matches('/'))).ok()
}

/// 打印源代码上下文（显示错误行前后几行，错误行加标记）
pub fn print_source_context(source: &str, error_start: usize, error_end: usize) {
    eprint!("{}", source_context(source, error_start, error_end));
}

fn source_context(source: &str, error_start: usize, error_end: usize) -> String {
    const CONTEXT_LINES: usize = 2; // 错误行前后显示的上下文行数

    let lines: Vec<&str> = source.lines().collect();
    let total_lines = lines.len();
    if error_start == 0 || error_start > total_lines {
        return String::new();
    }
    let error_end = error_end.clamp(error_start, total_lines);

    let start_line = error_start.saturating_sub(CONTEXT_LINES).max(1);
    let end_line = (error_end + CONTEXT_LINES).min(total_lines);
    let width = end_line.to_string().len();

    let separator = "-".repeat(width + 1);
    let mut out = format!("{}|--\n", separator);
    for line_idx in start_line..=end_line {
        let marker = if (error_start..=error_end).contains(&line_idx) {
            '>'
        } else {
            ' '
        };
        out.push_str(&format!(
            "{}{:>width$} | {}\n",
            marker,
            line_idx,
            lines[line_idx - 1],
            width = width
        ));
    }
    out.push_str(&format!("{}|--\n", separator));
    out
}
