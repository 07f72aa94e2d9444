//! 视觉抓包解析命令
//!
//! 逐行送入帧解析器，打印解析结果与拒绝原因

use anyhow::{Context, Result};
use clap::Args;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use yawlink_protocol::{ParseError, VisionFrame, parse_line};

/// 解析命令参数
#[derive(Args, Debug)]
pub struct ParseCommand {
    /// 抓包文件（`-` 表示标准输入）
    pub input: PathBuf,

    /// 只打印汇总
    #[arg(short, long)]
    pub quiet: bool,
}

/// 解析汇总
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseSummary {
    pub obstacles: usize,
    pub markers: usize,
    pub rejected: usize,
}

/// 逐行解析，每行的结果交给 `on_line`
pub fn parse_stream<R: Read>(
    reader: R,
    mut on_line: impl FnMut(usize, &str, &Result<VisionFrame, ParseError>),
) -> Result<ParseSummary> {
    let mut summary = ParseSummary::default();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).context("读取输入失败")?;
        if n == 0 {
            break;
        }
        line_no += 1;

        // 非 UTF-8 的行与串口上一样按编码错误拒绝
        let (text, result) = match std::str::from_utf8(&buf) {
            Ok(text) => (text.trim_end_matches(['\r', '\n']).to_string(), parse_line(text)),
            Err(_) => (String::from_utf8_lossy(&buf).into_owned(), Err(ParseError::InvalidEncoding)),
        };
        match &result {
            Ok(VisionFrame::Obstacle(_)) => summary.obstacles += 1,
            Ok(VisionFrame::Marker(_)) => summary.markers += 1,
            Err(_) => summary.rejected += 1,
        }
        on_line(line_no, &text, &result);
    }
    Ok(summary)
}

impl ParseCommand {
    pub fn execute(&self) -> Result<()> {
        let quiet = self.quiet;
        let print = |line_no: usize, text: &str, result: &Result<VisionFrame, ParseError>| {
            if quiet {
                return;
            }
            match result {
                Ok(frame) => println!("{:>5}: {:?}", line_no, frame),
                Err(e) => println!("{:>5}: ✗ {} ({:?})", line_no, e, text),
            }
        };

        let summary = if self.input.as_os_str() == "-" {
            parse_stream(std::io::stdin().lock(), print)?
        } else {
            let file = std::fs::File::open(&self.input)
                .with_context(|| format!("无法打开 {}", self.input.display()))?;
            parse_stream(file, print)?
        };

        println!(
            "obstacles: {}, markers: {}, rejected: {}",
            summary.obstacles, summary.markers, summary.rejected
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stream_counts() {
        let input = b"O,1,2,3,4,1\r\nMAG,1,2,3,4\nnoise\n\nO,1,2\nO,5,6,7,8,2";
        let mut seen = Vec::new();
        let summary = parse_stream(&input[..], |n, text, result| {
            seen.push((n, text.to_string(), result.is_ok()));
        })
        .unwrap();

        assert_eq!(
            summary,
            ParseSummary {
                obstacles: 2,
                markers: 1,
                rejected: 3,
            }
        );
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[0], (1, "O,1,2,3,4,1".to_string(), true));
        assert_eq!(seen[2], (3, "noise".to_string(), false));
    }

    #[test]
    fn test_invalid_utf8_line_rejected() {
        let input = [b'O', b',', 0xFF, b'\n'];
        let summary = parse_stream(&input[..], |_, _, result| {
            assert_eq!(result, &Err(ParseError::InvalidEncoding));
        })
        .unwrap();
        assert_eq!(summary.rejected, 1);
    }
}
