//! 视觉传感器文本帧解析
//!
//! 帧格式：以 `'\n'` 结尾的 ASCII 文本行，以类型标签开头，后跟固定数量的
//! 逗号分隔有符号整数。
//!
//! | 标签   | 字段数 | 含义                               |
//! |--------|--------|------------------------------------|
//! | `O,`   | 5      | 障碍物 x, y, 宽, 高, 颜色码（信号） |
//! | `MAG,` | 4      | 标记物 x, y, 宽, 高                 |
//!
//! 解析失败只丢弃当前行，调用方从下一个分隔符继续扫描。

use crate::constants::MAX_LINE_LEN;
use smallvec::SmallVec;
use thiserror::Error;

/// 障碍物帧标签
pub const OBSTACLE_TAG: &str = "O,";

/// 标记物帧标签
pub const MARKER_TAG: &str = "MAG,";

/// 障碍物帧字段数
pub const OBSTACLE_FIELDS: usize = 5;

/// 标记物帧字段数
pub const MARKER_FIELDS: usize = 4;

/// 障碍物描述（`O,` 帧）
///
/// 坐标为相对图像中心的像素偏移。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObstacleRecord {
    pub x: i16,
    pub y: i16,
    pub width: i16,
    pub height: i16,
    /// 颜色码，同时作为对外信号字节
    pub color_code: u8,
}

/// 标记物描述（`MAG,` 帧）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarkerRecord {
    pub x: i16,
    pub y: i16,
    pub width: i16,
    pub height: i16,
}

/// 解析成功的视觉帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VisionFrame {
    Obstacle(ObstacleRecord),
    Marker(MarkerRecord),
}

impl VisionFrame {
    /// 帧类型名称（用于日志）
    pub fn kind(&self) -> &'static str {
        match self {
            VisionFrame::Obstacle(_) => "obstacle",
            VisionFrame::Marker(_) => "marker",
        }
    }
}

/// 视觉帧解析错误
///
/// 所有错误都是非致命的：调用方丢弃该行并继续。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty line")]
    Empty,

    #[error("Line too long: {len} bytes (max {max})")]
    LineTooLong { len: usize, max: usize },

    #[error("Line is not valid ASCII text")]
    InvalidEncoding,

    #[error("Unknown frame tag in {line:?}")]
    UnknownTag { line: String },

    #[error("Wrong field count for {tag}: expected {expected}, got {actual}")]
    WrongFieldCount {
        tag: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid integer token {token:?}")]
    InvalidInteger { token: String },

    #[error("Value {value} out of range for {field}")]
    ValueOutOfRange { field: &'static str, value: i16 },
}

/// 解析一行视觉文本
///
/// 行长度超过 [`MAX_LINE_LEN`] 视为畸形输入直接拒绝（不做截断），
/// 以免截断后的残余数字污染后续解析。
///
/// # Example
///
/// ```
/// use yawlink_protocol::{parse_line, VisionFrame, ObstacleRecord};
///
/// let frame = parse_line("O,10,20,30,40,6").unwrap();
/// assert_eq!(
///     frame,
///     VisionFrame::Obstacle(ObstacleRecord { x: 10, y: 20, width: 30, height: 40, color_code: 6 })
/// );
/// assert!(parse_line("O,10,20").is_err());
/// ```
pub fn parse_line(text: &str) -> Result<VisionFrame, ParseError> {
    let raw = text.strip_suffix('\n').unwrap_or(text);
    let raw = raw.strip_suffix('\r').unwrap_or(raw);
    if raw.len() > MAX_LINE_LEN {
        return Err(ParseError::LineTooLong {
            len: raw.len(),
            max: MAX_LINE_LEN,
        });
    }
    if !raw.is_ascii() {
        return Err(ParseError::InvalidEncoding);
    }

    let line = raw.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(rest) = line.strip_prefix(OBSTACLE_TAG) {
        let values = parse_integers(OBSTACLE_TAG, rest, OBSTACLE_FIELDS)?;
        let color_code =
            u8::try_from(values[4]).map_err(|_| ParseError::ValueOutOfRange {
                field: "color_code",
                value: values[4],
            })?;
        return Ok(VisionFrame::Obstacle(ObstacleRecord {
            x: values[0],
            y: values[1],
            width: values[2],
            height: values[3],
            color_code,
        }));
    }

    if let Some(rest) = line.strip_prefix(MARKER_TAG) {
        let values = parse_integers(MARKER_TAG, rest, MARKER_FIELDS)?;
        return Ok(VisionFrame::Marker(MarkerRecord {
            x: values[0],
            y: values[1],
            width: values[2],
            height: values[3],
        }));
    }

    Err(ParseError::UnknownTag {
        line: line.to_string(),
    })
}

/// 按逗号切分并解析为 i16，字段数必须与 `expected` 完全一致
fn parse_integers(
    tag: &'static str,
    payload: &str,
    expected: usize,
) -> Result<SmallVec<[i16; 5]>, ParseError> {
    let mut values: SmallVec<[i16; 5]> = SmallVec::new();
    let mut count = 0usize;

    for token in payload.split(',') {
        count += 1;
        if count > expected {
            // 继续计数以便报告实际字段数
            continue;
        }
        let token = token.trim();
        let value = token
            .parse::<i16>()
            .map_err(|_| ParseError::InvalidInteger {
                token: token.to_string(),
            })?;
        values.push(value);
    }

    if count != expected {
        return Err(ParseError::WrongFieldCount {
            tag,
            expected,
            actual: count,
        });
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_obstacle() {
        let frame = parse_line("O,10,20,30,40,6").unwrap();
        assert_eq!(
            frame,
            VisionFrame::Obstacle(ObstacleRecord {
                x: 10,
                y: 20,
                width: 30,
                height: 40,
                color_code: 6,
            })
        );
        assert_eq!(frame.kind(), "obstacle");
    }

    #[test]
    fn test_parse_obstacle_negative_offsets() {
        let frame = parse_line("O,-120,-15,22,48,1\r\n").unwrap();
        match frame {
            VisionFrame::Obstacle(o) => {
                assert_eq!(o.x, -120);
                assert_eq!(o.y, -15);
                assert_eq!(o.color_code, 1);
            },
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_parse_marker() {
        let frame = parse_line("MAG,1,2,3,4").unwrap();
        assert_eq!(
            frame,
            VisionFrame::Marker(MarkerRecord {
                x: 1,
                y: 2,
                width: 3,
                height: 4,
            })
        );
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        assert!(parse_line("  MAG,1,2,3,4  \n").is_ok());
        assert!(parse_line("O, 1, 2, 3, 4, 2").is_ok());
    }

    #[test]
    fn test_short_obstacle_rejected() {
        assert_eq!(
            parse_line("O,10,20"),
            Err(ParseError::WrongFieldCount {
                tag: OBSTACLE_TAG,
                expected: 5,
                actual: 2,
            })
        );
    }

    #[test]
    fn test_long_marker_rejected() {
        assert_eq!(
            parse_line("MAG,1,2,3,4,5"),
            Err(ParseError::WrongFieldCount {
                tag: MARKER_TAG,
                expected: 4,
                actual: 5,
            })
        );
    }

    #[test]
    fn test_trailing_comma_rejected() {
        assert!(matches!(
            parse_line("O,1,2,3,4,5,"),
            Err(ParseError::WrongFieldCount { actual: 6, .. })
        ));
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(parse_line(""), Err(ParseError::Empty));
        assert_eq!(parse_line("   \r\n"), Err(ParseError::Empty));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert!(matches!(
            parse_line("D,12,1,0,0,0,0"),
            Err(ParseError::UnknownTag { .. })
        ));
        // 标签区分大小写
        assert!(matches!(
            parse_line("mag,1,2,3,4"),
            Err(ParseError::UnknownTag { .. })
        ));
    }

    #[test]
    fn test_bad_token_rejected() {
        assert_eq!(
            parse_line("O,10,abc,30,40,6"),
            Err(ParseError::InvalidInteger {
                token: "abc".to_string()
            })
        );
        assert!(matches!(
            parse_line("O,10,,30,40,6"),
            Err(ParseError::InvalidInteger { .. })
        ));
        // 超出 i16 范围
        assert!(matches!(
            parse_line("MAG,40000,2,3,4"),
            Err(ParseError::InvalidInteger { .. })
        ));
    }

    #[test]
    fn test_color_code_out_of_range() {
        assert_eq!(
            parse_line("O,1,2,3,4,300"),
            Err(ParseError::ValueOutOfRange {
                field: "color_code",
                value: 300,
            })
        );
        assert!(matches!(
            parse_line("O,1,2,3,4,-1"),
            Err(ParseError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn test_line_too_long_rejected() {
        let mut line = String::from("O,1,2,3,4,6");
        line.push_str(&" ".repeat(MAX_LINE_LEN));
        assert!(matches!(
            parse_line(&line),
            Err(ParseError::LineTooLong { max: MAX_LINE_LEN, .. })
        ));

        // 恰好等于上限仍然接受
        let mut exact = String::from("MAG,1,2,3,4");
        exact.push_str(&" ".repeat(MAX_LINE_LEN - exact.len()));
        assert_eq!(exact.len(), MAX_LINE_LEN);
        assert!(parse_line(&exact).is_ok());
    }

    #[test]
    fn test_non_ascii_rejected() {
        assert_eq!(parse_line("O,1,2,3,4,６"), Err(ParseError::InvalidEncoding));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_never_panics(line in "\\PC{0,200}") {
                let _ = parse_line(&line);
            }

            #[test]
            fn well_formed_obstacle_parses(
                x in any::<i16>(), y in any::<i16>(),
                w in any::<i16>(), h in any::<i16>(), c in any::<u8>(),
            ) {
                let line = format!("O,{},{},{},{},{}", x, y, w, h, c);
                let frame = parse_line(&line).unwrap();
                prop_assert_eq!(
                    frame,
                    VisionFrame::Obstacle(ObstacleRecord { x, y, width: w, height: h, color_code: c })
                );
            }
        }
    }
}
