//! 读取测试日志
//!
//! Windows 下的测试输出经常被重定向为 UTF-16，因此 UTF-8 解码失败后再尝试 UTF-16。

use std::path::Path;

use anyhow::Context;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Utf16Order {
    Little,
    Big,
}

fn decode_utf8(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    std::str::from_utf8(bytes).ok().map(str::to_owned)
}

/// 根据 BOM 判断字节序，没有 BOM 时按小端处理
fn decode_utf16(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }

    let (order, body) = match bytes {
        [0xFF, 0xFE, body @ ..] => (Utf16Order::Little, body),
        [0xFE, 0xFF, body @ ..] => (Utf16Order::Big, body),
        _ => (Utf16Order::Little, bytes),
    };

    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| match order {
            Utf16Order::Little => u16::from_le_bytes([pair[0], pair[1]]),
            Utf16Order::Big => u16::from_be_bytes([pair[0], pair[1]]),
        })
        .collect();

    String::from_utf16(&units).ok()
}

/// 先按 UTF-8，再按 UTF-16 解码
pub fn decode_log(bytes: &[u8]) -> anyhow::Result<String> {
    decode_utf8(bytes)
        .or_else(|| decode_utf16(bytes))
        .ok_or_else(|| anyhow::anyhow!("content is neither UTF-8 nor UTF-16"))
}

pub fn read_log_file(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {:?}", path))?;
    decode_log(&bytes).with_context(|| format!("failed to decode {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le_with_bom(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
        bytes
    }

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_log(b"Test a\n").unwrap(), "Test a\n");
        assert_eq!(decode_log(b"\xEF\xBB\xBFTest a").unwrap(), "Test a");
    }

    #[test]
    fn test_decode_utf16() {
        let text = "Required sample count for mat: 64\r\n";
        assert_eq!(decode_log(&utf16le_with_bom(text)).unwrap(), text);

        let mut big_endian = vec![0xFE, 0xFF];
        big_endian.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
        assert_eq!(decode_log(&big_endian).unwrap(), text);

        // 没有 BOM 时按小端处理；纯 ASCII 的 UTF-16 同时也是合法的 UTF-8，所以这里带上非 ASCII 字符
        let no_bom: Vec<u8> = "Testé".encode_utf16().flat_map(u16::to_le_bytes).collect();
        assert_eq!(decode_log(&no_bom).unwrap(), "Testé");
    }

    #[test]
    fn test_decode_failure() {
        // 奇数长度，也不是合法的 UTF-8
        assert!(decode_log(&[0xFF, 0xFE, 0x00]).is_err());
        // 未配对的代理项
        assert!(decode_log(&[0xFF, 0xFE, 0x00, 0xD8]).is_err());
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_log_file(&dir.path().join("missing.txt")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read"));
    }
}
