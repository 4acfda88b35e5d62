//! 压缩块协作方：按块压缩/解压字节流。
//!
//! 核心只把压缩器当作不透明的 `compress(bytes) -> bytes` /
//! `decompress(bytes) -> bytes` 使用；块内位流格式不在此处约定。
//! 损坏的块报 `CorruptBlock`，不尝试部分恢复。

use crate::error::{Error, Result};

/// LZ4 块压缩，输出自带原始长度前缀
pub fn compress(bytes: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(bytes)
}

/// 解压一个块；任何格式破损都视为 `CorruptBlock`
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    lz4_flex::decompress_size_prepended(bytes).map_err(|e| Error::CorruptBlock(e.to_string()))
}
