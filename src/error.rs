use thiserror::Error;

/// 库级错误类型。所有操作的失败都通过该枚举同步返回给调用方，
/// 不存在静默丢弃数据的路径。
///
/// 注意：比对未命中（NoMatch）不是错误，见 [`crate::align::AlignOutcome`]。
#[derive(Debug, Error)]
pub enum Error {
    /// 符号不在声明的字母表内
    #[error("invalid symbol {symbol:?} at position {position}")]
    InvalidSymbol { symbol: char, position: usize },

    /// 随机访问越界
    #[error("index {index} out of range for length {length}")]
    IndexOutOfRange { index: usize, length: usize },

    /// 切片区间非法（start > end 或 end > len）
    #[error("invalid range [{start}, {end}) for length {length}")]
    InvalidRange {
        start: usize,
        end: usize,
        length: usize,
    },

    /// 两条序列的字母表不一致
    #[error("alphabet mismatch: {left} vs {right}")]
    AlphabetMismatch {
        left: &'static str,
        right: &'static str,
    },

    /// 当前字母表不支持该操作（如氨基酸序列的反向互补）
    #[error("operation `{operation}` unsupported for alphabet {alphabet}")]
    UnsupportedForAlphabet {
        operation: &'static str,
        alphabet: &'static str,
    },

    /// 突变列表与目标序列的坐标不一致
    #[error("coordinate mismatch: {0}")]
    CoordinateMismatch(String),

    /// 空查询序列属于配置错误，而非 NoMatch
    #[error("empty query sequence")]
    EmptyQuery,

    /// 在索引构建完成前请求比对
    #[error("k-mer index has not been built")]
    IndexNotBuilt,

    /// 压缩块损坏，不尝试部分恢复
    #[error("corrupt compressed block: {0}")]
    CorruptBlock(String),

    /// 配置非法（启动前检测，致命）
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// FASTA/FASTQ 解析错误
    #[error("parse error: {0}")]
    Parse(String),

    /// 索引序列化/反序列化失败
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
