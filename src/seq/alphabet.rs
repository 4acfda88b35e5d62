//! 字母表定义：核苷酸与氨基酸两套封闭符号集。
//!
//! 每个符号映射到一个小整数编码（code），序列按编码的最小位宽打包存储。
//! 通配符（N / X）始终是最后一个编码。

use serde::{Deserialize, Serialize};

/// 核苷酸编码数量：A C G T + N
pub const NUCLEOTIDE_SIZE: usize = 5;
/// 氨基酸编码数量：20 种标准残基 + X
pub const AMINO_ACID_SIZE: usize = 21;

/// 氨基酸符号，按字母序排列，X 为通配符
const AMINO_ACID_SYMBOLS: &[u8; AMINO_ACID_SIZE] = b"ACDEFGHIKLMNPQRSTVWYX";

/// 字母表标签。行为差异（如反向互补仅对核苷酸有意义）通过
/// 对该枚举的 match 分派，而不是运行期类型检查。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alphabet {
    Nucleotide,
    AminoAcid,
}

impl Alphabet {
    /// 字母表大小（含通配符）
    #[inline]
    pub fn size(self) -> usize {
        match self {
            Alphabet::Nucleotide => NUCLEOTIDE_SIZE,
            Alphabet::AminoAcid => AMINO_ACID_SIZE,
        }
    }

    /// 覆盖字母表大小的最小位宽
    #[inline]
    pub fn bits(self) -> u32 {
        match self {
            Alphabet::Nucleotide => 3, // ceil(log2(5))
            Alphabet::AminoAcid => 5,  // ceil(log2(21))
        }
    }

    /// 通配符编码（总是最大编码）
    #[inline]
    pub fn wildcard(self) -> u8 {
        (self.size() - 1) as u8
    }

    #[inline]
    pub fn is_nucleotide(self) -> bool {
        matches!(self, Alphabet::Nucleotide)
    }

    pub fn name(self) -> &'static str {
        match self {
            Alphabet::Nucleotide => "nucleotide",
            Alphabet::AminoAcid => "amino-acid",
        }
    }

    /// ASCII 符号 -> 编码。大小写不敏感；核苷酸 U 视为 T。
    /// 字母表外的符号返回 None（由调用方决定报错位置）。
    pub fn encode(self, symbol: u8) -> Option<u8> {
        let up = symbol.to_ascii_uppercase();
        match self {
            Alphabet::Nucleotide => match up {
                b'A' => Some(0),
                b'C' => Some(1),
                b'G' => Some(2),
                b'T' | b'U' => Some(3),
                b'N' => Some(4),
                _ => None,
            },
            Alphabet::AminoAcid => AMINO_ACID_SYMBOLS
                .iter()
                .position(|&s| s == up)
                .map(|i| i as u8),
        }
    }

    /// 编码 -> ASCII 符号。越界编码按通配符输出。
    pub fn decode(self, code: u8) -> u8 {
        match self {
            Alphabet::Nucleotide => match code {
                0 => b'A',
                1 => b'C',
                2 => b'G',
                3 => b'T',
                _ => b'N',
            },
            Alphabet::AminoAcid => AMINO_ACID_SYMBOLS
                .get(code as usize)
                .copied()
                .unwrap_or(b'X'),
        }
    }

    /// 核苷酸编码互补：A<->T, C<->G，N 保持 N。
    /// 仅对核苷酸编码有定义，调用方负责字母表检查。
    #[inline]
    pub fn complement_code(code: u8) -> u8 {
        if code < 4 {
            3 - code
        } else {
            code
        }
    }
}

/// 标准遗传密码：密码子（3 个核苷酸编码，每个 < 4）-> 氨基酸编码。
/// 终止密码子与含通配符的密码子翻译为 X。
pub fn translate_codon(c0: u8, c1: u8, c2: u8) -> u8 {
    let x = Alphabet::AminoAcid.wildcard();
    if c0 >= 4 || c1 >= 4 || c2 >= 4 {
        return x;
    }
    // 索引：A=0 C=1 G=2 T=3，行优先
    let idx = (c0 as usize) * 16 + (c1 as usize) * 4 + c2 as usize;
    // 64 个密码子对应的氨基酸符号，'*' 表示终止（映射为 X）
    const TABLE: &[u8; 64] = b"KNKNTTTTRSRSIIMIQHQHPPPPRRRRLLLLEDEDAAAAGGGGVVVV*Y*YSSSS*CWCLFLF";
    let sym = TABLE[idx];
    if sym == b'*' {
        x
    } else {
        Alphabet::AminoAcid.encode(sym).unwrap_or(x)
    }
}
