//! 位打包的不可变序列。
//!
//! 符号编码按字母表的最小位宽（核苷酸 3 bit，氨基酸 5 bit）从低位起
//! 打包进 u64 字；一个符号不跨字存储，保证 O(1) 随机访问。
//! 构造后不可变，切片产生与父序列不共享可变状态的新序列。

use serde::{Deserialize, Serialize};

use super::alphabet::{translate_codon, Alphabet};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sequence {
    alphabet: Alphabet,
    length: usize,
    words: Vec<u64>,
}

impl Sequence {
    /// 每个 u64 字可容纳的符号数
    #[inline]
    fn per_word(alphabet: Alphabet) -> usize {
        (64 / alphabet.bits()) as usize
    }

    fn empty(alphabet: Alphabet) -> Self {
        Self {
            alphabet,
            length: 0,
            words: Vec::new(),
        }
    }

    /// 从编码迭代器打包。编码必须已验证合法。
    fn pack<I: ExactSizeIterator<Item = u8>>(alphabet: Alphabet, codes: I) -> Self {
        let length = codes.len();
        let per_word = Self::per_word(alphabet);
        let bits = alphabet.bits();
        let mut words = vec![0u64; (length + per_word - 1) / per_word];
        for (i, code) in codes.enumerate() {
            let off = (i % per_word) as u32 * bits;
            words[i / per_word] |= (code as u64) << off;
        }
        Self {
            alphabet,
            length,
            words,
        }
    }

    /// 从 ASCII 符号解码。字母表外符号返回 `InvalidSymbol`。
    pub fn from_symbols(alphabet: Alphabet, symbols: &[u8]) -> Result<Self> {
        let mut codes = Vec::with_capacity(symbols.len());
        for (position, &s) in symbols.iter().enumerate() {
            match alphabet.encode(s) {
                Some(c) => codes.push(c),
                None => {
                    return Err(Error::InvalidSymbol {
                        symbol: s as char,
                        position,
                    })
                }
            }
        }
        Ok(Self::pack(alphabet, codes.into_iter()))
    }

    /// 从已编码的符号构造。编码越界返回 `InvalidSymbol`。
    pub fn from_codes(alphabet: Alphabet, codes: &[u8]) -> Result<Self> {
        for (position, &c) in codes.iter().enumerate() {
            if c as usize >= alphabet.size() {
                return Err(Error::InvalidSymbol {
                    symbol: alphabet.decode(c) as char,
                    position,
                });
            }
        }
        Ok(Self::pack(alphabet, codes.iter().copied()))
    }

    #[inline]
    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    fn code_unchecked(&self, i: usize) -> u8 {
        let per_word = Self::per_word(self.alphabet);
        let bits = self.alphabet.bits();
        let off = (i % per_word) as u32 * bits;
        let mask = (1u64 << bits) - 1;
        ((self.words[i / per_word] >> off) & mask) as u8
    }

    /// O(1) 随机访问，越界返回 `IndexOutOfRange`
    #[inline]
    pub fn code_at(&self, i: usize) -> Result<u8> {
        if i >= self.length {
            return Err(Error::IndexOutOfRange {
                index: i,
                length: self.length,
            });
        }
        Ok(self.code_unchecked(i))
    }

    /// 顺序遍历全部编码
    pub fn codes(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.length).map(move |i| self.code_unchecked(i))
    }

    /// 解包为编码向量（比对内层循环用，避免逐位访问开销）
    pub fn to_codes(&self) -> Vec<u8> {
        self.codes().collect()
    }

    /// 半开区间切片 [start, end)，返回独立存储的新序列
    pub fn sub(&self, start: usize, end: usize) -> Result<Self> {
        if start > end || end > self.length {
            return Err(Error::InvalidRange {
                start,
                end,
                length: self.length,
            });
        }
        Ok(Self::pack(
            self.alphabet,
            (start..end).map(|i| self.code_unchecked(i)),
        ))
    }

    /// 拼接两条同字母表序列
    pub fn concat(&self, other: &Self) -> Result<Self> {
        if self.alphabet != other.alphabet {
            return Err(Error::AlphabetMismatch {
                left: self.alphabet.name(),
                right: other.alphabet.name(),
            });
        }
        Ok(Self::pack(
            self.alphabet,
            ChainExact {
                len: self.length + other.length,
                inner: self.codes().chain(other.codes()),
            },
        ))
    }

    /// 反向互补，仅核苷酸字母表支持
    pub fn reverse_complement(&self) -> Result<Self> {
        if !self.alphabet.is_nucleotide() {
            return Err(Error::UnsupportedForAlphabet {
                operation: "reverse_complement",
                alphabet: self.alphabet.name(),
            });
        }
        Ok(Self::pack(
            self.alphabet,
            (0..self.length)
                .rev()
                .map(|i| Alphabet::complement_code(self.code_unchecked(i))),
        ))
    }

    /// 按标准遗传密码翻译为氨基酸序列；末尾不完整密码子忽略。
    /// 仅核苷酸字母表支持。
    pub fn translate(&self) -> Result<Self> {
        if !self.alphabet.is_nucleotide() {
            return Err(Error::UnsupportedForAlphabet {
                operation: "translate",
                alphabet: self.alphabet.name(),
            });
        }
        let n = self.length / 3;
        if n == 0 {
            return Ok(Self::empty(Alphabet::AminoAcid));
        }
        Ok(Self::pack(
            Alphabet::AminoAcid,
            (0..n).map(|i| {
                translate_codon(
                    self.code_unchecked(3 * i),
                    self.code_unchecked(3 * i + 1),
                    self.code_unchecked(3 * i + 2),
                )
            }),
        ))
    }

    /// 还原为 ASCII 符号
    pub fn symbols(&self) -> Vec<u8> {
        self.codes().map(|c| self.alphabet.decode(c)).collect()
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for c in self.codes() {
            write!(f, "{}", self.alphabet.decode(c) as char)?;
        }
        Ok(())
    }
}

/// chain 不保留 ExactSizeIterator，这里补一个定长包装给 pack 用
struct ChainExact<I> {
    len: usize,
    inner: I,
}

impl<I: Iterator<Item = u8>> Iterator for ChainExact<I> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        let v = self.inner.next();
        if v.is_some() {
            self.len -= 1;
        }
        v
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<I: Iterator<Item = u8>> ExactSizeIterator for ChainExact<I> {}
