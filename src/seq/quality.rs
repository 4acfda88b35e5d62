//! Phred+33 质量分数。

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const PHRED33_OFFSET: u8 = 33;
const PHRED_MAX: u8 = 93;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityScores {
    values: Vec<u8>,
}

impl QualityScores {
    /// 从 FASTQ 质量行（Phred+33 ASCII）解码
    pub fn from_phred33(raw: &[u8]) -> Result<Self> {
        let mut values = Vec::with_capacity(raw.len());
        for &b in raw {
            if b < PHRED33_OFFSET || b > PHRED33_OFFSET + PHRED_MAX {
                return Err(Error::Parse(format!(
                    "quality byte {} outside phred+33 range",
                    b
                )));
            }
            values.push(b - PHRED33_OFFSET);
        }
        Ok(Self { values })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn value_at(&self, i: usize) -> Result<u8> {
        self.values.get(i).copied().ok_or(Error::IndexOutOfRange {
            index: i,
            length: self.values.len(),
        })
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().map(|&v| v as u64).sum::<u64>() as f64 / self.values.len() as f64
    }

    /// 从 3' 端向内扫描，返回丢弃低质量尾部后保留的长度
    pub fn trim_back(&self, threshold: u8) -> usize {
        let mut end = self.values.len();
        while end > 0 && self.values[end - 1] < threshold {
            end -= 1;
        }
        end
    }

    /// 从 5' 端向内扫描，返回保留区间的起点
    pub fn trim_front(&self, threshold: u8) -> usize {
        let mut start = 0;
        while start < self.values.len() && self.values[start] < threshold {
            start += 1;
        }
        start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phred33_decoding() {
        let q = QualityScores::from_phred33(b"!I5").unwrap();
        assert_eq!(q.value_at(0).unwrap(), 0);
        assert_eq!(q.value_at(1).unwrap(), 40);
        assert_eq!(q.value_at(2).unwrap(), 20);
        assert!(QualityScores::from_phred33(&[10u8]).is_err());
    }

    #[test]
    fn trimming_scans_from_ends() {
        // 质量：0 0 30 30 30 5 0
        let q = QualityScores::from_phred33(b"!!???&!").unwrap();
        assert_eq!(q.trim_front(20), 2);
        assert_eq!(q.trim_back(20), 5);
        // 全部低于阈值
        let low = QualityScores::from_phred33(b"!!!").unwrap();
        assert_eq!(low.trim_back(20), 0);
        assert_eq!(low.trim_front(20), 3);
    }

    #[test]
    fn mean_quality() {
        let q = QualityScores::from_phred33(b"++").unwrap(); // 10, 10
        assert!((q.mean() - 10.0).abs() < 1e-9);
    }
}
