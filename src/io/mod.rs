//! 序列记录输入：FASTA / FASTQ 解析与压缩块编解码。

pub mod blocks;
pub mod fasta;
pub mod fastq;

pub use fasta::FastaReader;
pub use fastq::FastqReader;

use crate::error::{Error, Result};
use crate::seq::{Alphabet, QualityScores, Sequence};

/// 流水线的输入单元：标识符 + 原始符号字节 + 可选逐位质量
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
    pub qual: Option<Vec<u8>>,
}

impl SequenceRecord {
    /// 将原始字节规范化为严格的核苷酸符号集
    /// （小写转大写、U 转 T、IUPAC 简并码等未知字节映射为 N）。
    /// 解码保持严格：不经规范化的非法符号仍报 `InvalidSymbol`。
    pub fn normalized(&self) -> SequenceRecord {
        SequenceRecord {
            id: self.id.clone(),
            desc: self.desc.clone(),
            seq: crate::util::dna::normalize_seq(&self.seq),
            qual: self.qual.clone(),
        }
    }

    /// 按给定字母表解码为序列（与可选的质量分数）
    pub fn decode(&self, alphabet: Alphabet) -> Result<(Sequence, Option<QualityScores>)> {
        let sequence = Sequence::from_symbols(alphabet, &self.seq)?;
        let quality = match &self.qual {
            Some(raw) => {
                if raw.len() != self.seq.len() {
                    return Err(Error::Parse(format!(
                        "record '{}': seq/qual length mismatch ({} vs {})",
                        self.id,
                        self.seq.len(),
                        raw.len()
                    )));
                }
                Some(QualityScores::from_phred33(raw)?)
            }
            None => None,
        };
        Ok((sequence, quality))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_without_quality() {
        let rec = SequenceRecord {
            id: "r1".to_string(),
            desc: None,
            seq: b"ACGT".to_vec(),
            qual: None,
        };
        let (seq, qual) = rec.decode(Alphabet::Nucleotide).unwrap();
        assert_eq!(seq.to_string(), "ACGT");
        assert!(qual.is_none());
    }

    #[test]
    fn decode_with_quality() {
        let rec = SequenceRecord {
            id: "r1".to_string(),
            desc: None,
            seq: b"ACGT".to_vec(),
            qual: Some(b"IIII".to_vec()),
        };
        let (_, qual) = rec.decode(Alphabet::Nucleotide).unwrap();
        assert_eq!(qual.unwrap().value_at(0).unwrap(), 40);
    }

    #[test]
    fn normalized_maps_iupac_codes_to_wildcard() {
        let rec = SequenceRecord {
            id: "r1".to_string(),
            desc: None,
            seq: b"acgRYu".to_vec(),
            qual: None,
        };
        // 未规范化的简并码是非法符号
        assert!(rec.decode(Alphabet::Nucleotide).is_err());
        let (seq, _) = rec.normalized().decode(Alphabet::Nucleotide).unwrap();
        assert_eq!(seq.to_string(), "ACGNNT");
    }

    #[test]
    fn decode_rejects_length_mismatch() {
        let rec = SequenceRecord {
            id: "r1".to_string(),
            desc: None,
            seq: b"ACGT".to_vec(),
            qual: Some(b"II".to_vec()),
        };
        assert!(rec.decode(Alphabet::Nucleotide).is_err());
    }
}
