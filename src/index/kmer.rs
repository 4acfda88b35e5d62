//! k-mer 索引：定长符号元组 -> 参考集合内全部出现位置。
//!
//! 对参考集合一次性构建，此后只读，可跨工作线程以 Arc 共享。
//! 不变式：任何被索引参考中每个不含通配符的 k-mer 出现位置都
//! 记录在对应键下；出现列表按 (ref_id, offset) 排序，查询结果
//! 确定可复现。

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::seq::{Alphabet, Sequence};

/// 索引元信息（构建来源与时间戳）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexMeta {
    pub built_from: Option<String>,
    pub build_timestamp: Option<String>,
}

/// 命名参考序列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    pub sequence: Sequence,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KmerIndex {
    k: usize,
    references: Vec<Reference>,
    /// 打包 k-mer -> 有序出现列表 (ref_id, offset)
    occurrences: HashMap<u64, Vec<(u32, u32)>>,
    meta: IndexMeta,
}

impl KmerIndex {
    /// 对命名参考集合构建索引。参考必须是核苷酸序列且非空。
    pub fn build(references: Vec<(String, Sequence)>, k: usize) -> Result<Self> {
        if references.is_empty() {
            return Err(Error::InvalidConfig(
                "reference set must not be empty".to_string(),
            ));
        }
        let alphabet = references[0].1.alphabet();
        if !alphabet.is_nucleotide() {
            return Err(Error::InvalidConfig(
                "k-mer index requires nucleotide references".to_string(),
            ));
        }
        let max_k = (64 / alphabet.bits()) as usize;
        if k == 0 || k > max_k {
            return Err(Error::InvalidConfig(format!(
                "k must be in [1, {}], got {}",
                max_k, k
            )));
        }

        let mut occurrences: HashMap<u64, Vec<(u32, u32)>> = HashMap::new();
        let mut refs = Vec::with_capacity(references.len());
        for (ref_id, (name, sequence)) in references.into_iter().enumerate() {
            if sequence.alphabet() != alphabet {
                return Err(Error::AlphabetMismatch {
                    left: alphabet.name(),
                    right: sequence.alphabet().name(),
                });
            }
            let codes = sequence.to_codes();
            // 滑动窗口覆盖每个位置
            for offset in 0..codes.len().saturating_sub(k - 1) {
                if let Some(key) = pack_kmer(alphabet, &codes[offset..offset + k]) {
                    occurrences
                        .entry(key)
                        .or_default()
                        .push((ref_id as u32, offset as u32));
                }
            }
            refs.push(Reference { name, sequence });
        }
        for list in occurrences.values_mut() {
            list.sort_unstable();
        }
        debug!(
            "k-mer index built: {} references, {} distinct {}-mers",
            refs.len(),
            occurrences.len(),
            k
        );

        Ok(Self {
            k,
            references: refs,
            occurrences,
            meta: IndexMeta::default(),
        })
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn reference(&self, ref_id: u32) -> Option<&Reference> {
        self.references.get(ref_id as usize)
    }

    /// 查询一个打包 k-mer 的全部出现位置（已排序）
    pub fn lookup(&self, key: u64) -> &[(u32, u32)] {
        self.occurrences.get(&key).map_or(&[], Vec::as_slice)
    }

    pub fn set_meta(&mut self, meta: IndexMeta) {
        self.meta = meta;
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let mut f = std::fs::File::create(path)?;
        bincode::serialize_into(&mut f, self)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(())
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let f = std::fs::File::open(path)?;
        bincode::deserialize_from(f).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// 将 k 个编码从低位起打包为 u64 键；含通配符返回 None
/// （通配符不参与精确种子匹配）。
pub fn pack_kmer(alphabet: Alphabet, codes: &[u8]) -> Option<u64> {
    let bits = alphabet.bits();
    let wildcard = alphabet.wildcard();
    let mut key = 0u64;
    for (i, &c) in codes.iter().enumerate() {
        if c == wildcard {
            return None;
        }
        key |= (c as u64) << (i as u32 * bits);
    }
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nuc(s: &[u8]) -> Sequence {
        Sequence::from_symbols(Alphabet::Nucleotide, s).unwrap()
    }

    fn build_single(seq: &[u8], k: usize) -> KmerIndex {
        KmerIndex::build(vec![("ref".to_string(), nuc(seq))], k).unwrap()
    }

    #[test]
    fn every_occurrence_is_indexed() {
        let idx = build_single(b"ACGTACGT", 4);
        let key = pack_kmer(Alphabet::Nucleotide, &nuc(b"ACGT").to_codes()).unwrap();
        assert_eq!(idx.lookup(key), &[(0, 0), (0, 4)]);
        let key2 = pack_kmer(Alphabet::Nucleotide, &nuc(b"CGTA").to_codes()).unwrap();
        assert_eq!(idx.lookup(key2), &[(0, 1)]);
    }

    #[test]
    fn missing_kmer_returns_empty() {
        let idx = build_single(b"ACGTACGT", 4);
        let key = pack_kmer(Alphabet::Nucleotide, &nuc(b"GGGG").to_codes()).unwrap();
        assert!(idx.lookup(key).is_empty());
    }

    #[test]
    fn wildcard_windows_are_skipped() {
        let idx = build_single(b"ACGTNACGT", 4);
        let key = pack_kmer(Alphabet::Nucleotide, &nuc(b"ACGT").to_codes()).unwrap();
        // N 两侧各一个完整窗口
        assert_eq!(idx.lookup(key), &[(0, 0), (0, 5)]);
        assert_eq!(
            pack_kmer(Alphabet::Nucleotide, &nuc(b"GTNA").to_codes()),
            None
        );
    }

    #[test]
    fn multiple_references_are_distinguished() {
        let idx = KmerIndex::build(
            vec![
                ("chr1".to_string(), nuc(b"ACGTACGT")),
                ("chr2".to_string(), nuc(b"TTACGTTT")),
            ],
            4,
        )
        .unwrap();
        let key = pack_kmer(Alphabet::Nucleotide, &nuc(b"ACGT").to_codes()).unwrap();
        assert_eq!(idx.lookup(key), &[(0, 0), (0, 4), (1, 2)]);
        assert_eq!(idx.reference(1).unwrap().name, "chr2");
    }

    #[test]
    fn build_rejects_bad_configs() {
        assert!(KmerIndex::build(vec![], 4).is_err());
        assert!(KmerIndex::build(vec![("r".to_string(), nuc(b"ACGT"))], 0).is_err());
        assert!(KmerIndex::build(vec![("r".to_string(), nuc(b"ACGT"))], 64).is_err());
        let aa = Sequence::from_symbols(Alphabet::AminoAcid, b"MKV").unwrap();
        assert!(KmerIndex::build(vec![("p".to_string(), aa)], 2).is_err());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let mut idx = build_single(b"ACGTACGTACGT", 4);
        idx.set_meta(IndexMeta {
            built_from: Some("test".to_string()),
            build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
        });
        let dir = std::env::temp_dir().join("seqlib_kmer_index_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.idx");
        let path = path.to_str().unwrap();
        idx.save_to_file(path).unwrap();
        let loaded = KmerIndex::load_from_file(path).unwrap();
        assert_eq!(loaded.k(), 4);
        assert_eq!(loaded.meta().built_from.as_deref(), Some("test"));
        let key = pack_kmer(Alphabet::Nucleotide, &nuc(b"ACGT").to_codes()).unwrap();
        assert_eq!(loaded.lookup(key), idx.lookup(key));
        std::fs::remove_file(path).ok();
    }
}
